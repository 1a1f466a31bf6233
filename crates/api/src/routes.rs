use axum::extract::{FromRequest, FromRequestParts, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use learnmetrics_core::model::{CourseId, MaterialDraft, UserId};
use services::{AppServices, ResultUpdate, TestSubmission};

use crate::dto::{
    AddQuestionRequest, AnalyticsDto, CourseDto, CreateCourseRequest, CreateUserRequest,
    InsightDto, LearnerProgressDto, MaterialBody, MaterialsQuery, MaterialsResponse,
    ProgressDto, ProgressEnvelope, SelectLevelRequest, SubmitTestRequest, SubmitTestResponse,
    UpdateResultsRequest, UserDto,
};
use crate::error::ApiError;

/// JSON body extractor that reports malformed input as a 400.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query-string extractor that reports malformed input as a 400.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Path-parameter extractor that reports malformed ids as a 400.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Build the HTTP surface over `services`.
pub fn router(services: AppServices) -> Router {
    let api = Router::new()
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/{id}", get(get_course).delete(delete_course))
        .route("/courses/{id}/materials", post(add_material))
        .route("/courses/{id}/questions", post(add_question))
        .route("/courses/{id}/select-level", post(select_level))
        .route("/courses/{id}/materials-by-level", get(materials_by_level))
        .route("/results/update", post(update_results))
        .route("/results/submit", post(submit_test))
        .route("/results/all/progress", get(all_progress))
        .route("/results/analytics", get(analytics))
        .route("/results/{user_id}", get(user_progress))
        .route(
            "/results/{user_id}/courses/{course_id}/insights",
            get(learner_insight),
        )
        .route("/users", post(create_user))
        .route("/users/{id}", get(get_user));

    Router::new()
        .nest("/api", api)
        .route("/health", get(health))
        .with_state(services)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ─── COURSES ───────────────────────────────────────────────────────────────────

async fn list_courses(State(app): State<AppServices>) -> ApiResult<Vec<CourseDto>> {
    let courses = app.courses().list_courses().await?;
    Ok(Json(courses.iter().map(CourseDto::from).collect()))
}

async fn create_course(
    State(app): State<AppServices>,
    ApiJson(req): ApiJson<CreateCourseRequest>,
) -> Result<(StatusCode, Json<CourseDto>), ApiError> {
    let course = app.courses().create_course(req.into()).await?;
    Ok((StatusCode::CREATED, Json((&course).into())))
}

async fn get_course(
    State(app): State<AppServices>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<CourseDto> {
    let course = app.courses().get_course(CourseId::new(id)).await?;
    Ok(Json((&course).into()))
}

async fn delete_course(
    State(app): State<AppServices>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Value> {
    app.courses().delete_course(CourseId::new(id)).await?;
    Ok(Json(json!({ "message": "Course deleted" })))
}

async fn add_material(
    State(app): State<AppServices>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(body): ApiJson<MaterialBody>,
) -> ApiResult<CourseDto> {
    let course = app
        .courses()
        .add_material(CourseId::new(id), MaterialDraft::from(body))
        .await?;
    Ok(Json((&course).into()))
}

async fn add_question(
    State(app): State<AppServices>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(req): ApiJson<AddQuestionRequest>,
) -> ApiResult<CourseDto> {
    let course = app
        .courses()
        .add_question(CourseId::new(id), req.test_type, req.question.into())
        .await?;
    Ok(Json((&course).into()))
}

// ─── PLACEMENT & MATERIALS ─────────────────────────────────────────────────────

async fn select_level(
    State(app): State<AppServices>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(req): ApiJson<SelectLevelRequest>,
) -> ApiResult<ProgressEnvelope> {
    let progress = app
        .progress()
        .select_level(
            CourseId::new(id),
            UserId::new(req.user_id),
            req.knowledge_level,
        )
        .await?;
    Ok(Json(ProgressEnvelope {
        message: "Knowledge level selected",
        progress: (&progress).into(),
    }))
}

async fn materials_by_level(
    State(app): State<AppServices>,
    ApiPath(id): ApiPath<u64>,
    ApiQuery(query): ApiQuery<MaterialsQuery>,
) -> ApiResult<MaterialsResponse> {
    let user_id = query
        .user_id
        .ok_or_else(|| ApiError::BadRequest("userId is required".into()))?;
    let view = app
        .progress()
        .materials_for_learner(CourseId::new(id), UserId::new(user_id))
        .await?;
    Ok(Json((&view).into()))
}

// ─── RESULTS ───────────────────────────────────────────────────────────────────

async fn update_results(
    State(app): State<AppServices>,
    ApiJson(req): ApiJson<UpdateResultsRequest>,
) -> ApiResult<ProgressEnvelope> {
    let update = ResultUpdate {
        pre_test_score: req.pre_test_score,
        post_test_score: req.post_test_score,
        topic_scores: req.topic_scores,
        status: req.status,
        ..ResultUpdate::new(UserId::new(req.user_id), CourseId::new(req.course_id))
    };
    let progress = app.progress().update_results(update).await?;
    Ok(Json(ProgressEnvelope {
        message: "Progress updated",
        progress: (&progress).into(),
    }))
}

async fn submit_test(
    State(app): State<AppServices>,
    ApiJson(req): ApiJson<SubmitTestRequest>,
) -> ApiResult<SubmitTestResponse> {
    let submission = TestSubmission {
        user_id: UserId::new(req.user_id),
        course_id: CourseId::new(req.course_id),
        kind: req.test_type,
        answers: req.answer_map(),
    };
    let (grade, progress) = app.progress().submit_test(submission).await?;
    info!(
        user_id = req.user_id,
        course_id = req.course_id,
        score = grade.total,
        "test submitted"
    );
    Ok(Json(SubmitTestResponse::new(grade, &progress)))
}

async fn user_progress(
    State(app): State<AppServices>,
    ApiPath(user_id): ApiPath<u64>,
) -> ApiResult<Vec<ProgressDto>> {
    let records = app.progress().user_progress(UserId::new(user_id)).await?;
    Ok(Json(records.iter().map(ProgressDto::from).collect()))
}

async fn learner_insight(
    State(app): State<AppServices>,
    ApiPath((user_id, course_id)): ApiPath<(u64, u64)>,
) -> ApiResult<InsightDto> {
    let insight = app
        .analytics()
        .learner_insight(UserId::new(user_id), CourseId::new(course_id))
        .await?;
    Ok(Json(insight.into()))
}

async fn all_progress(State(app): State<AppServices>) -> ApiResult<Vec<LearnerProgressDto>> {
    let rows = app.analytics().all_progress().await?;
    Ok(Json(rows.iter().map(LearnerProgressDto::from).collect()))
}

async fn analytics(State(app): State<AppServices>) -> ApiResult<AnalyticsDto> {
    Ok(Json(app.analytics().system_analytics().await?.into()))
}

// ─── USERS ─────────────────────────────────────────────────────────────────────

async fn create_user(
    State(app): State<AppServices>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserDto>), ApiError> {
    let user = app.users().register(req.into()).await?;
    Ok((StatusCode::CREATED, Json((&user).into())))
}

async fn get_user(State(app): State<AppServices>, ApiPath(id): ApiPath<u64>) -> ApiResult<UserDto> {
    let user = app.users().get_user(UserId::new(id)).await?;
    Ok(Json((&user).into()))
}
