use std::collections::BTreeMap;
use std::sync::Arc;

use learnmetrics_core::model::{
    ContentLevel, CourseDraft, CourseId, KnowledgeLevel, MaterialDraft, Progress, ProgressStatus,
    QuestionDraft, Role, TestKind, TopicScorePatch, UserDraft, UserId,
};
use learnmetrics_core::placement::PlacementPolicy;
use learnmetrics_core::time::fixed_now;
use services::{
    AppServices, Clock, MaterialsView, ProgressServiceError, ResultUpdate, TestSubmission,
};
use storage::repository::{InMemoryRepository, ProgressRepository, Storage, StorageError};

fn material(title: &str, level: Option<ContentLevel>) -> MaterialDraft {
    MaterialDraft {
        title: title.into(),
        level,
        ..MaterialDraft::default()
    }
}

async fn setup(services: &AppServices) -> (UserId, CourseId) {
    let user = services
        .users()
        .register(UserDraft {
            full_name: "Flow Learner".into(),
            email: "flow@example.com".into(),
            role: Role::Learner,
        })
        .await
        .unwrap();
    let course = services
        .courses()
        .create_course(CourseDraft {
            title: "Databases".into(),
            materials: vec![
                material("Tables", Some(ContentLevel::Basic)),
                material("Indexes", Some(ContentLevel::Intermediate)),
                material("Query planning", Some(ContentLevel::Advanced)),
            ],
            pre_test_questions: vec![QuestionDraft {
                question: "Is SQL declarative?".into(),
                options: vec!["yes".into(), "no".into()],
                correct_answer: 0,
                difficulty: None,
                topic: None,
            }],
            ..CourseDraft::default()
        })
        .await
        .unwrap();
    (user.id(), course.id())
}

fn titles(view: &MaterialsView) -> Vec<String> {
    view.materials.iter().map(|m| m.title.clone()).collect()
}

#[tokio::test]
async fn pre_test_scores_place_intermediate_learners() {
    for (score, tier) in [
        (0, ContentLevel::Basic),
        (69, ContentLevel::Basic),
        (70, ContentLevel::Advanced),
        (100, ContentLevel::Advanced),
    ] {
        let services =
            AppServices::in_memory(Clock::fixed(fixed_now()), PlacementPolicy::default());
        let (user, course) = setup(&services).await;
        let progress = services.progress();

        progress
            .select_level(course, user, KnowledgeLevel::Intermediate)
            .await
            .unwrap();
        let placed = progress
            .update_results(ResultUpdate {
                pre_test_score: Some(score),
                ..ResultUpdate::new(user, course)
            })
            .await
            .unwrap();

        assert_eq!(placed.allowed_content_level(), tier, "score {score}");
        assert_eq!(placed.status(), ProgressStatus::InProgress);

        let view = progress.materials_for_learner(course, user).await.unwrap();
        assert!(
            view.materials
                .iter()
                .all(|m| m.level.is_none_or(|l| l <= view.allowed_level))
        );
    }
}

#[tokio::test]
async fn full_learning_journey() {
    let services = AppServices::in_memory(Clock::fixed(fixed_now()), PlacementPolicy::default());
    let (user, course) = setup(&services).await;
    let progress = services.progress();

    let before = progress.materials_for_learner(course, user).await.unwrap();
    assert_eq!(titles(&before), ["Tables"]);

    progress
        .select_level(course, user, KnowledgeLevel::Intermediate)
        .await
        .unwrap();
    let (grade, placed) = progress
        .submit_test(TestSubmission {
            user_id: user,
            course_id: course,
            kind: TestKind::Pre,
            answers: BTreeMap::from([(0, 0)]),
        })
        .await
        .unwrap();
    assert_eq!(grade.total, 100);
    assert_eq!(grade.topics.get("General"), Some(&100));
    assert!(placed.pre_test_passed());

    let unlocked = progress.materials_for_learner(course, user).await.unwrap();
    assert_eq!(titles(&unlocked), ["Tables", "Indexes", "Query planning"]);

    let finished = progress
        .update_results(ResultUpdate {
            post_test_score: Some(100),
            topic_scores: Some(BTreeMap::from([(
                "General".to_owned(),
                TopicScorePatch {
                    pre: None,
                    post: Some(90),
                },
            )])),
            status: Some(ProgressStatus::Completed),
            ..ResultUpdate::new(user, course)
        })
        .await
        .unwrap();
    let general = finished.topic_scores().get("General").unwrap();
    assert_eq!((general.pre, general.post), (100, 90));
    assert_eq!(finished.allowed_content_level(), ContentLevel::Advanced);

    let insight = services
        .analytics()
        .learner_insight(user, course)
        .await
        .unwrap();
    assert_eq!(insight.improvement, 0);
    assert_eq!(insight.pre_test_label, Some(ContentLevel::Advanced));

    let records = progress.user_progress(user).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status(), ProgressStatus::Completed);
}

struct FailingProgress;

#[async_trait::async_trait]
impl ProgressRepository for FailingProgress {
    async fn get_progress(
        &self,
        _user_id: UserId,
        _course_id: CourseId,
    ) -> Result<Option<Progress>, StorageError> {
        Err(StorageError::Connection("database is locked".into()))
    }

    async fn list_progress_for_user(
        &self,
        _user_id: UserId,
    ) -> Result<Vec<Progress>, StorageError> {
        Err(StorageError::Connection("database is locked".into()))
    }

    async fn list_all_progress(&self) -> Result<Vec<Progress>, StorageError> {
        Err(StorageError::Connection("database is locked".into()))
    }

    async fn upsert_progress(&self, _progress: &Progress) -> Result<(), StorageError> {
        Err(StorageError::Connection("database is locked".into()))
    }
}

#[tokio::test]
async fn storage_failures_surface_as_storage_errors() {
    let repo = InMemoryRepository::new();
    let storage = Storage {
        users: Arc::new(repo.clone()),
        courses: Arc::new(repo),
        progress: Arc::new(FailingProgress),
    };
    let services = AppServices::from_storage(
        storage,
        Clock::fixed(fixed_now()),
        PlacementPolicy::default(),
    );
    let (user, course) = setup(&services).await;

    let err = services
        .progress()
        .select_level(course, user, KnowledgeLevel::Basic)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProgressServiceError::Storage(StorageError::Connection(_))
    ));
}
