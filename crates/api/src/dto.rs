//! JSON request and response bodies. Field names are camelCase on the wire.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use learnmetrics_core::grading::TestGrade;
use learnmetrics_core::insights::{LearnerInsight, SystemAnalytics, TopicHighlight};
use learnmetrics_core::model::{
    ContentLevel, Course, CourseDraft, KnowledgeLevel, Material, MaterialDraft, MaterialKind,
    Progress, ProgressStatus, Question, QuestionDraft, Recommendation, Role, TestKind, TopicScore,
    TopicScorePatch, User, UserDraft,
};
use services::{LearnerProgress, MaterialsView};

//
// ─── REQUESTS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectLevelRequest {
    pub user_id: u64,
    pub knowledge_level: KnowledgeLevel,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialsQuery {
    pub user_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResultsRequest {
    pub user_id: u64,
    pub course_id: u64,
    #[serde(default)]
    pub pre_test_score: Option<i32>,
    #[serde(default)]
    pub post_test_score: Option<i32>,
    #[serde(default)]
    pub topic_scores: Option<BTreeMap<String, TopicScorePatch>>,
    #[serde(default)]
    pub status: Option<ProgressStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTestRequest {
    pub user_id: u64,
    pub course_id: u64,
    pub test_type: TestKind,
    /// Chosen option per question, in bank order. `null` leaves a question
    /// unanswered.
    #[serde(default)]
    pub answers: Vec<Option<usize>>,
}

impl SubmitTestRequest {
    #[must_use]
    pub fn answer_map(&self) -> BTreeMap<usize, usize> {
        self.answers
            .iter()
            .enumerate()
            .filter_map(|(index, choice)| choice.map(|c| (index, c)))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

impl From<CreateUserRequest> for UserDraft {
    fn from(req: CreateUserRequest) -> Self {
        Self {
            full_name: req.full_name,
            email: req.email,
            role: req.role,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialBody {
    #[serde(default, rename = "type")]
    pub kind: Option<MaterialKind>,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub level: Option<ContentLevel>,
}

impl From<MaterialBody> for MaterialDraft {
    fn from(body: MaterialBody) -> Self {
        Self {
            kind: body.kind,
            title: body.title,
            url: body.url,
            duration: body.duration,
            rating: body.rating,
            level: body.level,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionBody {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

impl From<QuestionBody> for QuestionDraft {
    fn from(body: QuestionBody) -> Self {
        Self {
            question: body.question,
            options: body.options,
            correct_answer: body.correct_answer,
            difficulty: body.difficulty,
            topic: body.topic,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddQuestionRequest {
    pub test_type: TestKind,
    #[serde(flatten)]
    pub question: QuestionBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub materials: Vec<MaterialBody>,
    #[serde(default)]
    pub pre_test_questions: Vec<QuestionBody>,
    #[serde(default)]
    pub post_test_questions: Vec<QuestionBody>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

impl From<CreateCourseRequest> for CourseDraft {
    fn from(req: CreateCourseRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            tags: req.tags,
            duration: req.duration,
            materials: req.materials.into_iter().map(Into::into).collect(),
            pre_test_questions: req.pre_test_questions.into_iter().map(Into::into).collect(),
            post_test_questions: req.post_test_questions.into_iter().map(Into::into).collect(),
            recommendations: req.recommendations,
        }
    }
}

//
// ─── RESPONSES ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: u64,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub is_new_user: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id().value(),
            full_name: user.full_name().to_owned(),
            email: user.email().to_owned(),
            role: user.role(),
            is_new_user: user.is_new_user(),
            created_at: user.created_at(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDto {
    pub id: u64,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<MaterialKind>,
    pub title: String,
    pub url: Option<String>,
    pub duration: Option<String>,
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<ContentLevel>,
}

impl From<&Material> for MaterialDto {
    fn from(m: &Material) -> Self {
        Self {
            id: m.id.value(),
            kind: m.kind,
            title: m.title.clone(),
            url: m.url.clone(),
            duration: m.duration.clone(),
            rating: m.rating,
            level: m.level,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDto {
    pub id: u64,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub difficulty: Option<String>,
    pub topic: String,
}

impl From<&Question> for QuestionDto {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.value(),
            question: q.question.clone(),
            options: q.options.clone(),
            correct_answer: q.correct_answer,
            difficulty: q.difficulty.clone(),
            topic: q.topic_or_default().to_owned(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDto {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub duration: Option<String>,
    pub materials: Vec<MaterialDto>,
    pub pre_test_questions: Vec<QuestionDto>,
    pub post_test_questions: Vec<QuestionDto>,
    pub recommendations: Vec<Recommendation>,
    pub total_questions: usize,
}

impl From<&Course> for CourseDto {
    fn from(c: &Course) -> Self {
        Self {
            id: c.id().value(),
            title: c.title().to_owned(),
            description: c.description().map(str::to_owned),
            tags: c.tags().to_vec(),
            duration: c.duration().map(str::to_owned),
            materials: c.materials().iter().map(MaterialDto::from).collect(),
            pre_test_questions: c
                .questions(TestKind::Pre)
                .iter()
                .map(QuestionDto::from)
                .collect(),
            post_test_questions: c
                .questions(TestKind::Post)
                .iter()
                .map(QuestionDto::from)
                .collect(),
            recommendations: c.recommendations().to_vec(),
            total_questions: c.total_questions(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDto {
    pub user_id: u64,
    pub course_id: u64,
    pub knowledge_level: Option<KnowledgeLevel>,
    pub allowed_content_level: ContentLevel,
    pub pre_test_score: Option<i32>,
    pub post_test_score: Option<i32>,
    pub pre_test_passed: bool,
    pub status: ProgressStatus,
    pub topic_scores: BTreeMap<String, TopicScore>,
    pub last_accessed: DateTime<Utc>,
}

impl From<&Progress> for ProgressDto {
    fn from(p: &Progress) -> Self {
        Self {
            user_id: p.user_id().value(),
            course_id: p.course_id().value(),
            knowledge_level: p.knowledge_level(),
            allowed_content_level: p.allowed_content_level(),
            pre_test_score: p.pre_test_score(),
            post_test_score: p.post_test_score(),
            pre_test_passed: p.pre_test_passed(),
            status: p.status(),
            topic_scores: p.topic_scores().as_map().clone(),
            last_accessed: p.last_accessed(),
        }
    }
}

/// `{message, progress}` envelope used by the mutating progress endpoints.
#[derive(Debug, Serialize)]
pub struct ProgressEnvelope {
    pub message: &'static str,
    pub progress: ProgressDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialsResponse {
    pub materials: Vec<MaterialDto>,
    pub allowed_level: ContentLevel,
    pub knowledge_level: Option<KnowledgeLevel>,
}

impl From<&MaterialsView> for MaterialsResponse {
    fn from(view: &MaterialsView) -> Self {
        Self {
            materials: view.materials.iter().map(MaterialDto::from).collect(),
            allowed_level: view.allowed_level,
            knowledge_level: view.knowledge_level,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTestResponse {
    pub score: i32,
    pub correct: usize,
    pub question_count: usize,
    pub topic_scores: BTreeMap<String, i32>,
    pub progress: ProgressDto,
}

impl SubmitTestResponse {
    #[must_use]
    pub fn new(grade: TestGrade, progress: &Progress) -> Self {
        Self {
            score: grade.total,
            correct: grade.correct,
            question_count: grade.question_count,
            topic_scores: grade.topics,
            progress: progress.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TopicHighlightDto {
    pub topic: String,
    pub value: i32,
}

impl From<TopicHighlight> for TopicHighlightDto {
    fn from(h: TopicHighlight) -> Self {
        Self {
            topic: h.topic,
            value: h.value,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightDto {
    pub improvement: i32,
    pub most_improved_topic: Option<TopicHighlightDto>,
    pub weakest_topic: Option<TopicHighlightDto>,
    pub pre_test_label: Option<ContentLevel>,
}

impl From<LearnerInsight> for InsightDto {
    fn from(i: LearnerInsight) -> Self {
        Self {
            improvement: i.improvement,
            most_improved_topic: i.most_improved_topic.map(Into::into),
            weakest_topic: i.weakest_topic.map(Into::into),
            pre_test_label: i.pre_test_label,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsDto {
    pub total_learners: usize,
    pub total_tests: usize,
    pub avg_improvement: f64,
}

impl From<SystemAnalytics> for AnalyticsDto {
    fn from(a: SystemAnalytics) -> Self {
        Self {
            total_learners: a.total_learners,
            total_tests: a.total_tests,
            avg_improvement: a.avg_improvement,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LearnerProgressDto {
    #[serde(flatten)]
    pub user: UserDto,
    pub progress: Vec<ProgressDto>,
}

impl From<&LearnerProgress> for LearnerProgressDto {
    fn from(row: &LearnerProgress) -> Self {
        Self {
            user: (&row.user).into(),
            progress: row.progress.iter().map(ProgressDto::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn submitted_answers_skip_nulls() {
        let req: SubmitTestRequest = serde_json::from_value(json!({
            "userId": 1,
            "courseId": 2,
            "testType": "pre",
            "answers": [0, null, 3]
        }))
        .unwrap();
        assert_eq!(req.answer_map(), BTreeMap::from([(0, 0), (2, 3)]));
    }

    #[test]
    fn update_request_accepts_partial_topic_scores() {
        let req: UpdateResultsRequest = serde_json::from_value(json!({
            "userId": 1,
            "courseId": 2,
            "topicScores": { "Hooks": { "post": 80 } },
            "status": "Completed"
        }))
        .unwrap();
        let patch = req.topic_scores.unwrap()["Hooks"];
        assert_eq!(patch.pre, None);
        assert_eq!(patch.post, Some(80));
        assert_eq!(req.status, Some(ProgressStatus::Completed));
        assert_eq!(req.pre_test_score, None);
    }

    #[test]
    fn material_body_reads_type_field() {
        let body: MaterialBody = serde_json::from_value(json!({
            "type": "video",
            "title": "Intro",
            "level": "advanced"
        }))
        .unwrap();
        assert_eq!(body.kind, Some(MaterialKind::Video));
        assert_eq!(body.level, Some(ContentLevel::Advanced));
    }
}
