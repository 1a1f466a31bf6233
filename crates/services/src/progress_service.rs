use std::collections::BTreeMap;
use std::sync::Arc;

use learnmetrics_core::grading::{TestGrade, grade};
use learnmetrics_core::materials::{effective_level, visible_materials};
use learnmetrics_core::model::{
    ContentLevel, Course, CourseId, KnowledgeLevel, Material, Progress, ProgressStatus, TestKind,
    TopicScorePatch, UserId,
};
use learnmetrics_core::placement::PlacementPolicy;
use storage::repository::{CourseRepository, ProgressRepository, StorageError, UserRepository};
use tracing::{debug, info};

use crate::Clock;
use crate::error::ProgressServiceError;

/// Materials a learner may see in one course, along with the tier that gated them.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialsView {
    pub materials: Vec<Material>,
    pub allowed_level: ContentLevel,
    pub knowledge_level: Option<KnowledgeLevel>,
}

/// Partial progress update. Absent fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultUpdate {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub pre_test_score: Option<i32>,
    pub post_test_score: Option<i32>,
    pub topic_scores: Option<BTreeMap<String, TopicScorePatch>>,
    pub status: Option<ProgressStatus>,
}

impl ResultUpdate {
    /// An update carrying no changes.
    #[must_use]
    pub fn new(user_id: UserId, course_id: CourseId) -> Self {
        Self {
            user_id,
            course_id,
            pre_test_score: None,
            post_test_score: None,
            topic_scores: None,
            status: None,
        }
    }
}

/// A learner's answers to one of a course's question banks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSubmission {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub kind: TestKind,
    /// Question index → chosen option index.
    pub answers: BTreeMap<usize, usize>,
}

/// Placement, material gating, and score bookkeeping for learners.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    policy: PlacementPolicy,
    users: Arc<dyn UserRepository>,
    courses: Arc<dyn CourseRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        policy: PlacementPolicy,
        users: Arc<dyn UserRepository>,
        courses: Arc<dyn CourseRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            policy,
            users,
            courses,
            progress,
        }
    }

    #[must_use]
    pub fn policy(&self) -> &PlacementPolicy {
        &self.policy
    }

    async fn require_user(&self, id: UserId) -> Result<(), ProgressServiceError> {
        match self.users.get_user(id).await? {
            Some(_) => Ok(()),
            None => Err(ProgressServiceError::UserNotFound(id)),
        }
    }

    async fn require_course(&self, id: CourseId) -> Result<Course, ProgressServiceError> {
        self.courses
            .get_course(id)
            .await?
            .ok_or(ProgressServiceError::CourseNotFound(id))
    }

    async fn store(&self, progress: &Progress) -> Result<(), ProgressServiceError> {
        self.progress
            .upsert_progress(progress)
            .await
            .map_err(|e| match e {
                StorageError::NotFound => {
                    ProgressServiceError::CourseNotFound(progress.course_id())
                }
                other => ProgressServiceError::Storage(other),
            })
    }

    /// Record the learner's self-selected starting level for a course.
    ///
    /// Creates the progress record when absent. Re-selecting resets the
    /// unlocked tier to the seeded one.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::CourseNotFound` or `UserNotFound` when
    /// either side is missing, `Storage` if persistence fails.
    pub async fn select_level(
        &self,
        course_id: CourseId,
        user_id: UserId,
        level: KnowledgeLevel,
    ) -> Result<Progress, ProgressServiceError> {
        self.require_course(course_id).await?;
        self.require_user(user_id).await?;

        let now = self.clock.now();
        let mut progress = self
            .progress
            .get_progress(user_id, course_id)
            .await?
            .unwrap_or_else(|| Progress::new(user_id, course_id, now));
        progress.select_knowledge_level(level, now);
        self.store(&progress).await?;

        info!(
            user_id = %user_id,
            course_id = %course_id,
            level = level.as_str(),
            status = progress.status().as_str(),
            "knowledge level selected"
        );
        Ok(progress)
    }

    /// The course's materials filtered to the learner's unlocked tier.
    ///
    /// A learner without a progress record sees basic and untagged content.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::CourseNotFound` or `UserNotFound` when
    /// either side is missing, `Storage` if repository access fails.
    pub async fn materials_for_learner(
        &self,
        course_id: CourseId,
        user_id: UserId,
    ) -> Result<MaterialsView, ProgressServiceError> {
        let course = self.require_course(course_id).await?;
        self.require_user(user_id).await?;
        let progress = self.progress.get_progress(user_id, course_id).await?;
        let allowed_level = effective_level(progress.as_ref());
        let materials = visible_materials(allowed_level, course.materials());

        debug!(
            user_id = %user_id,
            course_id = %course_id,
            allowed = allowed_level.as_str(),
            shown = materials.len(),
            total = course.materials().len(),
            "filtered materials"
        );
        Ok(MaterialsView {
            materials,
            allowed_level,
            knowledge_level: progress.and_then(|p| p.knowledge_level()),
        })
    }

    /// Apply a partial update to a learner's record, creating it if needed.
    ///
    /// A pre-test score re-places intermediate learners. An explicit status
    /// is applied last and wins. The user is marked as returning.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::UserNotFound` or `CourseNotFound` when
    /// either side is missing, `Storage` if persistence fails.
    pub async fn update_results(
        &self,
        update: ResultUpdate,
    ) -> Result<Progress, ProgressServiceError> {
        self.require_user(update.user_id).await?;
        self.require_course(update.course_id).await?;

        let now = self.clock.now();
        let mut progress = match self
            .progress
            .get_progress(update.user_id, update.course_id)
            .await?
        {
            Some(existing) => existing,
            None => {
                let mut fresh = Progress::new(update.user_id, update.course_id, now);
                fresh.set_status(ProgressStatus::InProgress, now);
                fresh
            }
        };

        if let Some(score) = update.pre_test_score {
            if let Some(decision) = progress.record_pre_test(score, &self.policy, now) {
                info!(
                    user_id = %update.user_id,
                    course_id = %update.course_id,
                    score,
                    passed = decision.passed,
                    tier = decision.tier.as_str(),
                    "pre-test placement applied"
                );
            }
        }
        if let Some(score) = update.post_test_score {
            progress.record_post_test(score, now);
        }
        if let Some(patches) = update.topic_scores {
            progress.topic_scores_mut().merge(patches);
        }
        if let Some(status) = update.status {
            progress.set_status(status, now);
        }
        progress.touch(now);

        self.store(&progress).await?;
        self.users.mark_returning(update.user_id).await?;
        Ok(progress)
    }

    /// Grade a submission against the course's bank and record the result.
    ///
    /// Pre-tests leave the record "In Progress"; post-tests complete it.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::UserNotFound` or `CourseNotFound` when
    /// either side is missing, `Storage` if persistence fails.
    pub async fn submit_test(
        &self,
        submission: TestSubmission,
    ) -> Result<(TestGrade, Progress), ProgressServiceError> {
        let course = self.require_course(submission.course_id).await?;
        let result = grade(course.questions(submission.kind), &submission.answers);

        debug!(
            user_id = %submission.user_id,
            course_id = %submission.course_id,
            bank = submission.kind.as_str(),
            correct = result.correct,
            questions = result.question_count,
            "graded submission"
        );

        let side = |score: i32| match submission.kind {
            TestKind::Pre => TopicScorePatch {
                pre: Some(score),
                post: None,
            },
            TestKind::Post => TopicScorePatch {
                pre: None,
                post: Some(score),
            },
        };
        let topic_scores: BTreeMap<String, TopicScorePatch> = result
            .topics
            .iter()
            .map(|(topic, &score)| (topic.clone(), side(score)))
            .collect();

        let (pre_test_score, post_test_score, status) = match submission.kind {
            TestKind::Pre => (Some(result.total), None, ProgressStatus::InProgress),
            TestKind::Post => (None, Some(result.total), ProgressStatus::Completed),
        };

        let progress = self
            .update_results(ResultUpdate {
                user_id: submission.user_id,
                course_id: submission.course_id,
                pre_test_score,
                post_test_score,
                topic_scores: Some(topic_scores),
                status: Some(status),
            })
            .await?;
        Ok((result, progress))
    }

    /// All of a learner's progress records.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::UserNotFound` if the user does not
    /// exist, `Storage` if repository access fails.
    pub async fn user_progress(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Progress>, ProgressServiceError> {
        self.require_user(user_id).await?;
        Ok(self.progress.list_progress_for_user(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnmetrics_core::model::{CourseDraft, MaterialDraft, QuestionDraft, Role, UserDraft};
    use learnmetrics_core::time::{fixed_clock, fixed_now};
    use storage::repository::Storage;

    struct Fixture {
        service: ProgressService,
        storage: Storage,
        user: UserId,
        course: CourseId,
    }

    fn material(title: &str, level: ContentLevel) -> MaterialDraft {
        MaterialDraft {
            title: title.into(),
            level: Some(level),
            ..MaterialDraft::default()
        }
    }

    fn question(topic: &str, correct: usize) -> QuestionDraft {
        QuestionDraft {
            question: format!("{topic}?"),
            options: vec!["a".into(), "b".into()],
            correct_answer: correct,
            difficulty: None,
            topic: Some(topic.into()),
        }
    }

    async fn fixture() -> Fixture {
        let storage = Storage::in_memory();
        let user = storage
            .users
            .insert_user(
                UserDraft {
                    full_name: "Learner".into(),
                    email: "learner@example.com".into(),
                    role: Role::Learner,
                }
                .validate(fixed_now())
                .unwrap(),
            )
            .await
            .unwrap();
        let course = storage
            .courses
            .insert_course(
                CourseDraft {
                    title: "React".into(),
                    materials: vec![
                        material("Basic", ContentLevel::Basic),
                        material("Intermediate", ContentLevel::Intermediate),
                        material("Advanced", ContentLevel::Advanced),
                    ],
                    pre_test_questions: vec![question("Hooks", 0), question("State", 1)],
                    post_test_questions: vec![question("Hooks", 0), question("State", 1)],
                    ..CourseDraft::default()
                }
                .validate()
                .unwrap(),
            )
            .await
            .unwrap();
        let service = ProgressService::new(
            fixed_clock(),
            PlacementPolicy::default(),
            storage.users.clone(),
            storage.courses.clone(),
            storage.progress.clone(),
        );
        Fixture {
            service,
            storage,
            user: user.id(),
            course,
        }
    }

    fn titles(view: &MaterialsView) -> Vec<&str> {
        view.materials.iter().map(|m| m.title.as_str()).collect()
    }

    #[tokio::test]
    async fn intermediate_learner_needs_pre_test() {
        let f = fixture().await;
        let progress = f
            .service
            .select_level(f.course, f.user, KnowledgeLevel::Intermediate)
            .await
            .unwrap();
        assert_eq!(progress.status(), ProgressStatus::PreTestRequired);
        assert_eq!(progress.allowed_content_level(), ContentLevel::Intermediate);

        let view = f.service.materials_for_learner(f.course, f.user).await.unwrap();
        assert_eq!(titles(&view), ["Basic", "Intermediate"]);
        assert_eq!(view.knowledge_level, Some(KnowledgeLevel::Intermediate));
    }

    #[tokio::test]
    async fn unknown_learner_materials_are_not_found() {
        let f = fixture().await;
        let err = f
            .service
            .materials_for_learner(f.course, UserId::new(999))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressServiceError::UserNotFound(id) if id == UserId::new(999)));
    }

    #[tokio::test]
    async fn learner_without_record_sees_basic_materials() {
        let f = fixture().await;
        let view = f
            .service
            .materials_for_learner(f.course, f.user)
            .await
            .unwrap();
        assert_eq!(view.allowed_level, ContentLevel::Basic);
        assert_eq!(view.knowledge_level, None);
        assert_eq!(titles(&view), ["Basic"]);
    }

    #[tokio::test]
    async fn update_creates_record_and_marks_returning() {
        let f = fixture().await;
        let progress = f
            .service
            .update_results(ResultUpdate {
                post_test_score: Some(40),
                ..ResultUpdate::new(f.user, f.course)
            })
            .await
            .unwrap();
        assert_eq!(progress.status(), ProgressStatus::InProgress);
        assert_eq!(progress.post_test_score(), Some(40));

        let user = f.storage.users.get_user(f.user).await.unwrap().unwrap();
        assert!(!user.is_new_user());
    }

    #[tokio::test]
    async fn explicit_status_overrides_placement() {
        let f = fixture().await;
        f.service
            .select_level(f.course, f.user, KnowledgeLevel::Intermediate)
            .await
            .unwrap();
        let progress = f
            .service
            .update_results(ResultUpdate {
                pre_test_score: Some(85),
                status: Some(ProgressStatus::Completed),
                ..ResultUpdate::new(f.user, f.course)
            })
            .await
            .unwrap();
        assert_eq!(progress.allowed_content_level(), ContentLevel::Advanced);
        assert_eq!(progress.status(), ProgressStatus::Completed);
    }

    #[tokio::test]
    async fn submitted_pre_test_grades_and_merges_topics() {
        let f = fixture().await;
        f.service
            .select_level(f.course, f.user, KnowledgeLevel::Intermediate)
            .await
            .unwrap();

        let (result, progress) = f
            .service
            .submit_test(TestSubmission {
                user_id: f.user,
                course_id: f.course,
                kind: TestKind::Pre,
                answers: BTreeMap::from([(0, 0), (1, 0)]),
            })
            .await
            .unwrap();

        assert_eq!(result.total, 50);
        assert_eq!(progress.pre_test_score(), Some(50));
        assert_eq!(progress.allowed_content_level(), ContentLevel::Basic);
        assert!(!progress.pre_test_passed());
        assert_eq!(progress.topic_scores().get("Hooks").unwrap().pre, 100);
        assert_eq!(progress.topic_scores().get("State").unwrap().pre, 0);
    }

    #[tokio::test]
    async fn submitted_post_test_completes_and_keeps_tier() {
        let f = fixture().await;
        f.service
            .select_level(f.course, f.user, KnowledgeLevel::Intermediate)
            .await
            .unwrap();
        f.service
            .update_results(ResultUpdate {
                pre_test_score: Some(90),
                ..ResultUpdate::new(f.user, f.course)
            })
            .await
            .unwrap();

        let (_, progress) = f
            .service
            .submit_test(TestSubmission {
                user_id: f.user,
                course_id: f.course,
                kind: TestKind::Post,
                answers: BTreeMap::new(),
            })
            .await
            .unwrap();

        assert_eq!(progress.status(), ProgressStatus::Completed);
        assert_eq!(progress.post_test_score(), Some(0));
        assert_eq!(progress.allowed_content_level(), ContentLevel::Advanced);
    }

    #[tokio::test]
    async fn missing_user_or_course_is_reported() {
        let f = fixture().await;
        assert!(matches!(
            f.service
                .select_level(CourseId::new(77), f.user, KnowledgeLevel::Basic)
                .await,
            Err(ProgressServiceError::CourseNotFound(_))
        ));
        assert!(matches!(
            f.service
                .select_level(f.course, UserId::new(77), KnowledgeLevel::Basic)
                .await,
            Err(ProgressServiceError::UserNotFound(_))
        ));
        assert!(matches!(
            f.service.user_progress(UserId::new(77)).await,
            Err(ProgressServiceError::UserNotFound(_))
        ));
    }
}
