use std::sync::Arc;

use learnmetrics_core::model::{
    Course, CourseDraft, CourseId, MaterialDraft, QuestionDraft, TestKind,
};
use storage::repository::{CourseRepository, StorageError};
use tracing::info;

use crate::error::CourseServiceError;

/// Course catalogue administration: courses, materials, and question banks.
#[derive(Clone)]
pub struct CourseService {
    courses: Arc<dyn CourseRepository>,
}

fn not_found(id: CourseId) -> impl FnOnce(StorageError) -> CourseServiceError {
    move |e| match e {
        StorageError::NotFound => CourseServiceError::NotFound(id),
        other => CourseServiceError::Storage(other),
    }
}

impl CourseService {
    #[must_use]
    pub fn new(courses: Arc<dyn CourseRepository>) -> Self {
        Self { courses }
    }

    /// Validate and persist a course with any nested materials and questions.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::Course` for validation failures.
    /// Returns `CourseServiceError::Storage` if persistence fails.
    pub async fn create_course(&self, draft: CourseDraft) -> Result<Course, CourseServiceError> {
        let new_course = draft.validate()?;
        let id = self.courses.insert_course(new_course).await?;
        info!(course_id = %id, "created course");
        self.get_course(id).await
    }

    /// List all courses ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::Storage` if repository access fails.
    pub async fn list_courses(&self) -> Result<Vec<Course>, CourseServiceError> {
        Ok(self.courses.list_courses().await?)
    }

    /// # Errors
    ///
    /// Returns `CourseServiceError::NotFound` if the course does not exist.
    /// Returns `CourseServiceError::Storage` if repository access fails.
    pub async fn get_course(&self, id: CourseId) -> Result<Course, CourseServiceError> {
        self.courses
            .get_course(id)
            .await?
            .ok_or(CourseServiceError::NotFound(id))
    }

    /// # Errors
    ///
    /// Returns `CourseServiceError::NotFound` if the course does not exist.
    /// Returns `CourseServiceError::Storage` if repository access fails.
    pub async fn delete_course(&self, id: CourseId) -> Result<(), CourseServiceError> {
        self.courses.delete_course(id).await.map_err(not_found(id))?;
        info!(course_id = %id, "deleted course");
        Ok(())
    }

    /// Append a material and return the refreshed course.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::Course` for validation failures.
    /// Returns `CourseServiceError::NotFound` if the course does not exist.
    pub async fn add_material(
        &self,
        id: CourseId,
        draft: MaterialDraft,
    ) -> Result<Course, CourseServiceError> {
        let material = draft.validate()?;
        let stored = self
            .courses
            .add_material(id, material)
            .await
            .map_err(not_found(id))?;
        info!(course_id = %id, material_id = %stored.id, level = ?stored.level, "added material");
        self.get_course(id).await
    }

    /// Append a question to the selected bank and return the refreshed course.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::Course` for validation failures.
    /// Returns `CourseServiceError::NotFound` if the course does not exist.
    pub async fn add_question(
        &self,
        id: CourseId,
        kind: TestKind,
        draft: QuestionDraft,
    ) -> Result<Course, CourseServiceError> {
        let question = draft.validate()?;
        let stored = self
            .courses
            .add_question(id, kind, question)
            .await
            .map_err(not_found(id))?;
        info!(course_id = %id, question_id = %stored.id, bank = kind.as_str(), "added question");
        self.get_course(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnmetrics_core::model::ContentLevel;
    use storage::repository::InMemoryRepository;

    fn service() -> CourseService {
        CourseService::new(Arc::new(InMemoryRepository::new()))
    }

    fn draft(title: &str) -> CourseDraft {
        CourseDraft {
            title: title.into(),
            ..CourseDraft::default()
        }
    }

    #[tokio::test]
    async fn create_and_list_courses() {
        let service = service();
        service.create_course(draft("React")).await.unwrap();
        service.create_course(draft("Rust")).await.unwrap();

        let titles: Vec<String> = service
            .list_courses()
            .await
            .unwrap()
            .iter()
            .map(|c| c.title().to_owned())
            .collect();
        assert_eq!(titles, ["React", "Rust"]);
    }

    #[tokio::test]
    async fn add_question_updates_total() {
        let service = service();
        let course = service.create_course(draft("React")).await.unwrap();
        let question = QuestionDraft {
            question: "What is JSX?".into(),
            options: vec!["Syntax".into(), "A database".into()],
            correct_answer: 0,
            difficulty: None,
            topic: Some("JSX".into()),
        };

        service
            .add_question(course.id(), TestKind::Pre, question.clone())
            .await
            .unwrap();
        let updated = service
            .add_question(course.id(), TestKind::Pre, question)
            .await
            .unwrap();
        assert_eq!(updated.total_questions(), 2);
        assert!(updated.questions(TestKind::Post).is_empty());
    }

    #[tokio::test]
    async fn add_material_defaults_level() {
        let service = service();
        let course = service.create_course(draft("React")).await.unwrap();
        let updated = service
            .add_material(
                course.id(),
                MaterialDraft {
                    title: "Hooks".into(),
                    ..MaterialDraft::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.materials()[0].level, Some(ContentLevel::Basic));
    }

    #[tokio::test]
    async fn missing_course_is_not_found() {
        let service = service();
        let id = CourseId::new(404);
        assert!(matches!(
            service.get_course(id).await,
            Err(CourseServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_course(id).await,
            Err(CourseServiceError::NotFound(_))
        ));
        let material = MaterialDraft {
            title: "Orphan".into(),
            ..MaterialDraft::default()
        };
        assert!(matches!(
            service.add_material(id, material).await,
            Err(CourseServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn invalid_draft_is_rejected_before_storage() {
        let err = service().create_course(draft("  ")).await.unwrap_err();
        assert!(matches!(err, CourseServiceError::Course(_)));
    }
}
