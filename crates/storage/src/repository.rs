use async_trait::async_trait;
use learnmetrics_core::model::{
    Course, CourseId, MaterialId, Material, NewCourse, NewMaterial, NewQuestion, NewUser,
    Progress, Question, QuestionId, TestKind, User, UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new user and assign its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the email is already registered.
    async fn insert_user(&self, user: NewUser) -> Result<User, StorageError>;

    /// Fetch a user by ID. Returns `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// List all users ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_users(&self) -> Result<Vec<User>, StorageError>;

    /// Clear the first-visit flag.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    async fn mark_returning(&self, id: UserId) -> Result<(), StorageError>;
}

/// Repository contract for courses, their materials, and question banks.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Persist a course together with its nested materials and questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn insert_course(&self, course: NewCourse) -> Result<CourseId, StorageError>;

    /// Fetch a course by ID. Returns `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// List all courses ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError>;

    /// Delete a course and everything attached to it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn delete_course(&self, id: CourseId) -> Result<(), StorageError>;

    /// Append a material to a course's list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn add_material(
        &self,
        course_id: CourseId,
        material: NewMaterial,
    ) -> Result<Material, StorageError>;

    /// Append a question to the pre- or post-test bank.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn add_question(
        &self,
        course_id: CourseId,
        kind: TestKind,
        question: NewQuestion,
    ) -> Result<Question, StorageError>;
}

/// Repository contract for per-learner, per-course progress.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch one learner's record for one course. Returns `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Progress>, StorageError>;

    /// List every record owned by a learner, ordered by course ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_progress_for_user(&self, user_id: UserId) -> Result<Vec<Progress>, StorageError>;

    /// List every record in the system, ordered by user then course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_all_progress(&self) -> Result<Vec<Progress>, StorageError>;

    /// Insert or replace a record as a whole.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_progress(&self, progress: &Progress) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct Sequences {
    user: u64,
    course: u64,
    material: u64,
    question: u64,
}

fn next(seq: &mut u64) -> u64 {
    *seq += 1;
    *seq
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    users: Arc<Mutex<HashMap<UserId, User>>>,
    courses: Arc<Mutex<HashMap<CourseId, Course>>>,
    progress: Arc<Mutex<HashMap<(UserId, CourseId), Progress>>>,
    sequences: Arc<Mutex<Sequences>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self, pick: impl FnOnce(&mut Sequences) -> &mut u64) -> Result<u64, StorageError> {
        let mut guard = self
            .sequences
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(next(pick(&mut guard)))
    }

    fn with_course<T>(
        &self,
        id: CourseId,
        f: impl FnOnce(&Course) -> (Course, T),
    ) -> Result<T, StorageError> {
        let mut guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let current = guard.get(&id).ok_or(StorageError::NotFound)?;
        let (updated, out) = f(current);
        guard.insert(id, updated);
        Ok(out)
    }
}

fn rebuild_course(
    course: &Course,
    materials: Vec<Material>,
    pre: Vec<Question>,
    post: Vec<Question>,
) -> Course {
    Course::from_persisted(
        course.id(),
        course.title().to_owned(),
        course.description().map(str::to_owned),
        course.tags().to_vec(),
        course.duration().map(str::to_owned),
        materials,
        pre,
        post,
        course.recommendations().to_vec(),
    )
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn insert_user(&self, user: NewUser) -> Result<User, StorageError> {
        let id = UserId::new(self.next_id(|s| &mut s.user)?);
        let mut guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.values().any(|u| u.email() == user.email) {
            return Err(StorageError::Conflict);
        }
        let user = user.with_id(id);
        guard.insert(id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut users: Vec<User> = guard.values().cloned().collect();
        users.sort_by_key(User::id);
        Ok(users)
    }

    async fn mark_returning(&self, id: UserId) -> Result<(), StorageError> {
        let mut guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let user = guard.get(&id).ok_or(StorageError::NotFound)?;
        let updated = User::from_persisted(
            user.id(),
            user.full_name().to_owned(),
            user.email().to_owned(),
            user.role(),
            false,
            user.created_at(),
        );
        guard.insert(id, updated);
        Ok(())
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn insert_course(&self, course: NewCourse) -> Result<CourseId, StorageError> {
        let id = CourseId::new(self.next_id(|s| &mut s.course)?);

        let mut materials = Vec::with_capacity(course.materials.len());
        for m in course.materials {
            materials.push(m.with_id(MaterialId::new(self.next_id(|s| &mut s.material)?)));
        }
        let mut pre = Vec::with_capacity(course.pre_test_questions.len());
        for q in course.pre_test_questions {
            pre.push(q.with_id(QuestionId::new(self.next_id(|s| &mut s.question)?)));
        }
        let mut post = Vec::with_capacity(course.post_test_questions.len());
        for q in course.post_test_questions {
            post.push(q.with_id(QuestionId::new(self.next_id(|s| &mut s.question)?)));
        }

        let stored = Course::from_persisted(
            id,
            course.title,
            course.description,
            course.tags,
            course.duration,
            materials,
            pre,
            post,
            course.recommendations,
        );
        self.courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .insert(id, stored);
        Ok(id)
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut courses: Vec<Course> = guard.values().cloned().collect();
        courses.sort_by_key(Course::id);
        Ok(courses)
    }

    async fn delete_course(&self, id: CourseId) -> Result<(), StorageError> {
        self.courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .remove(&id)
            .ok_or(StorageError::NotFound)?;
        self.progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .retain(|(_, course_id), _| *course_id != id);
        Ok(())
    }

    async fn add_material(
        &self,
        course_id: CourseId,
        material: NewMaterial,
    ) -> Result<Material, StorageError> {
        let material = material.with_id(MaterialId::new(self.next_id(|s| &mut s.material)?));
        let stored = material.clone();
        self.with_course(course_id, move |course| {
            let mut materials = course.materials().to_vec();
            materials.push(stored);
            let updated = rebuild_course(
                course,
                materials,
                course.questions(TestKind::Pre).to_vec(),
                course.questions(TestKind::Post).to_vec(),
            );
            (updated, ())
        })?;
        Ok(material)
    }

    async fn add_question(
        &self,
        course_id: CourseId,
        kind: TestKind,
        question: NewQuestion,
    ) -> Result<Question, StorageError> {
        let question = question.with_id(QuestionId::new(self.next_id(|s| &mut s.question)?));
        let stored = question.clone();
        self.with_course(course_id, move |course| {
            let mut pre = course.questions(TestKind::Pre).to_vec();
            let mut post = course.questions(TestKind::Post).to_vec();
            match kind {
                TestKind::Pre => pre.push(stored),
                TestKind::Post => post.push(stored),
            }
            let updated = rebuild_course(course, course.materials().to_vec(), pre, post);
            (updated, ())
        })?;
        Ok(question)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Progress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&(user_id, course_id)).cloned())
    }

    async fn list_progress_for_user(&self, user_id: UserId) -> Result<Vec<Progress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut records: Vec<Progress> = guard
            .values()
            .filter(|p| p.user_id() == user_id)
            .cloned()
            .collect();
        records.sort_by_key(Progress::course_id);
        Ok(records)
    }

    async fn list_all_progress(&self) -> Result<Vec<Progress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut records: Vec<Progress> = guard.values().cloned().collect();
        records.sort_by_key(|p| (p.user_id(), p.course_id()));
        Ok(records)
    }

    async fn upsert_progress(&self, progress: &Progress) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert((progress.user_id(), progress.course_id()), progress.clone());
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub courses: Arc<dyn CourseRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let users: Arc<dyn UserRepository> = Arc::new(repo.clone());
        let courses: Arc<dyn CourseRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self {
            users,
            courses,
            progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnmetrics_core::model::{
        ContentLevel, CourseDraft, KnowledgeLevel, MaterialDraft, Role, UserDraft,
    };
    use learnmetrics_core::time::fixed_now;

    fn course_draft() -> CourseDraft {
        CourseDraft {
            title: "JavaScript".into(),
            materials: vec![MaterialDraft {
                title: "Intro".into(),
                ..MaterialDraft::default()
            }],
            ..CourseDraft::default()
        }
    }

    fn learner(email: &str) -> NewUser {
        UserDraft {
            full_name: "Ada".into(),
            email: email.into(),
            role: Role::Learner,
        }
        .validate(fixed_now())
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let repo = InMemoryRepository::new();
        repo.insert_user(learner("ada@example.com")).await.unwrap();
        let err = repo.insert_user(learner("ada@example.com")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn added_material_keeps_course_order() {
        let repo = InMemoryRepository::new();
        let id = repo
            .insert_course(course_draft().validate().unwrap())
            .await
            .unwrap();
        let added = repo
            .add_material(
                id,
                MaterialDraft {
                    title: "Deep dive".into(),
                    level: Some(ContentLevel::Advanced),
                    ..MaterialDraft::default()
                }
                .validate()
                .unwrap(),
            )
            .await
            .unwrap();

        let course = repo.get_course(id).await.unwrap().unwrap();
        let titles: Vec<&str> = course.materials().iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, ["Intro", "Deep dive"]);
        assert_eq!(course.materials()[1].id, added.id);
    }

    #[tokio::test]
    async fn deleting_course_drops_its_progress() {
        let repo = InMemoryRepository::new();
        let user = repo.insert_user(learner("ada@example.com")).await.unwrap();
        let course_id = repo
            .insert_course(course_draft().validate().unwrap())
            .await
            .unwrap();

        let mut progress = Progress::new(user.id(), course_id, fixed_now());
        progress.select_knowledge_level(KnowledgeLevel::Basic, fixed_now());
        repo.upsert_progress(&progress).await.unwrap();

        repo.delete_course(course_id).await.unwrap();
        assert!(repo.get_progress(user.id(), course_id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete_course(course_id).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn adding_to_missing_course_is_not_found() {
        let repo = InMemoryRepository::new();
        let material = MaterialDraft {
            title: "Orphan".into(),
            ..MaterialDraft::default()
        }
        .validate()
        .unwrap();
        let err = repo
            .add_material(CourseId::new(99), material)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
