use std::sync::Arc;

use learnmetrics_core::placement::PlacementPolicy;
use storage::repository::Storage;

use crate::Clock;
use crate::analytics_service::AnalyticsService;
use crate::course_service::CourseService;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::user_service::UserService;

/// Assembles the request-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    users: Arc<UserService>,
    courses: Arc<CourseService>,
    progress: Arc<ProgressService>,
    analytics: Arc<AnalyticsService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        policy: PlacementPolicy,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(storage, clock, policy))
    }

    /// Build services over in-memory repositories.
    #[must_use]
    pub fn in_memory(clock: Clock, policy: PlacementPolicy) -> Self {
        Self::from_storage(Storage::in_memory(), clock, policy)
    }

    #[must_use]
    pub fn from_storage(storage: Storage, clock: Clock, policy: PlacementPolicy) -> Self {
        let users = Arc::new(UserService::new(clock, Arc::clone(&storage.users)));
        let courses = Arc::new(CourseService::new(Arc::clone(&storage.courses)));
        let progress = Arc::new(ProgressService::new(
            clock,
            policy,
            Arc::clone(&storage.users),
            Arc::clone(&storage.courses),
            Arc::clone(&storage.progress),
        ));
        let analytics = Arc::new(AnalyticsService::new(
            policy,
            Arc::clone(&storage.users),
            Arc::clone(&storage.progress),
        ));

        Self {
            users,
            courses,
            progress,
            analytics,
        }
    }

    #[must_use]
    pub fn users(&self) -> Arc<UserService> {
        Arc::clone(&self.users)
    }

    #[must_use]
    pub fn courses(&self) -> Arc<CourseService> {
        Arc::clone(&self.courses)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn analytics(&self) -> Arc<AnalyticsService> {
        Arc::clone(&self.analytics)
    }
}
