use std::collections::BTreeMap;
use std::sync::Arc;

use learnmetrics_core::insights::{
    LearnerInsight, SystemAnalytics, learner_insight, system_analytics,
};
use learnmetrics_core::model::{CourseId, Progress, User, UserId};
use learnmetrics_core::placement::PlacementPolicy;
use storage::repository::{ProgressRepository, UserRepository};
use tracing::debug;

use crate::error::AnalyticsServiceError;

/// A user together with every course record they own.
#[derive(Debug, Clone, PartialEq)]
pub struct LearnerProgress {
    pub user: User,
    pub progress: Vec<Progress>,
}

/// Read-only reporting over users and their progress.
#[derive(Clone)]
pub struct AnalyticsService {
    policy: PlacementPolicy,
    users: Arc<dyn UserRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl AnalyticsService {
    #[must_use]
    pub fn new(
        policy: PlacementPolicy,
        users: Arc<dyn UserRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            policy,
            users,
            progress,
        }
    }

    /// Platform-wide learner, test, and improvement totals.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsServiceError::Storage` if repository access fails.
    pub async fn system_analytics(&self) -> Result<SystemAnalytics, AnalyticsServiceError> {
        let users = self.users.list_users().await?;
        let records = self.progress.list_all_progress().await?;
        let analytics = system_analytics(&users, &records);
        debug!(
            learners = analytics.total_learners,
            tests = analytics.total_tests,
            "computed system analytics"
        );
        Ok(analytics)
    }

    /// Every user with their progress records, ordered by user ID.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsServiceError::Storage` if repository access fails.
    pub async fn all_progress(&self) -> Result<Vec<LearnerProgress>, AnalyticsServiceError> {
        let users = self.users.list_users().await?;
        let mut by_user: BTreeMap<UserId, Vec<Progress>> = BTreeMap::new();
        for record in self.progress.list_all_progress().await? {
            by_user.entry(record.user_id()).or_default().push(record);
        }

        Ok(users
            .into_iter()
            .map(|user| {
                let progress = by_user.remove(&user.id()).unwrap_or_default();
                LearnerProgress { user, progress }
            })
            .collect())
    }

    /// Results-page insight for one learner in one course.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsServiceError::UserNotFound` if the user does not
    /// exist, `ProgressNotFound` if they have no record for the course.
    pub async fn learner_insight(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<LearnerInsight, AnalyticsServiceError> {
        if self.users.get_user(user_id).await?.is_none() {
            return Err(AnalyticsServiceError::UserNotFound(user_id));
        }
        let progress = self
            .progress
            .get_progress(user_id, course_id)
            .await?
            .ok_or(AnalyticsServiceError::ProgressNotFound { user_id, course_id })?;
        Ok(learner_insight(&progress, &self.policy))
    }
}
