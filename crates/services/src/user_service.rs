use std::sync::Arc;

use learnmetrics_core::model::{User, UserDraft, UserId};
use storage::repository::{StorageError, UserRepository};
use tracing::info;

use crate::Clock;
use crate::error::UserServiceError;

/// Minimal user directory. Credentials are handled outside this service.
#[derive(Clone)]
pub struct UserService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
}

impl UserService {
    #[must_use]
    pub fn new(clock: Clock, users: Arc<dyn UserRepository>) -> Self {
        Self { clock, users }
    }

    /// Validate and persist a new user.
    ///
    /// # Errors
    ///
    /// Returns `UserServiceError::User` for validation failures.
    /// Returns `UserServiceError::DuplicateEmail` if the email is taken.
    /// Returns `UserServiceError::Storage` if persistence fails.
    pub async fn register(&self, draft: UserDraft) -> Result<User, UserServiceError> {
        let new_user = draft.validate(self.clock.now())?;
        let user = self
            .users
            .insert_user(new_user)
            .await
            .map_err(|e| match e {
                StorageError::Conflict => UserServiceError::DuplicateEmail,
                other => UserServiceError::Storage(other),
            })?;
        info!(user_id = %user.id(), role = user.role().as_str(), "registered user");
        Ok(user)
    }

    /// Fetch a user, failing when absent.
    ///
    /// # Errors
    ///
    /// Returns `UserServiceError::NotFound` if the user does not exist.
    /// Returns `UserServiceError::Storage` if repository access fails.
    pub async fn get_user(&self, id: UserId) -> Result<User, UserServiceError> {
        self.users
            .get_user(id)
            .await?
            .ok_or(UserServiceError::NotFound(id))
    }
}
