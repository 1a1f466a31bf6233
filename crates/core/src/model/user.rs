use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("full name cannot be empty")]
    EmptyName,

    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Learner,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Learner => "learner",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "learner" => Ok(Self::Learner),
            "admin" => Ok(Self::Admin),
            other => Err(UserError::UnknownRole(other.to_owned())),
        }
    }
}

/// Account that owns progress records. Credentials live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    full_name: String,
    email: String,
    role: Role,
    is_new_user: bool,
    created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn from_persisted(
        id: UserId,
        full_name: String,
        email: String,
        role: Role,
        is_new_user: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            full_name,
            email,
            role,
            is_new_user,
            created_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn is_learner(&self) -> bool {
        self.role == Role::Learner
    }

    #[must_use]
    pub fn is_new_user(&self) -> bool {
        self.is_new_user
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub full_name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl UserDraft {
    /// Normalise and validate the draft. Emails are trimmed and lowercased.
    ///
    /// # Errors
    ///
    /// Returns `UserError` if the name is blank or the email is malformed.
    pub fn validate(self, now: DateTime<Utc>) -> Result<NewUser, UserError> {
        let full_name = self.full_name.trim().to_owned();
        if full_name.is_empty() {
            return Err(UserError::EmptyName);
        }
        let email = self.email.trim().to_lowercase();
        let well_formed = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !well_formed {
            return Err(UserError::InvalidEmail(email));
        }
        Ok(NewUser {
            full_name,
            email,
            role: self.role,
            created_at: now,
        })
    }
}

impl NewUser {
    #[must_use]
    pub fn with_id(self, id: UserId) -> User {
        User::from_persisted(id, self.full_name, self.email, self.role, true, self.created_at)
    }
}
