//! HTTP error mapping. Every failure renders as `{"message": ...}`; server
//! errors add an `error` field with the underlying cause.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use services::{
    AnalyticsServiceError, CourseServiceError, ProgressServiceError, UserServiceError,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error("server error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Internal(cause) => {
                error!(%cause, "request failed");
                json!({ "message": "Server error", "error": cause })
            }
            Self::NotFound(message) => {
                warn!(reason = *message, "not found");
                json!({ "message": message })
            }
            Self::BadRequest(message) => json!({ "message": message }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::NotFound(_) => Self::NotFound("User not found"),
            UserServiceError::DuplicateEmail => Self::BadRequest(err.to_string()),
            UserServiceError::User(e) => Self::BadRequest(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<CourseServiceError> for ApiError {
    fn from(err: CourseServiceError) -> Self {
        match err {
            CourseServiceError::NotFound(_) => Self::NotFound("Course not found"),
            CourseServiceError::Course(e) => Self::BadRequest(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<ProgressServiceError> for ApiError {
    fn from(err: ProgressServiceError) -> Self {
        match err {
            ProgressServiceError::UserNotFound(_) => Self::NotFound("User not found"),
            ProgressServiceError::CourseNotFound(_) => Self::NotFound("Course not found"),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<AnalyticsServiceError> for ApiError {
    fn from(err: AnalyticsServiceError) -> Self {
        match err {
            AnalyticsServiceError::UserNotFound(_) => Self::NotFound("User not found"),
            AnalyticsServiceError::ProgressNotFound { .. } => {
                Self::NotFound("Progress not found")
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnmetrics_core::model::UserId;

    #[test]
    fn service_errors_map_to_statuses() {
        let missing: ApiError = ProgressServiceError::UserNotFound(UserId::new(1)).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.to_string(), "User not found");

        let duplicate: ApiError = UserServiceError::DuplicateEmail.into();
        assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);
    }
}
