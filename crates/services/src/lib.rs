#![forbid(unsafe_code)]

pub mod analytics_service;
pub mod app_services;
pub mod course_service;
pub mod error;
pub mod progress_service;
pub mod user_service;

pub use learnmetrics_core::Clock;

pub use analytics_service::{AnalyticsService, LearnerProgress};
pub use app_services::AppServices;
pub use course_service::CourseService;
pub use error::{
    AnalyticsServiceError, AppServicesError, CourseServiceError, ProgressServiceError,
    UserServiceError,
};
pub use progress_service::{MaterialsView, ProgressService, ResultUpdate, TestSubmission};
pub use user_service::UserService;
