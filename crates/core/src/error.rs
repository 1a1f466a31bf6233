use thiserror::Error;

use crate::model::{CourseError, LevelError, ParseIdError, ProgressError, UserError};
use crate::placement::PlacementError;

/// Any validation failure raised by the domain layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Level(#[from] LevelError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error(transparent)]
    ParseId(#[from] ParseIdError),
}
