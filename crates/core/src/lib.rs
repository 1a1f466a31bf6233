#![forbid(unsafe_code)]

pub mod error;
pub mod grading;
pub mod insights;
pub mod materials;
pub mod model;
pub mod placement;
pub mod time;

pub use error::Error;
pub use time::Clock;
