#![forbid(unsafe_code)]

pub mod dto;
pub mod error;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::router;
pub use server::{ServerConfig, serve};
