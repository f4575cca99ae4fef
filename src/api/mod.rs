//! API endpoints for dropzone

pub mod auth;
pub mod health;
pub mod upload;

pub use auth::BasicAuthLayer;
pub use health::health_routes;
pub use upload::{upload_routes, UploadResponse};
