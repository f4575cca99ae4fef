//! dropzone library interface
//!
//! Exposes the router and application state for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod startup;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, Router};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::config::Config;

/// Uploads up to 1 GiB; anything larger is the proxy's problem.
const MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Immutable configuration built once at startup
    pub config: Arc<Config>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last workflow error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let auth = api::BasicAuthLayer::new(state.config.credentials.clone());

    Router::new()
        .merge(api::upload_routes())
        .merge(api::health_routes())
        .layer(auth)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
