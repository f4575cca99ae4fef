//! dropzone - self-hosted upload service
//!
//! Accepts file or text uploads through a web form and routes them to
//! one of four fixed workflows: music import via beets, book storage,
//! inbox copy, text append. Sits behind a TLS-terminating reverse proxy.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dropzone::config::Config;
use dropzone::{build_router, startup, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dropzone=info,tower_http=info")),
        )
        .init();

    info!("Starting dropzone upload service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 1: Resolve configuration from the environment
    let config = Arc::new(Config::from_env()?);
    info!(music_dir = %config.music_dir.display(), "configuration loaded");

    // Step 2: One-time directory/ownership normalization (idempotent)
    startup::run_checks(&config)?;
    info!("startup checks passed");

    // Step 3: Serve
    let state = AppState::new(config.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("Listening on http://{}", config.bind);
    info!("Health check: http://{}/health", config.bind);

    axum::serve(listener, app).await?;

    Ok(())
}
