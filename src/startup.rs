//! Startup checks
//!
//! Idempotent one-time normalization run from `main` before serving:
//! create the target directories, verify the beets config template
//! exists, and normalize music directory ownership.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;

/// Startup check failures (fatal to serving).
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("beets config template does not exist: {0}")]
    MissingBeetsTemplate(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Run all startup checks. Safe to run on every restart.
pub fn run_checks(config: &Config) -> Result<(), StartupError> {
    ensure_dirs(config)?;

    if !config.beets.config_template.exists() {
        return Err(StartupError::MissingBeetsTemplate(
            config.beets.config_template.clone(),
        ));
    }

    // Top level only; extracted trees are re-owned per import. The tagger
    // needs write access here to move files into the library.
    if let Some(run_as) = config.beets.run_as {
        match std::os::unix::fs::chown(&config.music_dir, Some(run_as.uid), Some(run_as.gid)) {
            Ok(()) => info!(
                path = %config.music_dir.display(),
                uid = run_as.uid,
                gid = run_as.gid,
                "music directory ownership normalized"
            ),
            Err(err) => warn!(
                path = %config.music_dir.display(),
                error = %err,
                "could not change music directory ownership"
            ),
        }
    }

    Ok(())
}

/// Create every configured target directory that is missing.
pub fn ensure_dirs(config: &Config) -> io::Result<()> {
    for dir in [
        &config.music_dir,
        &config.books_dir,
        &config.inbox_dir,
        &config.beets.data_dir,
    ] {
        std::fs::create_dir_all(dir)?;
    }
    if let Some(parent) = config.snippets_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
