//! beets auto-tagger integration
//!
//! Resolves the beets config from a template and runs `beet import` as a
//! subprocess, optionally dropping privileges to the configured identity.
//! Failures carry the captured stderr for diagnostics.
//!
//! Known edge: beets appends a numeric suffix to a filename when its own
//! database already has a matching entry, so repeated imports of the same
//! archive produce duplicate-looking files. Resetting the beets database
//! is the documented recovery path.

use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::config::BeetsConfig;

/// Placeholder in the config template replaced with the music library root.
pub const MUSIC_DIR_PLACEHOLDER: &str = "{{music_dir}}";
/// Placeholder replaced with the beets state directory (database, logs).
pub const BEETS_DIR_PLACEHOLDER: &str = "{{beets_dir}}";

const IMPORT_TIMEOUT: Duration = Duration::from_secs(300);

/// beets invocation errors
#[derive(Debug, Error)]
pub enum BeetsError {
    /// Tagger binary not found in PATH
    #[error("beets binary `{0}` not found (is beets installed?)")]
    BinaryNotFound(String),

    /// Non-zero exit, with captured diagnostics
    #[error("beets import failed: {0}")]
    ImportFailed(String),

    /// Import exceeded the timeout
    #[error("beets import timed out after {0} seconds")]
    Timeout(u64),

    /// Config template could not be read
    #[error("beets config template `{0}` could not be read: {1}")]
    Template(PathBuf, io::Error),

    /// I/O error (temp file, subprocess plumbing)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Substitute the template placeholders with the configured paths.
pub fn render_config(template: &str, music_dir: &Path, beets_dir: &Path) -> String {
    template
        .replace(MUSIC_DIR_PLACEHOLDER, &music_dir.display().to_string())
        .replace(BEETS_DIR_PLACEHOLDER, &beets_dir.display().to_string())
}

/// Read the config template, substitute placeholders, and write the
/// result to a temp file readable by the unprivileged identity. The file
/// is deleted when the returned handle drops.
pub fn resolve_config(beets: &BeetsConfig, music_dir: &Path) -> Result<NamedTempFile, BeetsError> {
    let template = std::fs::read_to_string(&beets.config_template)
        .map_err(|e| BeetsError::Template(beets.config_template.clone(), e))?;
    let rendered = render_config(&template, music_dir, &beets.data_dir);

    let mut file = NamedTempFile::new()?;
    file.write_all(rendered.as_bytes())?;
    file.flush()?;

    // beets may drop privileges; the resolved config must stay readable.
    let mut perms = file.as_file().metadata()?.permissions();
    perms.set_mode(0o644);
    file.as_file().set_permissions(perms)?;

    debug!(path = %file.path().display(), "beets config resolved");
    Ok(file)
}

/// Run `beet --config <config> import <source_dir>` and capture output.
pub async fn import(
    beets: &BeetsConfig,
    config_path: &Path,
    source_dir: &Path,
) -> Result<String, BeetsError> {
    let mut cmd = tokio::process::Command::new(&beets.command);
    cmd.arg("--config")
        .arg(config_path)
        .arg("import")
        .arg(source_dir)
        .kill_on_drop(true);
    if let Some(run_as) = beets.run_as {
        cmd.uid(run_as.uid).gid(run_as.gid);
    }

    let output = match tokio::time::timeout(IMPORT_TIMEOUT, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(err)) if err.kind() == io::ErrorKind::NotFound => {
            return Err(BeetsError::BinaryNotFound(beets.command.clone()))
        }
        Ok(Err(err)) => return Err(BeetsError::Io(err)),
        Err(_) => return Err(BeetsError::Timeout(IMPORT_TIMEOUT.as_secs())),
    };

    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if stdout.is_empty() {
            "Beets import complete.".to_string()
        } else {
            stdout
        })
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(BeetsError::ImportFailed(if stderr.is_empty() {
            format!("exit status {}", output.status)
        } else {
            stderr
        }))
    }
}
