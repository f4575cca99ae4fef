//! Music workflow: extract the archive, normalize ownership, run beets,
//! trigger a Navidrome rescan.
//!
//! The scratch extraction directory and the resolved temp config are
//! removed on every exit path (RAII handles).

use std::io::{self, Cursor};
use std::path::Path;

use axum::body::Bytes;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{Config, RunAs};
use crate::services::{beets, navidrome::NavidromeClient};
use crate::workflow::{Outcome, WorkflowError};

/// Import an uploaded zip archive into the music library.
pub async fn import(
    config: &Config,
    filename: &str,
    data: Bytes,
) -> Result<Outcome, WorkflowError> {
    info!(filename, size = data.len(), "music import requested");

    // Validate the payload before any filesystem mutation.
    let probe = data.clone();
    let is_zip = tokio::task::spawn_blocking(move || {
        zip::ZipArchive::new(Cursor::new(probe)).is_ok()
    })
    .await
    .map_err(|e| WorkflowError::Internal(format!("archive probe failed: {e}")))?;
    if !is_zip {
        return Err(WorkflowError::Validation(
            "File is not a zip archive.".into(),
        ));
    }

    // Scratch directory under the music tree. The dotted prefix keeps
    // media scanners away from half-extracted files.
    let scratch = tempfile::Builder::new()
        .prefix(".dropzone-")
        .tempdir_in(&config.music_dir)?;
    let extract_dir = scratch.path().join("extracted");
    std::fs::create_dir(&extract_dir)?;

    let dest = extract_dir.clone();
    let run_as = config.beets.run_as;
    let entries = tokio::task::spawn_blocking(move || -> Result<usize, WorkflowError> {
        let entries = extract_zip(data, &dest)?;
        // beets drops privileges and must be able to move (copy then
        // delete) the sources, so the extracted tree has to belong to it.
        if let Some(run_as) = run_as {
            chown_tree(&dest, run_as)?;
        }
        Ok(entries)
    })
    .await
    .map_err(|e| WorkflowError::Internal(format!("extraction task failed: {e}")))??;
    info!(entries, path = %extract_dir.display(), "archive extracted");

    let resolved = beets::resolve_config(&config.beets, &config.music_dir)
        .map_err(|e| WorkflowError::Tool(e.to_string()))?;
    let output = beets::import(&config.beets, resolved.path(), &extract_dir)
        .await
        .map_err(|e| WorkflowError::Tool(e.to_string()))?;
    debug!(output = %output, "beets import finished");

    match NavidromeClient::new(&config.navidrome).rescan().await {
        Ok(()) => Ok(Outcome::Success(
            "Music imported successfully. Navidrome rescan triggered.".into(),
        )),
        Err(err) => {
            // Files are already placed; report partial success, no rollback.
            warn!(error = %err, "navidrome rescan failed after successful import");
            Ok(Outcome::Partial(format!(
                "Music imported successfully. Navidrome rescan failed: {err}"
            )))
        }
    }
}

fn extract_zip(data: Bytes, dest: &Path) -> Result<usize, WorkflowError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|_| WorkflowError::Validation("File is not a zip archive.".into()))?;
    let entries = archive.len();
    archive
        .extract(dest)
        .map_err(|e| WorkflowError::Validation(format!("Could not extract zip archive: {e}")))?;
    Ok(entries)
}

fn chown_tree(root: &Path, run_as: RunAs) -> io::Result<()> {
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        std::os::unix::fs::chown(entry.path(), Some(run_as.uid), Some(run_as.gid))?;
    }
    Ok(())
}
