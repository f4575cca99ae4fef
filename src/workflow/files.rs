//! Books and inbox workflows: copy an upload into a target directory.
//!
//! Placement is atomic (written to a temp name in the target directory,
//! then linked into place) and never overwrites: on collision a numeric
//! suffix is appended until a free name is found.

use std::ffi::OsStr;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use tempfile::NamedTempFile;
use tracing::info;

use crate::config::Config;
use crate::workflow::{Outcome, WorkflowError};

/// Extensions the books workflow accepts (case-insensitive).
pub const BOOK_EXTENSIONS: &[&str] = &["pdf", "epub", "mobi", "azw3", "djvu", "txt"];

/// Store a book upload. Restricted to [`BOOK_EXTENSIONS`].
pub async fn store_book(
    config: &Config,
    filename: &str,
    data: Bytes,
) -> Result<Outcome, WorkflowError> {
    let ext = Path::new(filename)
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase);
    match ext {
        Some(ext) if BOOK_EXTENSIONS.contains(&ext.as_str()) => {}
        _ => {
            return Err(WorkflowError::Validation(format!(
                "Unsupported book file type; expected one of: {}",
                BOOK_EXTENSIONS.join(", ")
            )))
        }
    }

    let placed = store(&config.books_dir, filename, data).await?;
    info!(path = %placed.display(), "book stored");
    Ok(Outcome::Success("Book uploaded successfully.".into()))
}

/// Store an inbox upload. Any file type is accepted.
pub async fn store_inbox(
    config: &Config,
    filename: &str,
    data: Bytes,
) -> Result<Outcome, WorkflowError> {
    let placed = store(&config.inbox_dir, filename, data).await?;
    info!(path = %placed.display(), "inbox file stored");
    Ok(Outcome::Success("File uploaded successfully.".into()))
}

async fn store(dir: &Path, filename: &str, data: Bytes) -> Result<PathBuf, WorkflowError> {
    let dir = dir.to_path_buf();
    let filename = filename.to_string();
    tokio::task::spawn_blocking(move || place_file(&dir, &filename, &data))
        .await
        .map_err(|e| WorkflowError::Internal(format!("storage task failed: {e}")))?
        .map_err(WorkflowError::Io)
}

/// Write `data` under `dir`, atomically and without overwriting.
///
/// The content goes to a temp file in the same directory first, so the
/// visible target path never holds a partial write.
pub fn place_file(dir: &Path, filename: &str, data: &[u8]) -> io::Result<PathBuf> {
    let filename = sanitize_filename(filename);

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;

    let mut attempt = 0u32;
    loop {
        let candidate = dir.join(candidate_name(&filename, attempt));
        match tmp.persist_noclobber(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                tmp = err.file;
                attempt += 1;
            }
            Err(err) => return Err(err.error),
        }
    }
}

/// Reduce an uploaded filename to its final path component.
fn sanitize_filename(name: &str) -> String {
    Path::new(name)
        .file_name()
        .and_then(OsStr::to_str)
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(str::to_string)
        .unwrap_or_else(|| "upload".to_string())
}

/// Deterministic collision naming: `name.ext`, `name-1.ext`, `name-2.ext`, ...
fn candidate_name(filename: &str, attempt: u32) -> String {
    if attempt == 0 {
        return filename.to_string();
    }
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{attempt}.{ext}"),
        _ => format!("{filename}-{attempt}"),
    }
}
