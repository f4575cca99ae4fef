//! Text workflow: append a snippet to the flat snippets file.

use tokio::io::AsyncWriteExt;

use crate::config::Config;
use crate::workflow::{Outcome, WorkflowError};

/// Separator keeping successive snippets distinguishable.
const SEPARATOR: &str = "\n\n---\n\n";

/// Append the trimmed snippet plus a separator to the snippets file.
/// Append-only: prior content is never truncated or rewritten.
pub async fn append_snippet(config: &Config, text: &str) -> Result<Outcome, WorkflowError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(WorkflowError::Validation("No text provided.".into()));
    }

    if let Some(parent) = config.snippets_file.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.snippets_file)
        .await?;
    file.write_all(trimmed.as_bytes()).await?;
    file.write_all(SEPARATOR.as_bytes()).await?;
    file.flush().await?;

    Ok(Outcome::Success("Text snippet appended successfully.".into()))
}
