//! Upload workflows
//!
//! A request declares one of four fixed workflows; the dispatcher runs
//! exactly one of them to completion. Workflows are independent and
//! stateless across requests; the filesystem is the only shared state.

pub mod files;
pub mod music;
pub mod text;

use axum::body::Bytes;
use thiserror::Error;

use crate::config::Config;

/// The closed set of upload workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workflow {
    Music,
    Books,
    Inbox,
    Text,
}

impl Workflow {
    /// Parse the form's workflow tag. Unknown tags are rejected before
    /// any filesystem mutation.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "music" => Some(Workflow::Music),
            "books" => Some(Workflow::Books),
            "inbox" => Some(Workflow::Inbox),
            "text" => Some(Workflow::Text),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Workflow::Music => "music",
            Workflow::Books => "books",
            Workflow::Inbox => "inbox",
            Workflow::Text => "text",
        }
    }
}

/// Payload routed to a workflow: a file upload or a text snippet.
#[derive(Debug)]
pub enum Payload {
    File { filename: String, data: Bytes },
    Text(String),
}

/// Workflow result reported to the caller.
#[derive(Debug)]
pub enum Outcome {
    /// Everything succeeded.
    Success(String),
    /// The import succeeded but a non-essential follow-up (the library
    /// rescan) failed; files are in place.
    Partial(String),
}

impl Outcome {
    pub fn message(&self) -> &str {
        match self {
            Outcome::Success(msg) | Outcome::Partial(msg) => msg,
        }
    }

    pub fn into_message(self) -> String {
        match self {
            Outcome::Success(msg) | Outcome::Partial(msg) => msg,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Outcome::Partial(_))
    }
}

/// Workflow failures, mapped to HTTP status by the upload handler.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Invalid payload for the chosen workflow (400). Raised before any
    /// filesystem mutation.
    #[error("{0}")]
    Validation(String),

    /// External tool or service failure (500), with captured diagnostics.
    #[error("{0}")]
    Tool(String),

    /// Filesystem failure (500).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal task failure (500).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Route a payload to its workflow. Exactly one handler runs.
pub async fn dispatch(
    config: &Config,
    workflow: Workflow,
    payload: Payload,
) -> Result<Outcome, WorkflowError> {
    match (workflow, payload) {
        (Workflow::Text, Payload::Text(snippet)) => text::append_snippet(config, &snippet).await,
        (Workflow::Music, Payload::File { filename, data }) => {
            music::import(config, &filename, data).await
        }
        (Workflow::Books, Payload::File { filename, data }) => {
            files::store_book(config, &filename, data).await
        }
        (Workflow::Inbox, Payload::File { filename, data }) => {
            files::store_inbox(config, &filename, data).await
        }
        (Workflow::Text, Payload::File { .. }) => {
            Err(WorkflowError::Validation("No text provided.".into()))
        }
        (_, Payload::Text(_)) => Err(WorkflowError::Validation("No file provided.".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tags_parse() {
        assert_eq!(Workflow::from_tag("music"), Some(Workflow::Music));
        assert_eq!(Workflow::from_tag("books"), Some(Workflow::Books));
        assert_eq!(Workflow::from_tag("inbox"), Some(Workflow::Inbox));
        assert_eq!(Workflow::from_tag("text"), Some(Workflow::Text));
    }

    #[test]
    fn unknown_tags_rejected() {
        assert_eq!(Workflow::from_tag(""), None);
        assert_eq!(Workflow::from_tag("Music"), None);
        assert_eq!(Workflow::from_tag("videos"), None);
        assert_eq!(Workflow::from_tag(" music"), None);
    }

    #[test]
    fn tag_round_trips() {
        for tag in ["music", "books", "inbox", "text"] {
            assert_eq!(Workflow::from_tag(tag).unwrap().as_str(), tag);
        }
    }
}
