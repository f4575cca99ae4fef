//! Upload endpoint: multipart parsing and workflow dispatch
//!
//! `POST /upload` takes a multipart form with a `workflow` tag plus
//! either a `file` or a `text` field. Validation failures return 400
//! before any filesystem mutation; workflow failures return 500 with the
//! captured diagnostics. Success and failure alike use the
//! `{"ok": bool, "message": ...}` shape.

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::workflow::{self, Payload, Workflow, WorkflowError};
use crate::AppState;

/// Upload result reported to the caller.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub ok: bool,
    pub message: String,
}

/// POST /upload
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let mut workflow_tag: Option<String> = None;
    let mut text: Option<String> = None;
    let mut file: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("workflow") => {
                workflow_tag = Some(field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Could not read workflow field: {e}"))
                })?);
            }
            Some("text") => {
                text = Some(field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Could not read text field: {e}"))
                })?);
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let data = field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("Could not read file field: {e}"))
                })?;
                file = Some((filename, data));
            }
            _ => {}
        }
    }

    let Some(tag) = workflow_tag else {
        return Ok(reject("No workflow selected."));
    };
    let Some(workflow) = Workflow::from_tag(&tag) else {
        return Ok(reject(format!("Unknown workflow: {tag}")));
    };

    let payload = match workflow {
        Workflow::Text => match text {
            Some(snippet) => Payload::Text(snippet),
            None => return Ok(reject("No text provided.")),
        },
        _ => match file {
            Some((filename, data)) => Payload::File { filename, data },
            None => return Ok(reject("No file provided.")),
        },
    };

    info!(workflow = workflow.as_str(), "dispatching upload");
    match workflow::dispatch(&state.config, workflow, payload).await {
        Ok(outcome) => {
            if outcome.is_partial() {
                warn!(workflow = workflow.as_str(), message = outcome.message(), "partial success");
            }
            Ok((
                StatusCode::OK,
                Json(UploadResponse {
                    ok: true,
                    message: outcome.into_message(),
                }),
            ))
        }
        Err(err) => {
            error!(workflow = workflow.as_str(), error = %err, "workflow failed");
            *state.last_error.write().await = Some(err.to_string());
            let status = match &err {
                WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
                WorkflowError::Tool(_) | WorkflowError::Io(_) | WorkflowError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            Ok((
                status,
                Json(UploadResponse {
                    ok: false,
                    message: err.to_string(),
                }),
            ))
        }
    }
}

fn reject(message: impl Into<String>) -> (StatusCode, Json<UploadResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(UploadResponse {
            ok: false,
            message: message.into(),
        }),
    )
}

/// Build upload routes
pub fn upload_routes() -> Router<AppState> {
    Router::new().route("/upload", post(upload))
}
