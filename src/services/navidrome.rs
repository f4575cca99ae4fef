//! Navidrome rescan client
//!
//! Navidrome exposes the Subsonic-compatible API; a library rescan is
//! triggered with `GET /rest/startScan.view`. The call is authenticated
//! with the configured credentials and bounded by a short timeout. A
//! rescan failure never rolls back an otherwise-successful import.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::config::NavidromeConfig;

const SUBSONIC_API_VERSION: &str = "1.16.1";
const CLIENT_NAME: &str = "dropzone";
const RESCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// Navidrome client errors
#[derive(Debug, Error)]
pub enum NavidromeError {
    #[error("Navidrome request failed: {0}")]
    Network(String),

    #[error("Navidrome returned HTTP {0}")]
    Http(u16),

    #[error("Navidrome rejected the scan request: {0}")]
    Api(String),

    #[error("Failed to parse Navidrome response: {0}")]
    Parse(String),
}

/// Subsonic JSON envelope
#[derive(Debug, Deserialize)]
struct SubsonicEnvelope {
    #[serde(rename = "subsonic-response")]
    subsonic_response: SubsonicResponse,
}

#[derive(Debug, Deserialize)]
struct SubsonicResponse {
    status: String,
    error: Option<SubsonicError>,
}

#[derive(Debug, Deserialize)]
struct SubsonicError {
    code: Option<i64>,
    message: Option<String>,
}

/// Client for the Navidrome rescan endpoint.
pub struct NavidromeClient {
    base_url: String,
    username: String,
    password: String,
    http: reqwest::Client,
}

impl NavidromeClient {
    pub fn new(config: &NavidromeConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            http: reqwest::Client::new(),
        }
    }

    /// Ask Navidrome to re-index its library.
    pub async fn rescan(&self) -> Result<(), NavidromeError> {
        let url = format!("{}/rest/startScan.view", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("u", self.username.as_str()),
                ("p", self.password.as_str()),
                ("v", SUBSONIC_API_VERSION),
                ("c", CLIENT_NAME),
                ("f", "json"),
            ])
            .timeout(RESCAN_TIMEOUT)
            .send()
            .await
            .map_err(|e| NavidromeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NavidromeError::Http(status.as_u16()));
        }

        let envelope: SubsonicEnvelope = response
            .json()
            .await
            .map_err(|e| NavidromeError::Parse(e.to_string()))?;

        if envelope.subsonic_response.status != "ok" {
            let message = envelope
                .subsonic_response
                .error
                .map(|e| match e.code {
                    Some(code) => format!(
                        "{} (code {code})",
                        e.message.unwrap_or_else(|| "unknown error".into())
                    ),
                    None => e.message.unwrap_or_else(|| "unknown error".into()),
                })
                .unwrap_or_else(|| "unknown error".into());
            return Err(NavidromeError::Api(message));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_envelope_parses() {
        let body = r#"{"subsonic-response":{"status":"ok","version":"1.16.1"}}"#;
        let envelope: SubsonicEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.subsonic_response.status, "ok");
        assert!(envelope.subsonic_response.error.is_none());
    }

    #[test]
    fn failed_envelope_carries_the_error() {
        let body = r#"{"subsonic-response":{"status":"failed","error":{"code":40,"message":"Wrong username or password"}}}"#;
        let envelope: SubsonicEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.subsonic_response.status, "failed");
        let error = envelope.subsonic_response.error.unwrap();
        assert_eq!(error.code, Some(40));
        assert_eq!(error.message.as_deref(), Some("Wrong username or password"));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        // Port 9 (discard) is assumed closed; connection is refused fast.
        let client = NavidromeClient::new(&NavidromeConfig {
            base_url: "http://127.0.0.1:9".into(),
            username: "admin".into(),
            password: String::new(),
        });
        let err = client.rescan().await.unwrap_err();
        assert!(matches!(err, NavidromeError::Network(_)));
    }
}
