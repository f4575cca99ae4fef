//! HTTP Basic authentication layer
//!
//! Every route except `/health` requires the configured credential pair.
//! No sessions, no rate limiting, no lockout: TLS and abuse protection
//! live at the reverse proxy in front of this service.
//!
//! Implemented as a tower layer so the router stays a plain composition
//! of per-module route sets.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use sha2::{Digest, Sha256};
use tower::{Layer, Service};

use crate::config::Credentials;

/// Tower layer enforcing Basic auth on all routes except `/health`.
#[derive(Clone)]
pub struct BasicAuthLayer {
    credentials: Arc<Credentials>,
}

impl BasicAuthLayer {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials: Arc::new(credentials),
        }
    }
}

impl<S> Layer<S> for BasicAuthLayer {
    type Service = BasicAuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BasicAuthMiddleware {
            inner,
            credentials: self.credentials.clone(),
        }
    }
}

/// Tower service performing the credential check.
#[derive(Clone)]
pub struct BasicAuthMiddleware<S> {
    inner: S,
    credentials: Arc<Credentials>,
}

impl<S> Service<Request> for BasicAuthMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let credentials = self.credentials.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            // Health stays open for monitoring.
            if request.uri().path() == "/health" {
                return inner.call(request).await;
            }

            match authorize(request.headers(), &credentials) {
                Ok(()) => inner.call(request).await,
                Err(response) => Ok(response),
            }
        })
    }
}

fn authorize(headers: &HeaderMap, credentials: &Credentials) -> Result<(), Response> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(challenge)?;
    let encoded = header.strip_prefix("Basic ").ok_or_else(challenge)?;
    let decoded = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| challenge())?;
    let decoded = String::from_utf8(decoded).map_err(|_| challenge())?;
    let (username, password) = decoded.split_once(':').ok_or_else(challenge)?;

    if digest_eq(username, &credentials.username) && digest_eq(password, &credentials.password) {
        Ok(())
    } else {
        Err(challenge())
    }
}

/// Compare via SHA-256 digests so a mismatch does not leak how much of
/// the credential matched.
fn digest_eq(provided: &str, expected: &str) -> bool {
    Sha256::digest(provided.as_bytes()) == Sha256::digest(expected.as_bytes())
}

fn challenge() -> Response {
    let body = Json(json!({
        "error": {
            "code": "UNAUTHORIZED",
            "message": "Authentication required",
        }
    }));
    let mut response = (StatusCode::UNAUTHORIZED, body).into_response();
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static(r#"Basic realm="dropzone""#),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            username: "admin".into(),
            password: "secret".into(),
        }
    }

    fn header_map(value: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = value {
            headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    fn basic(user: &str, pass: &str) -> String {
        format!(
            "Basic {}",
            general_purpose::STANDARD.encode(format!("{user}:{pass}"))
        )
    }

    #[test]
    fn valid_credentials_pass() {
        assert!(authorize(&header_map(Some(&basic("admin", "secret"))), &credentials()).is_ok());
    }

    #[test]
    fn missing_header_is_challenged() {
        let response = authorize(&header_map(None), &credentials()).unwrap_err();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[test]
    fn wrong_password_is_challenged() {
        assert!(authorize(&header_map(Some(&basic("admin", "nope"))), &credentials()).is_err());
    }

    #[test]
    fn wrong_username_is_challenged() {
        assert!(authorize(&header_map(Some(&basic("root", "secret"))), &credentials()).is_err());
    }

    #[test]
    fn malformed_header_is_challenged() {
        assert!(authorize(&header_map(Some("Bearer abc")), &credentials()).is_err());
        assert!(authorize(&header_map(Some("Basic %%%")), &credentials()).is_err());
        let no_colon = format!("Basic {}", general_purpose::STANDARD.encode("admin"));
        assert!(authorize(&header_map(Some(&no_colon)), &credentials()).is_err());
    }
}
