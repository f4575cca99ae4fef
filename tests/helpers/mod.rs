//! Shared helpers for integration tests
#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use base64::{engine::general_purpose, Engine as _};
use http_body_util::BodyExt;
use serde_json::Value;
use zip::write::SimpleFileOptions;

use dropzone::config::{BeetsConfig, Config, Credentials, NavidromeConfig};

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";
pub const BOUNDARY: &str = "dropzone-test-boundary";

/// Config rooted in a temp directory. Beets is stubbed with /bin/true
/// and Navidrome points at the discard port; tests override as needed.
pub fn test_config(root: &Path) -> Config {
    Config {
        bind: "127.0.0.1:0".parse().unwrap(),
        credentials: Credentials {
            username: USERNAME.into(),
            password: PASSWORD.into(),
        },
        music_dir: root.join("music"),
        books_dir: root.join("books"),
        inbox_dir: root.join("inbox"),
        snippets_file: root.join("notes/snippets.txt"),
        beets: BeetsConfig {
            command: "/bin/true".into(),
            config_template: root.join("beets/config.yaml"),
            data_dir: root.join("beets/state"),
            run_as: None,
        },
        navidrome: NavidromeConfig {
            base_url: "http://127.0.0.1:9".into(),
            username: "admin".into(),
            password: String::new(),
        },
    }
}

/// Create the target directories and a beets config template, as the
/// startup checks would in production.
pub fn setup_dirs(config: &Config) {
    dropzone::startup::ensure_dirs(config).unwrap();
    std::fs::write(
        &config.beets.config_template,
        "directory: {{music_dir}}\nlibrary: {{beets_dir}}/library.db\n",
    )
    .unwrap();
}

pub enum Part<'a> {
    Text {
        name: &'a str,
        value: &'a str,
    },
    File {
        name: &'a str,
        filename: &'a str,
        content: &'a [u8],
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                filename,
                content,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(content);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(auth: Option<(&str, &str)>, parts: &[Part<'_>]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some((user, pass)) = auth {
        builder = builder.header(
            "authorization",
            format!(
                "Basic {}",
                general_purpose::STANDARD.encode(format!("{user}:{pass}"))
            ),
        );
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

pub fn authed() -> Option<(&'static str, &'static str)> {
    Some((USERNAME, PASSWORD))
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Build an in-memory zip containing the given files.
pub fn make_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    let mut writer = zip::ZipWriter::new(&mut buf);
    for (name, content) in files {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
    buf.into_inner()
}

/// Sorted file names in a directory.
pub fn dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Listener that counts incoming connections and closes them
/// immediately. Stands in for Navidrome when tests only care whether a
/// rescan was attempted.
pub async fn counting_listener() -> (String, Arc<AtomicUsize>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let count = Arc::new(AtomicUsize::new(0));
    let counter = count.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    drop(socket);
                }
                Err(_) => break,
            }
        }
    });
    (format!("http://127.0.0.1:{port}"), count)
}

/// Wait until the counter reaches `expected`, or give up after ~2s.
pub async fn wait_for_count(count: &AtomicUsize, expected: usize) -> usize {
    for _ in 0..40 {
        let seen = count.load(Ordering::SeqCst);
        if seen >= expected {
            return seen;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    count.load(Ordering::SeqCst)
}
