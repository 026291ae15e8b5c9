//! Local version server and CDN for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path as UrlPath, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use md5::{Digest, Md5};
use serde_json::json;
use tokio::net::TcpListener;

use launchkit::package::{
    AddOnPackageDescriptor, GameChannel, Locale, PackageDescriptor, VersionMetadata,
};

/// Deterministic archive contents.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Lowercase hex MD5, as the version server publishes it.
pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", Md5::digest(data))
}

#[derive(Clone, Default)]
struct ServerState {
    metadata: Arc<Mutex<(StatusCode, String)>>,
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    metadata_requests: Arc<AtomicUsize>,
    file_requests: Arc<AtomicUsize>,
    ranges: Arc<Mutex<Vec<String>>>,
}

/// A running test server.
pub struct TestServer {
    pub base_url: String,
    state: ServerState,
}

impl TestServer {
    pub async fn start() -> Self {
        let state = ServerState::default();
        *state.metadata.lock().unwrap() = (StatusCode::NOT_FOUND, String::new());

        let app = Router::new()
            .route("/versions", get(serve_metadata))
            .route("/files/:name", get(serve_file).head(head_file))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn versions_url(&self) -> String {
        format!("{}/versions", self.base_url)
    }

    /// Publish `metadata` in a successful envelope.
    pub fn publish(&self, metadata: &VersionMetadata) {
        let body = json!({ "retcode": 0, "message": "OK", "data": metadata });
        self.respond(StatusCode::OK, body.to_string());
    }

    /// Answer metadata requests with a fixed status and body.
    pub fn respond(&self, status: StatusCode, body: impl Into<String>) {
        *self.state.metadata.lock().unwrap() = (status, body.into());
    }

    pub fn metadata_requests(&self) -> usize {
        self.state.metadata_requests.load(Ordering::SeqCst)
    }

    /// HEAD and GET requests for archives.
    pub fn file_requests(&self) -> usize {
        self.state.file_requests.load(Ordering::SeqCst)
    }

    /// `Range` headers received so far.
    pub fn ranges(&self) -> Vec<String> {
        self.state.ranges.lock().unwrap().clone()
    }

    fn host(&self, name: &str, len: usize) -> String {
        self.state
            .files
            .lock()
            .unwrap()
            .insert(name.to_string(), payload(len));
        format!("{}/files/{}", self.base_url, name)
    }

    fn add_on(&self, locale: Locale, name: String, len: usize) -> AddOnPackageDescriptor {
        AddOnPackageDescriptor {
            language: locale.code().to_string(),
            path: self.host(&name, len),
            name,
            md5: None,
            size: Some(len as u64),
            package_size: None,
        }
    }

    /// Host a base archive and its en-us and ja-jp add-ons (half its size).
    pub fn package(&self, name: &str, version: &str, len: usize) -> PackageDescriptor {
        let add_ons = vec![
            self.add_on(Locale::EnUs, format!("Audio_English(US)_{}", name), len / 2),
            self.add_on(Locale::JaJp, format!("Audio_Japanese_{}", name), len / 2),
        ];

        PackageDescriptor {
            name: name.to_string(),
            version: version.to_string(),
            path: self.host(name, len),
            md5: None,
            size: Some(len as u64),
            package_size: None,
            add_ons,
        }
    }

    /// `4.0.0` released with diffs from `3.9.0` and `3.8.0`.
    pub fn released(&self) -> GameChannel {
        GameChannel {
            latest: self.package("game_4.0.0.zip", "4.0.0", 4000),
            diffs: vec![
                self.package("game_3.9.0_4.0.0_hdiff.zip", "3.9.0", 400),
                self.package("game_3.8.0_4.0.0_hdiff.zip", "3.8.0", 800),
            ],
        }
    }

    /// `4.1.0` pre-download with a diff from `4.0.0`.
    pub fn pre_download(&self) -> GameChannel {
        GameChannel {
            latest: self.package("game_4.1.0.zip", "4.1.0", 4100),
            diffs: vec![self.package("game_4.0.0_4.1.0_hdiff.zip", "4.0.0", 410)],
        }
    }
}

async fn serve_metadata(State(state): State<ServerState>) -> Response {
    state.metadata_requests.fetch_add(1, Ordering::SeqCst);
    let (status, body) = state.metadata.lock().unwrap().clone();
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn head_file(State(state): State<ServerState>, UrlPath(name): UrlPath<String>) -> Response {
    state.file_requests.fetch_add(1, Ordering::SeqCst);
    let len = match state.files.lock().unwrap().get(&name) {
        Some(data) => data.len(),
        None => return StatusCode::NOT_FOUND.into_response(),
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_LENGTH, len.to_string()),
            (header::ACCEPT_RANGES, "bytes".to_string()),
        ],
    )
        .into_response()
}

async fn serve_file(
    State(state): State<ServerState>,
    UrlPath(name): UrlPath<String>,
    headers: HeaderMap,
) -> Response {
    state.file_requests.fetch_add(1, Ordering::SeqCst);
    let body = match state.files.lock().unwrap().get(&name) {
        Some(data) => data.clone(),
        None => return StatusCode::NOT_FOUND.into_response(),
    };
    let total = body.len();

    if let Some(range) = headers.get(header::RANGE).and_then(|v| v.to_str().ok()) {
        state.ranges.lock().unwrap().push(range.to_string());

        // Only open-ended "bytes=START-" ranges are needed
        if let Some(start) = range
            .strip_prefix("bytes=")
            .and_then(|r| r.strip_suffix('-'))
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|start| *start < total)
        {
            let slice = body[start..].to_vec();
            return (
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_RANGE, format!("bytes {}-{}/{}", start, total - 1, total)),
                    (header::CONTENT_LENGTH, slice.len().to_string()),
                ],
                slice,
            )
                .into_response();
        }
    }

    (
        StatusCode::OK,
        [(header::CONTENT_LENGTH, total.to_string())],
        body,
    )
        .into_response()
}

/// Write a base version file the way the game stores it.
pub fn write_base_version(file: &Path, version: &str) {
    std::fs::create_dir_all(file.parent().unwrap()).unwrap();
    std::fs::write(file, format!("\0\0unity {}_4567_8910 \0", version)).unwrap();
}

/// Write a 3-byte add-on version marker.
pub fn write_marker(add_on_dir: &Path, locale: Locale, bytes: [u8; 3]) {
    let folder = add_on_dir.join(locale.folder_name());
    std::fs::create_dir_all(&folder).unwrap();
    std::fs::write(folder.join(".version"), bytes).unwrap();
}
