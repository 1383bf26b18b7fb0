#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use scenecast_api::config::ServerConfig;
use scenecast_api::router::build_app_router;
use scenecast_api::state::{build_state, AppState};
use scenecast_core::types::DbId;
use scenecast_db::models::job::Job;
use scenecast_db::models::status::JobStatus;
use scenecast_db::models::video::{NewVideo, Video};
use scenecast_db::{MemoryStore, RecordStore};
use scenecast_queue::{InProcessQueue, WorkQueue};

pub const BOUNDARY: &str = "scenecast-test-boundary";

/// Build a test `ServerConfig` with safe defaults and fast simulated work.
pub fn test_config(upload_dir: &std::path::Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        heartbeat_interval_secs: 30,
        max_concurrency: 2,
        poll_interval_ms: 50,
        sim_steps: 2,
        sim_step_delay_ms: 10,
        upload_dir: upload_dir.to_string_lossy().into_owned(),
        max_upload_bytes: 64 * 1024,
        ..ServerConfig::default()
    }
}

/// The router plus the state behind it, backed by the in-memory store.
///
/// The job queue is not started until [`TestApp::start_queue`], so jobs
/// stay `queued` for tests that only exercise the HTTP surface.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub shutdown: CancellationToken,
    _uploads: TempDir,
}

impl TestApp {
    pub async fn start_queue(&self) {
        self.state
            .queue
            .start(self.shutdown.clone())
            .await
            .expect("queue start");
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

pub async fn build_test_app() -> TestApp {
    build_test_app_with(|_| {}).await
}

pub async fn build_test_app_with(customize: impl FnOnce(&mut ServerConfig)) -> TestApp {
    let uploads = tempfile::tempdir().expect("tempdir");
    let mut config = test_config(uploads.path());
    customize(&mut config);

    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let work: Arc<dyn WorkQueue> = Arc::new(InProcessQueue::new());
    let state = build_state(config, store, work).await.expect("state");

    TestApp {
        router: build_app_router(state.clone()),
        state,
        shutdown: CancellationToken::new(),
        _uploads: uploads,
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.expect("request")
}

pub async fn get(router: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request");
    send(router, request).await
}

pub async fn post_json(router: &Router, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");
    send(router, request).await
}

pub async fn post_empty(router: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .expect("request");
    send(router, request).await
}

/// Build a `multipart/form-data` body from text fields and one file.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn post_multipart(router: &Router, uri: &str, body: Vec<u8>) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request");
    send(router, request).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}

/// Assert the status and return the JSON body.
pub async fn expect_json(response: Response<Body>, status: StatusCode) -> Value {
    let actual = response.status();
    let json = body_json(response).await;
    assert_eq!(actual, status, "unexpected status, body: {json}");
    json
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Store a blob and its video row directly, bypassing the upload route.
pub async fn seed_video(state: &AppState, bytes: &'static [u8], duration_secs: Option<f64>) -> Video {
    let key = format!("{}.mp4", uuid::Uuid::new_v4());
    let chunks = futures::stream::iter(vec![Ok::<_, std::io::Error>(axum::body::Bytes::from_static(
        bytes,
    ))]);
    state
        .blobs
        .store_stream(&key, chunks, u64::MAX)
        .await
        .expect("store blob");
    state
        .store
        .create_video(&NewVideo {
            filename: "clip.mp4".into(),
            storage_key: key,
            content_type: "video/mp4".into(),
            size_bytes: bytes.len() as i64,
            duration_secs,
        })
        .await
        .expect("create video")
}

/// Poll the store until the job reaches `status`.
pub async fn wait_for_status(state: &AppState, id: DbId, status: JobStatus) -> Job {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let job = state.store.get_job(id).await.unwrap().expect("job exists");
        if job.status == status {
            return job;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {id} stuck in {} waiting for {status}",
            job.status
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
