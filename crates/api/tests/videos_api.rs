//! HTTP tests for uploads, video lookups and range streaming.

mod common;

use assert_matches::assert_matches;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use scenecast_db::models::status::JobStatus;

use common::{
    body_bytes, build_test_app, build_test_app_with, expect_json, get, multipart_body,
    post_multipart, seed_video, send, wait_for_status,
};

const CLIP: &[u8] = b"0123456789abcdefghij";

fn range_request(uri: &str, range: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::RANGE, range)
        .body(Body::empty())
        .unwrap()
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_creates_video_and_scene_detection_job() {
    let app = build_test_app().await;
    let mut events = app.state.event_bus.subscribe();

    let body = multipart_body(&[("duration_secs", "25")], Some(("Holiday.MP4", CLIP)));
    let json = expect_json(
        post_multipart(&app.router, "/api/v1/videos", body).await,
        StatusCode::CREATED,
    )
    .await;

    let video = &json["data"]["video"];
    assert_eq!(video["filename"], "Holiday.MP4");
    assert_eq!(video["content_type"], "video/mp4");
    assert_eq!(video["size_bytes"], CLIP.len());
    assert_eq!(video["duration_secs"], 25.0);
    assert_eq!(video["status"], "queued");
    assert!(video["storage_key"].as_str().unwrap().ends_with(".mp4"));

    let job = &json["data"]["job"];
    assert_eq!(job["job_type"], "scene_detection");
    assert_eq!(job["status"], "queued");
    assert_eq!(job["video_id"], video["id"]);

    let announced = events.recv().await.unwrap();
    assert_eq!(announced.kind.as_str(), "video_uploaded");
    assert_eq!(announced.data["video"]["id"], video["id"]);
}

#[tokio::test]
async fn upload_can_skip_auto_detection() {
    let app = build_test_app().await;

    let body = multipart_body(&[("auto_detect", "false")], Some(("clip.webm", CLIP)));
    let json = expect_json(
        post_multipart(&app.router, "/api/v1/videos", body).await,
        StatusCode::CREATED,
    )
    .await;

    assert!(json["data"]["job"].is_null());
    assert_eq!(json["data"]["video"]["status"], "uploaded");
    assert_eq!(json["data"]["video"]["content_type"], "video/webm");
}

#[tokio::test]
async fn upload_rejects_unsupported_extension() {
    let app = build_test_app().await;

    let body = multipart_body(&[], Some(("notes.txt", CLIP)));
    let json = expect_json(
        post_multipart(&app.router, "/api/v1/videos", body).await,
        StatusCode::BAD_REQUEST,
    )
    .await;

    assert_eq!(json["code"], "VALIDATION_ERROR");
    let videos = app.state.store.list_videos(10, 0).await.unwrap();
    assert!(videos.is_empty());
}

#[tokio::test]
async fn upload_without_file_is_400() {
    let app = build_test_app().await;

    let body = multipart_body(&[("duration_secs", "3")], None);
    let response = post_multipart(&app.router, "/api/v1/videos", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_with_bad_duration_leaves_no_blob() {
    let app = build_test_app().await;

    // The file part arrives before the invalid field.
    let mut body = multipart_body(&[], Some(("clip.mp4", CLIP)));
    let trailer = format!("--{}--\r\n", common::BOUNDARY);
    body.truncate(body.len() - trailer.len());
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"duration_secs\"\r\n\r\n-4\r\n{trailer}",
            b = common::BOUNDARY
        )
        .as_bytes(),
    );

    let response = post_multipart(&app.router, "/api/v1/videos", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut entries = tokio::fs::read_dir(app.state.blobs.root()).await.unwrap();
    assert_matches!(entries.next_entry().await, Ok(None));
}

#[tokio::test]
async fn upload_over_limit_is_413() {
    let app = build_test_app_with(|config| config.max_upload_bytes = 8).await;

    let body = multipart_body(&[], Some(("clip.mp4", CLIP)));
    let json = expect_json(
        post_multipart(&app.router, "/api/v1/videos", body).await,
        StatusCode::PAYLOAD_TOO_LARGE,
    )
    .await;

    assert_eq!(json["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn uploaded_video_is_processed_end_to_end() {
    let app = build_test_app().await;
    app.start_queue().await;

    let body = multipart_body(&[("duration_secs", "12")], Some(("clip.mov", CLIP)));
    let json = expect_json(
        post_multipart(&app.router, "/api/v1/videos", body).await,
        StatusCode::CREATED,
    )
    .await;
    let video_id = json["data"]["video"]["id"].as_i64().unwrap();
    let job_id = json["data"]["job"]["id"].as_i64().unwrap();

    wait_for_status(&app.state, job_id, JobStatus::Completed).await;

    let scenes = expect_json(
        get(&app.router, &format!("/api/v1/videos/{video_id}/scenes")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(scenes["data"].as_array().unwrap().len(), 2);

    let jobs = expect_json(
        get(&app.router, &format!("/api/v1/videos/{video_id}/jobs")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(jobs["data"][0]["id"], job_id);
    assert_eq!(jobs["data"][0]["status"], "completed");
}

#[tokio::test]
async fn absurd_duration_fails_detection_without_scenes() {
    let app = build_test_app().await;
    app.start_queue().await;

    let body = multipart_body(&[("duration_secs", "1e15")], Some(("long.mp4", CLIP)));
    let json = expect_json(
        post_multipart(&app.router, "/api/v1/videos", body).await,
        StatusCode::CREATED,
    )
    .await;
    let video_id = json["data"]["video"]["id"].as_i64().unwrap();
    let job_id = json["data"]["job"]["id"].as_i64().unwrap();

    let job = wait_for_status(&app.state, job_id, JobStatus::Failed).await;
    assert!(job.error.unwrap().contains("scenes"));

    let scenes = expect_json(
        get(&app.router, &format!("/api/v1/videos/{video_id}/scenes")).await,
        StatusCode::OK,
    )
    .await;
    assert!(scenes["data"].as_array().unwrap().is_empty());

    // The orchestrator keeps serving.
    expect_json(get(&app.router, "/health").await, StatusCode::OK).await;
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_videos_is_newest_first() {
    let app = build_test_app().await;
    let older = seed_video(&app.state, CLIP, None).await;
    let newer = seed_video(&app.state, CLIP, None).await;

    let json = expect_json(get(&app.router, "/api/v1/videos").await, StatusCode::OK).await;

    assert_eq!(json["data"][0]["id"], newer.id);
    assert_eq!(json["data"][1]["id"], older.id);
}

#[tokio::test]
async fn unknown_video_routes_are_404() {
    let app = build_test_app().await;

    for uri in [
        "/api/v1/videos/9",
        "/api/v1/videos/9/scenes",
        "/api/v1/videos/9/jobs",
        "/api/v1/videos/9/stream",
    ] {
        let response = get(&app.router, uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stream_without_range_returns_whole_file() {
    let app = build_test_app().await;
    let video = seed_video(&app.state, CLIP, None).await;

    let response = get(&app.router, &format!("/api/v1/videos/{}/stream", video.id)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(body_bytes(response).await, CLIP);
}

#[tokio::test]
async fn stream_with_range_returns_206() {
    let app = build_test_app().await;
    let video = seed_video(&app.state, CLIP, None).await;
    let uri = format!("/api/v1/videos/{}/stream", video.id);

    let response = send(&app.router, range_request(&uri, "bytes=2-5")).await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 2-5/20");
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "4");
    assert_eq!(body_bytes(response).await, b"2345");

    // Open-ended ranges run to the end of a small file.
    let response = send(&app.router, range_request(&uri, "bytes=15-")).await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 15-19/20");
    assert_eq!(body_bytes(response).await, b"fghij");
}

#[tokio::test]
async fn unsatisfiable_range_is_416() {
    let app = build_test_app().await;
    let video = seed_video(&app.state, CLIP, None).await;
    let uri = format!("/api/v1/videos/{}/stream", video.id);

    let response = send(&app.router, range_request(&uri, "bytes=20-30")).await;

    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */20");
}
