//! Route definitions for the `/videos` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;

use crate::handlers::videos;
use crate::state::AppState;

/// Headroom above the file size limit for the form's other parts.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Routes mounted at `/videos`.
///
/// ```text
/// GET    /                -> list_videos
/// POST   /                -> upload_video (multipart)
/// GET    /{id}            -> get_video
/// GET    /{id}/scenes     -> list_scenes
/// GET    /{id}/jobs       -> list_video_jobs
/// GET    /{id}/stream     -> stream_video
/// ```
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(videos::list_videos).post(videos::upload_video).layer(
                DefaultBodyLimit::max(max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES)),
            ),
        )
        .route("/{id}", get(videos::get_video))
        .route("/{id}/scenes", get(videos::list_scenes))
        .route("/{id}/jobs", get(videos::list_video_jobs))
        .route("/{id}/stream", get(videos::stream_video))
}
