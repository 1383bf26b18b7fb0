pub mod health;
pub mod jobs;
pub mod queue;
pub mod videos;

use axum::routing::get;
use axum::Router;

use crate::config::ServerConfig;
use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                          WebSocket (live job updates)
///
/// /jobs                        list, submit
/// /jobs/{id}                   get
/// /jobs/{id}/cancel            cancel (POST)
/// /jobs/{id}/retry             retry (POST)
/// /jobs/{id}/progress          worker callback (POST)
///
/// /videos                      list, upload (multipart)
/// /videos/{id}                 get
/// /videos/{id}/scenes          detected scenes
/// /videos/{id}/jobs            jobs for the video
/// /videos/{id}/stream          byte-range streaming
///
/// /queue/stats                 worker pool snapshot
/// ```
pub fn api_routes(config: &ServerConfig) -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/jobs", jobs::router())
        .nest("/videos", videos::router(config.max_upload_bytes))
        .nest("/queue", queue::router())
}
