use axum::routing::get;
use axum::Router;

use crate::handlers::queue;
use crate::state::AppState;

/// Routes mounted at `/queue`.
pub fn router() -> Router<AppState> {
    Router::new().route("/stats", get(queue::queue_stats))
}
