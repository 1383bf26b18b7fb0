use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/queue/stats
///
/// Queue depth, per-status totals and the jobs executing right now.
pub async fn queue_stats(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let stats = state.queue.worker_stats().await?;
    Ok(Json(DataResponse { data: stats }))
}
