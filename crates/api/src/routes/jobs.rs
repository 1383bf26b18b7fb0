//! `/jobs`: submission and lookup, client-requested transitions, and the
//! callback out-of-process workers use to report back.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs::{
    cancel_job, get_job, list_jobs, report_progress, retry_job, submit_job,
};
use crate::state::AppState;

/// `POST /{id}/cancel` and `POST /{id}/retry`. Both answer 404 when the
/// job is unknown or its status does not allow the transition.
fn transitions() -> Router<AppState> {
    Router::new()
        .route("/{id}/cancel", post(cancel_job))
        .route("/{id}/retry", post(retry_job))
}

/// `POST /{id}/progress` with a progress value or a terminal outcome.
fn worker_callback() -> Router<AppState> {
    Router::new().route("/{id}/progress", post(report_progress))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_job).get(list_jobs))
        .route("/{id}", get(get_job))
        .merge(transitions())
        .merge(worker_callback())
}
