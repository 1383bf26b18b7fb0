//! Handlers for the `/jobs` resource.
//!
//! Every state change goes through [`JobQueue`](scenecast_queue::JobQueue);
//! the handlers only translate between HTTP and queue calls.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use scenecast_core::error::CoreError;
use scenecast_core::types::DbId;
use scenecast_db::models::job::{JobDetail, JobFilter, SubmitJob};
use scenecast_db::models::video::VideoSummary;
use scenecast_queue::JobUpdate;

use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs
///
/// Submit a new job. Returns the `queued` job; processing happens
/// asynchronously.
pub async fn submit_job(
    State(state): State<AppState>,
    AppJson(input): AppJson<SubmitJob>,
) -> AppResult<impl IntoResponse> {
    let job = state.queue.submit(input).await?;
    Ok(Json(DataResponse { data: job }))
}

// ---------------------------------------------------------------------------
// List / get
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs
///
/// Newest first. Filters: `status`, `type`, `video_id`; paginated with
/// `limit` (default 50, max 100) and `offset`.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(filter): Query<JobFilter>,
) -> AppResult<impl IntoResponse> {
    let jobs = state.store.get_jobs(&filter).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/jobs/{id}
///
/// The job joined with a summary of its video.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = state
        .store
        .get_job(job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))?;
    let video = state
        .store
        .get_video(job.video_id)
        .await?
        .as_ref()
        .map(VideoSummary::from);

    Ok(Json(DataResponse {
        data: JobDetail { job, video },
    }))
}

// ---------------------------------------------------------------------------
// Lifecycle actions
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs/{id}/cancel
///
/// Cancel a `queued` or `processing` job. 404 if the job is unknown or
/// already settled.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = state.queue.cancel(job_id).await?;
    Ok(Json(DataResponse { data: job }))
}

/// POST /api/v1/jobs/{id}/retry
///
/// Re-queue a `failed` job with its progress and timestamps reset.
pub async fn retry_job(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = state.queue.retry(job_id).await?;
    Ok(Json(DataResponse { data: job }))
}

/// POST /api/v1/jobs/{id}/progress
///
/// Worker callback. Applies a progress value or a terminal outcome
/// (`completed` / `failed`) and returns the job as stored afterwards.
pub async fn report_progress(
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    AppJson(update): AppJson<JobUpdate>,
) -> AppResult<impl IntoResponse> {
    let job = state.queue.apply_update(job_id, update).await?;
    Ok(Json(DataResponse { data: job }))
}
