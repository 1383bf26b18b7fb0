//! Terminal transitions shared by the dispatcher and the external
//! callback path, plus startup recovery.

use scenecast_core::types::DbId;
use scenecast_db::models::job::{Job, JobFilter, JobPatch};
use scenecast_db::models::status::{JobStatus, VideoStatus};
use scenecast_events::LiveEventKind;
use scenecast_worker::WorkOutput;

use crate::error::QueueError;
use crate::orchestrator::JobQueue;

/// Error recorded on jobs found `processing` at startup.
pub(crate) const INTERRUPTED_ERROR: &str = "Interrupted: the server stopped while the job was processing";

/// Recorded when a failure carries no message.
const DEFAULT_FAILURE: &str = "Job failed";

impl JobQueue {
    /// `processing -> completed`, storing `output`.
    ///
    /// The transition and the scene rows are written together, so a job
    /// that settled first (cancelled, failed) never gains scenes. Returns
    /// `None` when the job is no longer processing.
    pub(crate) async fn complete(
        &self,
        id: DbId,
        output: WorkOutput,
    ) -> Result<Option<Job>, QueueError> {
        let store = &self.inner.store;
        let data = (!output.data.is_null()).then_some(output.data);
        let patch = JobPatch {
            status: Some(JobStatus::Completed),
            progress: Some(scenecast_core::progress::PROGRESS_MAX),
            error: Some(None),
            data: Some(data),
            completed_at: Some(Some(chrono::Utc::now())),
            ..Default::default()
        };

        let Some(job) = store.complete_job(id, &patch, &output.scenes).await? else {
            if store.get_job(id).await?.is_none() {
                return Err(QueueError::job_not_found(id));
            }
            tracing::debug!(job_id = id, "Job settled before completion, result discarded");
            return Ok(None);
        };

        self.mirror_video_status(job.video_id, VideoStatus::Completed)
            .await;
        self.emit(LiveEventKind::JobCompleted, &job);
        tracing::info!(
            job_id = id,
            scenes = output.scenes.len(),
            "Job completed",
        );
        Ok(Some(job))
    }

    /// `processing -> failed` with `error`.
    ///
    /// Returns `None` when the job is no longer processing.
    pub(crate) async fn fail(&self, id: DbId, error: &str) -> Result<Option<Job>, QueueError> {
        let message = if error.trim().is_empty() {
            DEFAULT_FAILURE
        } else {
            error
        };
        let patch = JobPatch {
            status: Some(JobStatus::Failed),
            error: Some(Some(message.to_string())),
            completed_at: Some(Some(chrono::Utc::now())),
            ..Default::default()
        };

        let Some(job) = self
            .inner
            .store
            .update_job_if(id, &[JobStatus::Processing], &patch)
            .await?
        else {
            if self.inner.store.get_job(id).await?.is_none() {
                return Err(QueueError::job_not_found(id));
            }
            tracing::debug!(job_id = id, "Job settled before failure, outcome discarded");
            return Ok(None);
        };

        self.mirror_video_status(job.video_id, VideoStatus::Failed)
            .await;
        self.emit(LiveEventKind::JobFailed, &job);
        tracing::warn!(job_id = id, error = message, "Job failed");
        Ok(Some(job))
    }

    /// Fail every job still marked `processing`. Meant to run once before
    /// the dispatcher starts, when no job can legitimately be running.
    pub async fn recover_interrupted(&self) -> Result<u64, QueueError> {
        let filter = JobFilter::with_status(JobStatus::Processing);
        let mut recovered = 0u64;

        loop {
            let batch = self.inner.store.get_jobs(&filter).await?;
            if batch.is_empty() {
                break;
            }

            let mut progressed = false;
            for job in batch {
                if let Some(job) = self.fail(job.id, INTERRUPTED_ERROR).await? {
                    tracing::info!(job_id = job.id, "Recovered interrupted job");
                    recovered += 1;
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }

        Ok(recovered)
    }
}
