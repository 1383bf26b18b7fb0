//! Dispatch loop: claims queued jobs and runs them on the worker pool.

use std::sync::Arc;

use scenecast_db::models::job::{Job, JobPatch};
use scenecast_db::models::status::{JobStatus, VideoStatus};
use scenecast_events::LiveEventKind;
use scenecast_worker::{JobContext, ProgressReporter, WorkOutput, WorkerError};
use tokio::sync::OwnedSemaphorePermit;
use tokio_util::sync::CancellationToken;

use crate::error::QueueError;
use crate::orchestrator::{JobQueue, RunningJob};

/// Error recorded when a job is cut short by shutdown.
const SHUTDOWN_ERROR: &str = "Interrupted: the server shut down while the job was processing";

impl JobQueue {
    /// Run until `shutdown` fires.
    pub(crate) async fn run_dispatcher(&self, shutdown: CancellationToken) {
        tracing::info!(
            backend = self.inner.work.name(),
            max_concurrency = self.inner.config.max_concurrency,
            "Job dispatcher started",
        );

        loop {
            // Take a pool slot first so a claimed job never waits for one.
            let permit = match &self.inner.slots {
                Some(slots) => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        permit = slots.clone().acquire_owned() => match permit {
                            Ok(permit) => Some(permit),
                            Err(_) => break,
                        },
                    }
                }
                None => None,
            };

            let job_id = match self.inner.work.next(&shutdown).await {
                Ok(Some(id)) => id,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to fetch next job");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.inner.config.poll_interval) => continue,
                    }
                }
            };

            match self.claim(job_id, &shutdown).await {
                Ok(Some((job, cancel))) => {
                    let queue = self.clone();
                    let shutdown = shutdown.clone();
                    self.inner.tasks.spawn(async move {
                        queue.run_job(job, cancel, shutdown, permit).await;
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(job_id, error = %e, "Failed to claim job");
                }
            }
        }

        tracing::info!("Job dispatcher shutting down");
    }

    /// `queued -> processing`. Returns `None` if another dispatcher won or
    /// the job left `queued` in the meantime.
    async fn claim(
        &self,
        job_id: i64,
        shutdown: &CancellationToken,
    ) -> Result<Option<(Job, CancellationToken)>, QueueError> {
        // The registry lock is held across the claim so a cancel racing it
        // always finds the token.
        let cancel = shutdown.child_token();
        let started_at = chrono::Utc::now();
        let mut running = self.inner.running.write().await;

        let patch = JobPatch {
            status: Some(JobStatus::Processing),
            started_at: Some(Some(started_at)),
            ..Default::default()
        };
        let claimed = self
            .inner
            .store
            .update_job_if(job_id, &[JobStatus::Queued], &patch)
            .await?;

        let Some(job) = claimed else {
            tracing::debug!(job_id, "Job no longer queued, skipped");
            return Ok(None);
        };

        running.insert(
            job.id,
            RunningJob {
                job_type: job.job_type,
                started_at,
                cancel: cancel.clone(),
            },
        );
        drop(running);

        self.mirror_video_status(job.video_id, VideoStatus::Processing)
            .await;
        self.emit(LiveEventKind::JobProgress, &job);
        tracing::info!(job_id = job.id, job_type = %job.job_type, "Job started");

        Ok(Some((job, cancel)))
    }

    async fn run_job(
        &self,
        job: Job,
        cancel: CancellationToken,
        shutdown: CancellationToken,
        permit: Option<OwnedSemaphorePermit>,
    ) {
        let result = self.execute(&job, cancel).await;
        self.finish(&job, result, &shutdown).await;
        drop(permit);
    }

    /// Run the processor under the optional watchdog.
    async fn execute(&self, job: &Job, cancel: CancellationToken) -> Result<WorkOutput, WorkerError> {
        let processor = self
            .inner
            .processors
            .get(job.job_type)
            .ok_or(WorkerError::Unsupported(job.job_type))?;

        let video = self
            .inner
            .store
            .get_video(job.video_id)
            .await
            .map_err(|e| WorkerError::Failed(format!("Failed to load video: {e}")))?
            .ok_or_else(|| WorkerError::InvalidInput(format!("Video {} not found", job.video_id)))?;

        let ctx = JobContext {
            job_id: job.id,
            job_type: job.job_type,
            video,
            payload: job.payload.clone(),
            reporter: ProgressReporter::new(job.id, Arc::new(self.clone())),
            cancel,
        };

        match self.inner.config.job_timeout {
            Some(limit) => match tokio::time::timeout(limit, processor.process(&ctx)).await {
                Ok(result) => result,
                Err(_) => {
                    ctx.cancel.cancel();
                    Err(WorkerError::TimedOut(limit))
                }
            },
            None => processor.process(&ctx).await,
        }
    }

    /// Persist the outcome. The running entry is dropped first so the job
    /// no longer counts as executing here once its status settles.
    async fn finish(
        &self,
        job: &Job,
        result: Result<WorkOutput, WorkerError>,
        shutdown: &CancellationToken,
    ) {
        self.inner.running.write().await.remove(&job.id);

        let outcome = match result {
            Ok(output) => self.complete(job.id, output).await,
            Err(WorkerError::Cancelled) if shutdown.is_cancelled() => {
                self.fail(job.id, SHUTDOWN_ERROR).await
            }
            Err(WorkerError::Cancelled) => {
                tracing::debug!(job_id = job.id, "Worker stopped after cancellation");
                Ok(None)
            }
            Err(e) => self.fail(job.id, &e.to_string()).await,
        };

        if let Err(e) = outcome {
            tracing::error!(job_id = job.id, error = %e, "Failed to record job outcome");
        }
    }
}
