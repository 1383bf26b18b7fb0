//! Public job lifecycle operations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use scenecast_core::progress::clamp_progress;
use scenecast_core::types::{DbId, Timestamp};
use scenecast_db::models::job::{Job, JobPatch, NewJob, SubmitJob};
use scenecast_db::models::status::{JobStatus, JobType, VideoStatus, CANCELLABLE_STATUSES};
use scenecast_db::RecordStore;
use scenecast_events::{Broadcaster, LiveEvent, LiveEventKind};
use scenecast_worker::{ProcessorRegistry, ProgressSink, WorkOutput};
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::stats::{WorkerSlot, WorkerStats};
use crate::work::WorkQueue;

/// Body of the worker-to-orchestrator callback
/// (`POST /api/v1/jobs/{id}/progress`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobUpdate {
    pub progress: Option<i64>,
    /// Terminal outcome: `completed` or `failed`.
    pub status: Option<JobStatus>,
    pub error: Option<String>,
    pub data: Option<serde_json::Value>,
}

/// Bookkeeping for a job executing in this process.
pub(crate) struct RunningJob {
    pub(crate) job_type: JobType,
    pub(crate) started_at: Timestamp,
    pub(crate) cancel: CancellationToken,
}

pub(crate) struct Inner {
    pub(crate) store: Arc<dyn RecordStore>,
    pub(crate) work: Arc<dyn WorkQueue>,
    pub(crate) events: Arc<dyn Broadcaster>,
    pub(crate) processors: ProcessorRegistry,
    pub(crate) config: QueueConfig,
    /// `None` when concurrency is unbounded.
    pub(crate) slots: Option<Arc<Semaphore>>,
    pub(crate) running: RwLock<HashMap<DbId, RunningJob>>,
    pub(crate) tasks: TaskTracker,
}

/// The job orchestrator. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct JobQueue {
    pub(crate) inner: Arc<Inner>,
}

impl JobQueue {
    pub fn new(
        store: Arc<dyn RecordStore>,
        work: Arc<dyn WorkQueue>,
        events: Arc<dyn Broadcaster>,
        processors: ProcessorRegistry,
        config: QueueConfig,
    ) -> Self {
        let slots = match config.max_concurrency {
            0 => None,
            n => Some(Arc::new(Semaphore::new(n))),
        };
        Self {
            inner: Arc::new(Inner {
                store,
                work,
                events,
                processors,
                config,
                slots,
                running: RwLock::new(HashMap::new()),
                tasks: TaskTracker::new(),
            }),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.inner.store
    }

    pub(crate) fn emit(&self, kind: LiveEventKind, job: &Job) {
        self.inner.events.emit(LiveEvent::job(kind, job));
    }

    /// Mirror a job transition onto its video. Failures are logged only;
    /// the job row remains the source of truth.
    pub(crate) async fn mirror_video_status(&self, video_id: DbId, status: VideoStatus) {
        if let Err(e) = self.inner.store.set_video_status(video_id, status).await {
            tracing::warn!(video_id, %status, error = %e, "Failed to update video status");
        }
    }

    /// Resolve a failed compare-and-set into the right error.
    async fn rejected(&self, id: DbId, action: &'static str) -> QueueError {
        match self.inner.store.get_job(id).await {
            Ok(Some(job)) => QueueError::InvalidTransition {
                id,
                action,
                status: job.status,
            },
            Ok(None) => QueueError::job_not_found(id),
            Err(e) => e.into(),
        }
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Create a `queued` job and schedule it. Never waits for processing.
    pub async fn submit(&self, input: SubmitJob) -> Result<Job, QueueError> {
        let job_type: JobType = input.job_type.parse().map_err(|_| {
            QueueError::Validation(format!("Unknown job type '{}'", input.job_type))
        })?;
        if !self.inner.processors.supports(job_type) {
            return Err(QueueError::Validation(format!(
                "No processor available for job type '{job_type}'"
            )));
        }

        let payload = match input.payload {
            None | Some(serde_json::Value::Null) => serde_json::json!({}),
            Some(value @ serde_json::Value::Object(_)) => value,
            Some(_) => {
                return Err(QueueError::Validation(
                    "payload must be a JSON object".to_string(),
                ))
            }
        };

        if self.inner.store.get_video(input.video_id).await?.is_none() {
            return Err(QueueError::video_not_found(input.video_id));
        }

        let job = self
            .inner
            .store
            .create_job(&NewJob {
                video_id: input.video_id,
                job_type,
                payload,
            })
            .await?;

        self.inner.work.push(job.id).await?;
        self.mirror_video_status(job.video_id, VideoStatus::Queued)
            .await;

        tracing::info!(
            job_id = job.id,
            video_id = job.video_id,
            job_type = %job.job_type,
            "Job submitted",
        );
        Ok(job)
    }

    /// Cancel a `queued` or `processing` job and signal its worker.
    pub async fn cancel(&self, id: DbId) -> Result<Job, QueueError> {
        let patch = JobPatch {
            status: Some(JobStatus::Cancelled),
            completed_at: Some(Some(chrono::Utc::now())),
            ..Default::default()
        };
        let Some(job) = self
            .inner
            .store
            .update_job_if(id, &CANCELLABLE_STATUSES, &patch)
            .await?
        else {
            return Err(self.rejected(id, "cancel").await);
        };

        self.inner.work.remove(id).await?;
        if let Some(running) = self.inner.running.read().await.get(&id) {
            running.cancel.cancel();
        }

        self.mirror_video_status(job.video_id, VideoStatus::Cancelled)
            .await;
        self.emit(LiveEventKind::JobCancelled, &job);

        tracing::info!(job_id = id, "Job cancelled");
        Ok(job)
    }

    /// Put a `failed` job back on the queue as a fresh lifecycle instance.
    pub async fn retry(&self, id: DbId) -> Result<Job, QueueError> {
        let patch = JobPatch {
            status: Some(JobStatus::Queued),
            progress: Some(0),
            error: Some(None),
            data: Some(None),
            queued_at: Some(chrono::Utc::now()),
            started_at: Some(None),
            completed_at: Some(None),
        };
        let Some(job) = self
            .inner
            .store
            .update_job_if(id, &[JobStatus::Failed], &patch)
            .await?
        else {
            return Err(self.rejected(id, "retry").await);
        };

        self.inner.work.push(job.id).await?;
        self.mirror_video_status(job.video_id, VideoStatus::Queued)
            .await;
        self.emit(LiveEventKind::JobRetried, &job);

        tracing::info!(job_id = id, "Job retried");
        Ok(job)
    }

    /// Record progress for a `processing` job.
    ///
    /// Returns the updated job, or `None` when the report was discarded
    /// (job not processing, or value below the stored progress). The
    /// comparison happens inside the store's conditional write, so
    /// concurrent reporters cannot lower the stored value.
    pub async fn report_progress(&self, id: DbId, percent: i64) -> Result<Option<Job>, QueueError> {
        let progress = clamp_progress(percent);

        match self.inner.store.advance_progress(id, progress).await? {
            Some(job) => {
                self.emit(LiveEventKind::JobProgress, &job);
                Ok(Some(job))
            }
            None if self.inner.store.get_job(id).await?.is_none() => {
                Err(QueueError::job_not_found(id))
            }
            None => Ok(None),
        }
    }

    /// Apply an externally reported progress value or terminal outcome.
    ///
    /// Updates for a job that is no longer processing are discarded and
    /// the current row is returned unchanged.
    pub async fn apply_update(&self, id: DbId, update: JobUpdate) -> Result<Job, QueueError> {
        let applied = match update.status {
            None => match update.progress {
                Some(progress) => self.report_progress(id, progress).await?,
                None => None,
            },
            Some(JobStatus::Completed) => {
                let output = WorkOutput::data(update.data.unwrap_or_default());
                let job = self.complete(id, output).await?;
                self.stop_local_worker(id).await;
                job
            }
            Some(JobStatus::Failed) => {
                let error = update.error.unwrap_or_default();
                let job = self.fail(id, &error).await?;
                self.stop_local_worker(id).await;
                job
            }
            Some(other) => {
                return Err(QueueError::Validation(format!(
                    "status must be 'completed' or 'failed', got '{other}'"
                )));
            }
        };

        match applied {
            Some(job) => Ok(job),
            None => self
                .inner
                .store
                .get_job(id)
                .await?
                .ok_or_else(|| QueueError::job_not_found(id)),
        }
    }

    /// Cancel the token of a job executing here, so its own late result is
    /// discarded in favour of an externally reported one.
    async fn stop_local_worker(&self, id: DbId) {
        if let Some(running) = self.inner.running.read().await.get(&id) {
            running.cancel.cancel();
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub async fn worker_stats(&self) -> Result<WorkerStats, QueueError> {
        let counts = self.inner.store.count_jobs().await?;
        let now = chrono::Utc::now();

        let mut workers: Vec<WorkerSlot> = self
            .inner
            .running
            .read()
            .await
            .iter()
            .map(|(job_id, running)| WorkerSlot {
                job_id: *job_id,
                job_type: running.job_type,
                started_at: running.started_at,
                elapsed_ms: (now - running.started_at).num_milliseconds().max(0),
            })
            .collect();
        workers.sort_by_key(|w| w.job_id);

        Ok(WorkerStats {
            waiting: counts.queued,
            active: counts.processing,
            completed: counts.completed,
            failed: counts.failed,
            cancelled: counts.cancelled,
            max_concurrency: self.inner.config.max_concurrency,
            workers,
        })
    }

    /// Number of jobs executing in this process.
    pub async fn running_count(&self) -> usize {
        self.inner.running.read().await.len()
    }

    // -----------------------------------------------------------------------
    // Lifecycle of the orchestrator itself
    // -----------------------------------------------------------------------

    /// Spawn the dispatcher. It stops when `shutdown` fires, and every
    /// in-flight job's cancellation token is a child of `shutdown`.
    pub async fn start(&self, shutdown: CancellationToken) -> Result<JoinHandle<()>, QueueError> {
        if self.inner.config.recover_on_start {
            let recovered = self.recover_interrupted().await?;
            if recovered > 0 {
                tracing::warn!(recovered, "Marked interrupted jobs as failed");
            }
        }

        let queue = self.clone();
        Ok(tokio::spawn(async move { queue.run_dispatcher(shutdown).await }))
    }

    /// Wait for in-flight jobs to settle after shutdown, up to `timeout`.
    /// Returns `false` if some were still running.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.inner.tasks.close();
        let drained = tokio::time::timeout(timeout, self.inner.tasks.wait())
            .await
            .is_ok();
        if !drained {
            tracing::warn!(
                remaining = self.inner.tasks.len(),
                "Jobs still running after drain timeout",
            );
        }
        drained
    }
}

#[async_trait]
impl ProgressSink for JobQueue {
    async fn report(&self, job_id: DbId, percent: i64) {
        if let Err(e) = self.report_progress(job_id, percent).await {
            tracing::warn!(job_id, error = %e, "Failed to record progress");
        }
    }
}
