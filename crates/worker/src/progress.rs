//! Progress reporting capability handed to each running job.

use std::sync::Arc;

use async_trait::async_trait;
use scenecast_core::types::DbId;

/// Receiver of raw progress reports. Implemented by the job queue.
///
/// Implementations clamp, persist and broadcast; they silently ignore
/// reports for jobs that are no longer processing.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, job_id: DbId, percent: i64);
}

/// Progress handle bound to one job.
///
/// The only channel through which a processor communicates partial
/// completion. Safe to call zero or many times.
#[derive(Clone)]
pub struct ProgressReporter {
    job_id: DbId,
    sink: Arc<dyn ProgressSink>,
}

impl ProgressReporter {
    pub fn new(job_id: DbId, sink: Arc<dyn ProgressSink>) -> Self {
        Self { job_id, sink }
    }

    pub fn job_id(&self) -> DbId {
        self.job_id
    }

    /// Report `percent` complete. Out-of-range values are clamped downstream.
    pub async fn report(&self, percent: i64) {
        self.sink.report(self.job_id, percent).await;
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("job_id", &self.job_id)
            .finish_non_exhaustive()
    }
}
