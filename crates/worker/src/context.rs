//! Per-run execution context passed to a [`WorkerProcessor`].
//!
//! [`WorkerProcessor`]: crate::WorkerProcessor

use std::time::Duration;

use scenecast_core::types::DbId;
use scenecast_db::models::status::JobType;
use scenecast_db::models::video::Video;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::progress::ProgressReporter;

/// Everything a processor may use while running one job.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job_id: DbId,
    pub job_type: JobType,
    /// Snapshot of the owning video taken at dispatch.
    pub video: Video,
    pub payload: serde_json::Value,
    pub reporter: ProgressReporter,
    pub cancel: CancellationToken,
}

impl JobContext {
    /// Return [`WorkerError::Cancelled`] once the job has been cancelled.
    pub fn checkpoint(&self) -> Result<(), WorkerError> {
        if self.cancel.is_cancelled() {
            return Err(WorkerError::Cancelled);
        }
        Ok(())
    }

    /// Sleep for `duration`, waking early on cancellation.
    pub async fn sleep(&self, duration: Duration) -> Result<(), WorkerError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(WorkerError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// Report progress, checking for cancellation on both sides of the
    /// suspension point.
    pub async fn report(&self, percent: i64) -> Result<(), WorkerError> {
        self.checkpoint()?;
        self.reporter.report(percent).await;
        self.checkpoint()
    }

    /// Read a positive number from the payload, falling back to `default`.
    pub fn payload_f64(&self, key: &str, default: f64) -> Result<f64, WorkerError> {
        match self.payload.get(key) {
            None | Some(serde_json::Value::Null) => Ok(default),
            Some(value) => match value.as_f64() {
                Some(n) if n > 0.0 && n.is_finite() => Ok(n),
                _ => Err(WorkerError::InvalidInput(format!(
                    "'{key}' must be a positive number"
                ))),
            },
        }
    }

    /// Read a positive integer from the payload, falling back to `default`.
    pub fn payload_u32(&self, key: &str, default: u32) -> Result<u32, WorkerError> {
        match self.payload.get(key) {
            None | Some(serde_json::Value::Null) => Ok(default),
            Some(value) => value
                .as_u64()
                .filter(|n| *n > 0)
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| {
                    WorkerError::InvalidInput(format!("'{key}' must be a positive integer"))
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use crate::testing::context_with;

    use super::*;

    #[tokio::test]
    async fn checkpoint_fails_after_cancel() {
        let (ctx, _sink) = context_with(serde_json::json!({}));
        assert!(ctx.checkpoint().is_ok());
        ctx.cancel.cancel();
        assert_matches!(ctx.checkpoint(), Err(WorkerError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_wakes_on_cancel() {
        let (ctx, _sink) = context_with(serde_json::json!({}));
        let token = ctx.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        let result = ctx.sleep(Duration::from_secs(3600)).await;
        assert_matches!(result, Err(WorkerError::Cancelled));
    }

    #[tokio::test]
    async fn report_forwards_to_sink() {
        let (ctx, sink) = context_with(serde_json::json!({}));
        ctx.report(40).await.unwrap();
        ctx.report(70).await.unwrap();
        assert_eq!(sink.reports().await, vec![(ctx.job_id, 40), (ctx.job_id, 70)]);
    }

    #[tokio::test]
    async fn report_after_cancel_is_not_forwarded() {
        let (ctx, sink) = context_with(serde_json::json!({}));
        ctx.cancel.cancel();
        assert_matches!(ctx.report(10).await, Err(WorkerError::Cancelled));
        assert!(sink.reports().await.is_empty());
    }

    #[test]
    fn payload_numbers_are_validated() {
        let (ctx, _sink) = context_with(serde_json::json!({"len": 2.5, "count": 3, "bad": -1}));
        assert_eq!(ctx.payload_f64("len", 10.0).unwrap(), 2.5);
        assert_eq!(ctx.payload_f64("missing", 10.0).unwrap(), 10.0);
        assert_matches!(ctx.payload_f64("bad", 1.0), Err(WorkerError::InvalidInput(_)));
        assert_eq!(ctx.payload_u32("count", 5).unwrap(), 3);
        assert_matches!(ctx.payload_u32("len", 5), Err(WorkerError::InvalidInput(_)));
    }
}
