use std::time::Duration;

use scenecast_db::models::status::JobType;

/// Outcome of a processor run that did not produce a result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorkerError {
    /// The job's cancellation token fired.
    #[error("Job was cancelled")]
    Cancelled,

    /// The job payload or video metadata cannot be processed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The work itself failed.
    #[error("{0}")]
    Failed(String),

    /// The job ran longer than the configured timeout.
    #[error("Job timed out after {0:?}")]
    TimedOut(Duration),

    #[error("No processor registered for job type '{0}'")]
    Unsupported(JobType),
}
