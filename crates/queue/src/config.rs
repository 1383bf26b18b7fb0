use std::time::Duration;

/// Tuning knobs for the orchestrator.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum jobs executing at once. `0` means unbounded.
    pub max_concurrency: usize,
    /// How often the durable backend re-checks the store for queued jobs.
    pub poll_interval: Duration,
    /// Fail a job that runs longer than this. `None` disables the watchdog.
    pub job_timeout: Option<Duration>,
    /// Mark jobs left `processing` by a previous process as failed on start.
    pub recover_on_start: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            poll_interval: Duration::from_millis(1000),
            job_timeout: None,
            recover_on_start: true,
        }
    }
}
