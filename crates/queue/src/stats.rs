//! Worker pool snapshot returned by `GET /api/v1/queue/stats`.

use serde::Serialize;
use scenecast_core::types::{DbId, Timestamp};
use scenecast_db::models::status::JobType;

/// One job currently executing in this process.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerSlot {
    pub job_id: DbId,
    pub job_type: JobType,
    pub started_at: Timestamp,
    pub elapsed_ms: i64,
}

/// Point-in-time view of the queue. Building it has no side effects.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStats {
    pub waiting: i64,
    pub active: i64,
    pub completed: i64,
    pub failed: i64,
    pub cancelled: i64,
    /// Configured pool size; `0` means unbounded.
    pub max_concurrency: usize,
    pub workers: Vec<WorkerSlot>,
}
