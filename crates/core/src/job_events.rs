//! WebSocket message type constants for live-update events.
//!
//! These are the only `type` values the server ever pushes over `/ws`.

/// A video finished uploading and was registered.
pub const MSG_TYPE_VIDEO_UPLOADED: &str = "video_uploaded";

/// Progress update during job execution (also sent when a job is picked up).
pub const MSG_TYPE_JOB_PROGRESS: &str = "job_progress";

/// Job completed successfully.
pub const MSG_TYPE_JOB_COMPLETED: &str = "job_completed";

/// Job failed with an error.
pub const MSG_TYPE_JOB_FAILED: &str = "job_failed";

/// Job was cancelled by a user.
pub const MSG_TYPE_JOB_CANCELLED: &str = "job_cancelled";

/// A failed job was put back on the queue.
pub const MSG_TYPE_JOB_RETRIED: &str = "job_retried";

/// Every message type the live channel can carry.
pub const ALL_MSG_TYPES: [&str; 6] = [
    MSG_TYPE_VIDEO_UPLOADED,
    MSG_TYPE_JOB_PROGRESS,
    MSG_TYPE_JOB_COMPLETED,
    MSG_TYPE_JOB_FAILED,
    MSG_TYPE_JOB_CANCELLED,
    MSG_TYPE_JOB_RETRIED,
];
