use scenecast_core::types::DbId;
use scenecast_db::models::status::JobStatus;
use scenecast_db::StoreError;

/// Errors returned by [`JobQueue`](crate::JobQueue) operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// The job exists but its status does not permit the operation.
    #[error("Cannot {action} job {id} while it is {status}")]
    InvalidTransition {
        id: DbId,
        action: &'static str,
        status: JobStatus,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueueError {
    pub(crate) fn job_not_found(id: DbId) -> Self {
        Self::NotFound { entity: "Job", id }
    }

    pub(crate) fn video_not_found(id: DbId) -> Self {
        Self::NotFound { entity: "Video", id }
    }
}
