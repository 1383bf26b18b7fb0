//! Video entity models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use scenecast_core::types::{DbId, Timestamp};

use super::status::VideoStatus;

/// A row from the `videos` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Video {
    pub id: DbId,
    /// Original filename supplied by the uploader.
    pub filename: String,
    /// Opaque key resolving to the blob in upload storage.
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub duration_secs: Option<f64>,
    pub status: VideoStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert DTO. New videos start in `uploaded` status.
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub filename: String,
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub duration_secs: Option<f64>,
}

/// Compact video view embedded in job detail responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub id: DbId,
    pub filename: String,
    pub status: VideoStatus,
}

impl From<&Video> for VideoSummary {
    fn from(video: &Video) -> Self {
        Self {
            id: video.id,
            filename: video.filename.clone(),
            status: video.status,
        }
    }
}
