//! Job entity models and DTOs for the background processing queue.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use scenecast_core::types::{DbId, Timestamp};

use super::status::{JobStatus, JobType};
use super::video::VideoSummary;

/// Maximum page size for job listing.
pub const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
pub const DEFAULT_LIMIT: i64 = 50;

/// A row from the `jobs` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Job {
    pub id: DbId,
    pub video_id: DbId,
    pub job_type: JobType,
    pub status: JobStatus,
    pub progress: i16,
    pub error: Option<String>,
    pub payload: serde_json::Value,
    pub data: Option<serde_json::Value>,
    pub queued_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert DTO. New jobs always start `queued` with zero progress.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub video_id: DbId,
    pub job_type: JobType,
    pub payload: serde_json::Value,
}

/// Request body for `POST /api/v1/jobs`.
///
/// `job_type` stays a string so an unknown kind is reported as a
/// validation error rather than a generic deserialization failure.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitJob {
    pub video_id: DbId,
    pub job_type: String,
    pub payload: Option<serde_json::Value>,
}

/// Partial update applied to a job row.
///
/// `None` leaves a column untouched. For nullable columns the inner
/// `Option` is the new value, so `Some(None)` clears the column.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub progress: Option<i16>,
    pub error: Option<Option<String>>,
    pub data: Option<Option<serde_json::Value>>,
    pub queued_at: Option<Timestamp>,
    pub started_at: Option<Option<Timestamp>>,
    pub completed_at: Option<Option<Timestamp>>,
}

impl JobPatch {
    /// Apply the patch to an in-memory row, bumping `updated_at`.
    pub fn apply_to(&self, job: &mut Job, now: Timestamp) {
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(progress) = self.progress {
            job.progress = progress;
        }
        if let Some(error) = &self.error {
            job.error = error.clone();
        }
        if let Some(data) = &self.data {
            job.data = data.clone();
        }
        if let Some(queued_at) = self.queued_at {
            job.queued_at = queued_at;
        }
        if let Some(started_at) = self.started_at {
            job.started_at = started_at;
        }
        if let Some(completed_at) = self.completed_at {
            job.completed_at = completed_at;
        }
        job.updated_at = now;
    }

    /// True when no column would change.
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.progress.is_none()
            && self.error.is_none()
            && self.data.is_none()
            && self.queued_at.is_none()
            && self.started_at.is_none()
            && self.completed_at.is_none()
    }
}

/// Query parameters for `GET /api/v1/jobs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    #[serde(rename = "type")]
    pub job_type: Option<JobType>,
    pub video_id: Option<DbId>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

impl JobFilter {
    pub fn with_status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn for_video(video_id: DbId) -> Self {
        Self {
            video_id: Some(video_id),
            ..Default::default()
        }
    }

    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// Whether `job` satisfies every filter field (pagination excluded).
    pub fn matches(&self, job: &Job) -> bool {
        self.status.map_or(true, |s| job.status == s)
            && self.job_type.map_or(true, |t| job.job_type == t)
            && self.video_id.map_or(true, |v| job.video_id == v)
    }
}

/// Per-status job totals used by the worker stats snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub queued: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
    pub cancelled: i64,
}

impl JobCounts {
    pub fn add(&mut self, status: JobStatus, count: i64) {
        match status {
            JobStatus::Queued => self.queued += count,
            JobStatus::Processing => self.processing += count,
            JobStatus::Completed => self.completed += count,
            JobStatus::Failed => self.failed += count,
            JobStatus::Cancelled => self.cancelled += count,
        }
    }
}

/// Response body for `GET /api/v1/jobs/{id}`: the job plus its video.
#[derive(Debug, Clone, Serialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: Job,
    pub video: Option<VideoSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> Job {
        let now = chrono::Utc::now();
        Job {
            id: 1,
            video_id: 7,
            job_type: JobType::SceneDetection,
            status: JobStatus::Failed,
            progress: 40,
            error: Some("boom".into()),
            payload: serde_json::json!({}),
            data: Some(serde_json::json!({"partial": true})),
            queued_at: now,
            started_at: Some(now),
            completed_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn patch_clears_nullable_columns() {
        let mut job = sample_job();
        let patch = JobPatch {
            status: Some(JobStatus::Queued),
            progress: Some(0),
            error: Some(None),
            data: Some(None),
            started_at: Some(None),
            completed_at: Some(None),
            ..Default::default()
        };

        patch.apply_to(&mut job, chrono::Utc::now());

        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert!(job.error.is_none());
        assert!(job.data.is_none());
        assert!(job.started_at.is_none());
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn empty_patch_leaves_columns_untouched() {
        let mut job = sample_job();
        let before = job.clone();
        let patch = JobPatch::default();
        assert!(patch.is_empty());

        patch.apply_to(&mut job, before.updated_at);
        assert_eq!(job, before);
    }

    #[test]
    fn filter_limit_is_clamped() {
        let filter = JobFilter {
            limit: Some(1_000),
            offset: Some(-3),
            ..Default::default()
        };
        assert_eq!(filter.effective_limit(), MAX_LIMIT);
        assert_eq!(filter.effective_offset(), 0);
        assert_eq!(JobFilter::default().effective_limit(), DEFAULT_LIMIT);
    }

    #[test]
    fn filter_matches_on_all_fields() {
        let job = sample_job();
        assert!(JobFilter::default().matches(&job));
        assert!(JobFilter::with_status(JobStatus::Failed).matches(&job));
        assert!(!JobFilter::with_status(JobStatus::Queued).matches(&job));
        assert!(JobFilter::for_video(7).matches(&job));
        assert!(!JobFilter::for_video(8).matches(&job));
    }

    #[test]
    fn filter_deserializes_type_alias() {
        let filter: JobFilter =
            serde_json::from_str(r#"{"status":"queued","type":"preview_generation"}"#).unwrap();
        assert_eq!(filter.status, Some(JobStatus::Queued));
        assert_eq!(filter.job_type, Some(JobType::PreviewGeneration));
    }
}
