//! The narrow persistence interface the orchestrator depends on.

use async_trait::async_trait;
use scenecast_core::types::DbId;

use crate::error::StoreResult;
use crate::models::job::{Job, JobCounts, JobFilter, JobPatch, NewJob};
use crate::models::scene::{NewScene, Scene};
use crate::models::status::{JobStatus, VideoStatus};
use crate::models::video::{NewVideo, Video};

/// CRUD access to job, video and scene rows.
///
/// Implementations hold no business rules. Status transitions are decided
/// by the job queue and expressed through [`update_job_if`], which applies
/// a patch only while the row is still in one of the expected statuses.
///
/// [`update_job_if`]: RecordStore::update_job_if
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Verify the store is reachable.
    async fn health_check(&self) -> StoreResult<()>;

    async fn create_job(&self, input: &NewJob) -> StoreResult<Job>;

    async fn get_job(&self, id: DbId) -> StoreResult<Option<Job>>;

    /// Apply `patch` unconditionally. Returns `None` for an unknown id.
    async fn update_job(&self, id: DbId, patch: &JobPatch) -> StoreResult<Option<Job>>;

    /// Compare-and-set: apply `patch` only if the row's current status is
    /// in `expected`. Returns `None` when the id is unknown or the status
    /// did not match.
    async fn update_job_if(
        &self,
        id: DbId,
        expected: &[JobStatus],
        patch: &JobPatch,
    ) -> StoreResult<Option<Job>>;

    /// Raise `progress` of a `processing` job. Applies only while the
    /// stored progress is at most `progress`, so concurrent reporters can
    /// never lower it. Returns `None` when the guard did not match.
    async fn advance_progress(&self, id: DbId, progress: i16) -> StoreResult<Option<Job>>;

    /// Settle a `processing` job with `patch` and insert its scenes as one
    /// atomic step. Returns `None`, writing nothing, when the job is no
    /// longer processing.
    async fn complete_job(
        &self,
        id: DbId,
        patch: &JobPatch,
        scenes: &[NewScene],
    ) -> StoreResult<Option<Job>>;

    /// List jobs matching `filter`, newest first, paginated.
    async fn get_jobs(&self, filter: &JobFilter) -> StoreResult<Vec<Job>>;

    async fn count_jobs(&self) -> StoreResult<JobCounts>;

    /// Oldest `queued` job by `queued_at`, ties broken by id.
    async fn next_queued_job(&self) -> StoreResult<Option<DbId>>;

    async fn create_video(&self, input: &NewVideo) -> StoreResult<Video>;

    async fn get_video(&self, id: DbId) -> StoreResult<Option<Video>>;

    /// List videos newest first.
    async fn list_videos(&self, limit: i64, offset: i64) -> StoreResult<Vec<Video>>;

    async fn set_video_status(&self, id: DbId, status: VideoStatus) -> StoreResult<Option<Video>>;

    /// Scenes of a video ordered by `scene_index`.
    async fn list_scenes(&self, video_id: DbId) -> StoreResult<Vec<Scene>>;
}
