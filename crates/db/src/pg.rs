//! PostgreSQL-backed [`RecordStore`].

use async_trait::async_trait;
use scenecast_core::types::DbId;

use crate::error::StoreResult;
use crate::models::job::{Job, JobCounts, JobFilter, JobPatch, NewJob};
use crate::models::scene::{NewScene, Scene};
use crate::models::status::{JobStatus, VideoStatus};
use crate::models::video::{NewVideo, Video};
use crate::repositories::{JobRepo, SceneRepo, VideoRepo};
use crate::store::RecordStore;
use crate::DbPool;

/// Durable record store. Survives process restarts and can be shared by
/// several orchestrator instances.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn health_check(&self) -> StoreResult<()> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }

    async fn create_job(&self, input: &NewJob) -> StoreResult<Job> {
        let job = JobRepo::create(&self.pool, input).await?;
        tracing::debug!(job_id = job.id, job_type = %job.job_type, "Job row inserted");
        Ok(job)
    }

    async fn get_job(&self, id: DbId) -> StoreResult<Option<Job>> {
        Ok(JobRepo::find_by_id(&self.pool, id).await?)
    }

    async fn update_job(&self, id: DbId, patch: &JobPatch) -> StoreResult<Option<Job>> {
        Ok(JobRepo::update(&self.pool, id, patch, None).await?)
    }

    async fn update_job_if(
        &self,
        id: DbId,
        expected: &[JobStatus],
        patch: &JobPatch,
    ) -> StoreResult<Option<Job>> {
        let updated = JobRepo::update(&self.pool, id, patch, Some(expected)).await?;
        if updated.is_none() {
            tracing::debug!(job_id = id, ?expected, "Conditional job update matched no row");
        }
        Ok(updated)
    }

    async fn advance_progress(&self, id: DbId, progress: i16) -> StoreResult<Option<Job>> {
        Ok(JobRepo::advance_progress(&self.pool, id, progress).await?)
    }

    async fn complete_job(
        &self,
        id: DbId,
        patch: &JobPatch,
        scenes: &[NewScene],
    ) -> StoreResult<Option<Job>> {
        let mut tx = self.pool.begin().await?;

        let Some(job) =
            JobRepo::update(&mut *tx, id, patch, Some(&[JobStatus::Processing][..])).await?
        else {
            // Dropping the transaction rolls it back.
            return Ok(None);
        };
        SceneRepo::insert_all(&mut tx, job.video_id, id, scenes).await?;

        tx.commit().await?;
        Ok(Some(job))
    }

    async fn get_jobs(&self, filter: &JobFilter) -> StoreResult<Vec<Job>> {
        Ok(JobRepo::list(&self.pool, filter).await?)
    }

    async fn count_jobs(&self) -> StoreResult<JobCounts> {
        Ok(JobRepo::count_by_status(&self.pool).await?)
    }

    async fn next_queued_job(&self) -> StoreResult<Option<DbId>> {
        Ok(JobRepo::next_queued(&self.pool).await?)
    }

    async fn create_video(&self, input: &NewVideo) -> StoreResult<Video> {
        Ok(VideoRepo::create(&self.pool, input).await?)
    }

    async fn get_video(&self, id: DbId) -> StoreResult<Option<Video>> {
        Ok(VideoRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_videos(&self, limit: i64, offset: i64) -> StoreResult<Vec<Video>> {
        Ok(VideoRepo::list(&self.pool, limit, offset).await?)
    }

    async fn set_video_status(&self, id: DbId, status: VideoStatus) -> StoreResult<Option<Video>> {
        Ok(VideoRepo::set_status(&self.pool, id, status).await?)
    }

    async fn list_scenes(&self, video_id: DbId) -> StoreResult<Vec<Scene>> {
        Ok(SceneRepo::list_by_video(&self.pool, video_id).await?)
    }
}
