//! In-process [`RecordStore`] for single-node and test deployments.
//!
//! Rows live in ordered maps behind a single `RwLock`, so each trait call
//! is atomic with respect to every other call.

use std::collections::BTreeMap;

use async_trait::async_trait;
use scenecast_core::types::DbId;
use tokio::sync::RwLock;

use crate::error::StoreResult;
use crate::models::job::{Job, JobCounts, JobFilter, JobPatch, NewJob};
use crate::models::scene::{NewScene, Scene};
use crate::models::status::{JobStatus, VideoStatus};
use crate::models::video::{NewVideo, Video};
use crate::store::RecordStore;

#[derive(Default)]
struct Tables {
    last_job_id: DbId,
    jobs: BTreeMap<DbId, Job>,
    last_video_id: DbId,
    videos: BTreeMap<DbId, Video>,
    last_scene_id: DbId,
    scenes: BTreeMap<DbId, Scene>,
}

/// Record store backed by process memory. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl Tables {
    fn insert_scenes(&mut self, video_id: DbId, job_id: DbId, scenes: &[NewScene]) {
        let now = chrono::Utc::now();
        for scene in scenes {
            self.last_scene_id += 1;
            let row = Scene {
                id: self.last_scene_id,
                video_id,
                job_id,
                scene_index: scene.scene_index,
                start_secs: scene.start_secs,
                end_secs: scene.end_secs,
                confidence: scene.confidence,
                created_at: now,
            };
            self.scenes.insert(row.id, row);
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_job(&self, input: &NewJob) -> StoreResult<Job> {
        let now = chrono::Utc::now();
        let mut tables = self.tables.write().await;
        tables.last_job_id += 1;
        let job = Job {
            id: tables.last_job_id,
            video_id: input.video_id,
            job_type: input.job_type,
            status: JobStatus::Queued,
            progress: 0,
            error: None,
            payload: input.payload.clone(),
            data: None,
            queued_at: now,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get_job(&self, id: DbId) -> StoreResult<Option<Job>> {
        Ok(self.tables.read().await.jobs.get(&id).cloned())
    }

    async fn update_job(&self, id: DbId, patch: &JobPatch) -> StoreResult<Option<Job>> {
        let mut tables = self.tables.write().await;
        Ok(tables.jobs.get_mut(&id).map(|job| {
            patch.apply_to(job, chrono::Utc::now());
            job.clone()
        }))
    }

    async fn update_job_if(
        &self,
        id: DbId,
        expected: &[JobStatus],
        patch: &JobPatch,
    ) -> StoreResult<Option<Job>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .jobs
            .get_mut(&id)
            .filter(|job| expected.contains(&job.status))
            .map(|job| {
                patch.apply_to(job, chrono::Utc::now());
                job.clone()
            }))
    }

    async fn advance_progress(&self, id: DbId, progress: i16) -> StoreResult<Option<Job>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .jobs
            .get_mut(&id)
            .filter(|job| job.status == JobStatus::Processing && job.progress <= progress)
            .map(|job| {
                job.progress = progress;
                job.updated_at = chrono::Utc::now();
                job.clone()
            }))
    }

    async fn complete_job(
        &self,
        id: DbId,
        patch: &JobPatch,
        scenes: &[NewScene],
    ) -> StoreResult<Option<Job>> {
        let mut tables = self.tables.write().await;
        let Some(job) = tables
            .jobs
            .get_mut(&id)
            .filter(|job| job.status == JobStatus::Processing)
        else {
            return Ok(None);
        };
        patch.apply_to(job, chrono::Utc::now());
        let job = job.clone();
        tables.insert_scenes(job.video_id, id, scenes);
        Ok(Some(job))
    }

    async fn get_jobs(&self, filter: &JobFilter) -> StoreResult<Vec<Job>> {
        let tables = self.tables.read().await;
        Ok(tables
            .jobs
            .values()
            .rev()
            .filter(|job| filter.matches(job))
            .skip(filter.effective_offset() as usize)
            .take(filter.effective_limit() as usize)
            .cloned()
            .collect())
    }

    async fn count_jobs(&self) -> StoreResult<JobCounts> {
        let tables = self.tables.read().await;
        let mut counts = JobCounts::default();
        for job in tables.jobs.values() {
            counts.add(job.status, 1);
        }
        Ok(counts)
    }

    async fn next_queued_job(&self) -> StoreResult<Option<DbId>> {
        let tables = self.tables.read().await;
        Ok(tables
            .jobs
            .values()
            .filter(|job| job.status == JobStatus::Queued)
            .min_by_key(|job| (job.queued_at, job.id))
            .map(|job| job.id))
    }

    async fn create_video(&self, input: &NewVideo) -> StoreResult<Video> {
        let now = chrono::Utc::now();
        let mut tables = self.tables.write().await;
        tables.last_video_id += 1;
        let video = Video {
            id: tables.last_video_id,
            filename: input.filename.clone(),
            storage_key: input.storage_key.clone(),
            content_type: input.content_type.clone(),
            size_bytes: input.size_bytes,
            duration_secs: input.duration_secs,
            status: VideoStatus::Uploaded,
            created_at: now,
            updated_at: now,
        };
        tables.videos.insert(video.id, video.clone());
        Ok(video)
    }

    async fn get_video(&self, id: DbId) -> StoreResult<Option<Video>> {
        Ok(self.tables.read().await.videos.get(&id).cloned())
    }

    async fn list_videos(&self, limit: i64, offset: i64) -> StoreResult<Vec<Video>> {
        let tables = self.tables.read().await;
        Ok(tables
            .videos
            .values()
            .rev()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn set_video_status(&self, id: DbId, status: VideoStatus) -> StoreResult<Option<Video>> {
        let mut tables = self.tables.write().await;
        Ok(tables.videos.get_mut(&id).map(|video| {
            video.status = status;
            video.updated_at = chrono::Utc::now();
            video.clone()
        }))
    }

    async fn list_scenes(&self, video_id: DbId) -> StoreResult<Vec<Scene>> {
        let tables = self.tables.read().await;
        let mut scenes: Vec<Scene> = tables
            .scenes
            .values()
            .filter(|scene| scene.video_id == video_id)
            .cloned()
            .collect();
        scenes.sort_by_key(|scene| (scene.scene_index, scene.id));
        Ok(scenes)
    }
}
