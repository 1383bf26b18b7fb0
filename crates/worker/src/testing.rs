//! Fixtures shared by this crate's unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use scenecast_core::types::DbId;
use scenecast_db::models::status::{JobType, VideoStatus};
use scenecast_db::models::video::Video;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::context::JobContext;
use crate::progress::{ProgressReporter, ProgressSink};

/// Sink that records every report it receives.
#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<(DbId, i64)>>,
}

impl RecordingSink {
    pub async fn reports(&self) -> Vec<(DbId, i64)> {
        self.reports.lock().await.clone()
    }
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn report(&self, job_id: DbId, percent: i64) {
        self.reports.lock().await.push((job_id, percent));
    }
}

pub fn sample_video(duration_secs: Option<f64>) -> Video {
    let now = chrono::Utc::now();
    Video {
        id: 1,
        filename: "clip.mp4".into(),
        storage_key: "clip-key.mp4".into(),
        content_type: "video/mp4".into(),
        size_bytes: 1024,
        duration_secs,
        status: VideoStatus::Processing,
        created_at: now,
        updated_at: now,
    }
}

pub fn context_for(
    job_type: JobType,
    video: Video,
    payload: serde_json::Value,
) -> (JobContext, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let ctx = JobContext {
        job_id: 9,
        job_type,
        video,
        payload,
        reporter: ProgressReporter::new(9, sink.clone()),
        cancel: CancellationToken::new(),
    };
    (ctx, sink)
}

pub fn context_with(payload: serde_json::Value) -> (JobContext, Arc<RecordingSink>) {
    context_for(JobType::SceneDetection, sample_video(Some(30.0)), payload)
}
