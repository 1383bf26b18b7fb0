//! Stand-in processors with fixed-step simulated progress.
//!
//! Each one advances through `steps` equal increments, sleeping
//! `step_delay` between reports, then returns a deterministic result
//! derived from the video metadata and job payload. A real analyzer plugs
//! in behind the same [`WorkerProcessor`] contract.

use std::time::Duration;

use async_trait::async_trait;
use scenecast_core::progress::step_percent;
use scenecast_db::models::scene::NewScene;
use scenecast_db::models::status::JobType;

use crate::context::JobContext;
use crate::error::WorkerError;
use crate::processor::{WorkOutput, WorkerProcessor};

/// Assumed length of a video whose duration is unknown.
const DEFAULT_DURATION_SECS: f64 = 60.0;

/// Default scene length when the payload does not set `scene_length_secs`.
const DEFAULT_SCENE_LENGTH_SECS: f64 = 10.0;

/// Default number of thumbnails when the payload does not set `count`.
const DEFAULT_THUMBNAIL_COUNT: u32 = 5;

/// Upper bound on requested thumbnails.
const MAX_THUMBNAIL_COUNT: u32 = 100;

/// Upper bound on scenes produced by one detection run.
pub const MAX_SCENE_COUNT: u32 = 10_000;

/// Pacing of the simulated work.
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    pub steps: u32,
    pub step_delay: Duration,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            steps: 10,
            step_delay: Duration::from_millis(500),
        }
    }
}

/// Walk through every step, reporting after each one.
async fn run_steps(ctx: &JobContext, config: &SimulatedConfig) -> Result<(), WorkerError> {
    for step in 1..=config.steps {
        ctx.sleep(config.step_delay).await?;
        ctx.report(i64::from(step_percent(step, config.steps))).await?;
    }
    ctx.checkpoint()
}

/// Honour `{"fail": "<message>"}` in a payload so failure paths can be
/// exercised end to end.
fn requested_failure(ctx: &JobContext) -> Result<(), WorkerError> {
    match ctx.payload.get("fail") {
        Some(serde_json::Value::String(message)) => Err(WorkerError::Failed(message.clone())),
        Some(serde_json::Value::Bool(true)) => {
            Err(WorkerError::Failed("Simulated failure".to_string()))
        }
        _ => Ok(()),
    }
}

fn video_duration(ctx: &JobContext) -> f64 {
    ctx.video
        .duration_secs
        .filter(|d| *d > 0.0 && d.is_finite())
        .unwrap_or(DEFAULT_DURATION_SECS)
}

// ---------------------------------------------------------------------------
// Scene detection
// ---------------------------------------------------------------------------

/// Splits the video into fixed-length scenes.
pub struct SceneDetectionProcessor {
    config: SimulatedConfig,
}

impl SceneDetectionProcessor {
    pub fn new(config: SimulatedConfig) -> Self {
        Self { config }
    }
}

/// Cut `duration` into consecutive scenes of `scene_length`; the final
/// scene ends exactly at `duration`.
///
/// Fails without allocating when the split would exceed
/// [`MAX_SCENE_COUNT`] scenes.
pub fn split_scenes(duration: f64, scene_length: f64) -> Result<Vec<NewScene>, WorkerError> {
    let count = (duration / scene_length).ceil().max(1.0);
    if count.is_nan() || count > f64::from(MAX_SCENE_COUNT) {
        return Err(WorkerError::InvalidInput(format!(
            "a {duration}s video split every {scene_length}s exceeds {MAX_SCENE_COUNT} scenes"
        )));
    }

    let scenes = (0..count as i32)
        .map(|index| {
            let start = f64::from(index) * scene_length;
            let end = (start + scene_length).min(duration);
            NewScene {
                scene_index: index,
                start_secs: start,
                end_secs: end,
                confidence: 0.8 + 0.02 * f64::from(index % 10),
            }
        })
        .collect();
    Ok(scenes)
}

#[async_trait]
impl WorkerProcessor for SceneDetectionProcessor {
    fn job_type(&self) -> JobType {
        JobType::SceneDetection
    }

    async fn process(&self, ctx: &JobContext) -> Result<WorkOutput, WorkerError> {
        let scene_length = ctx.payload_f64("scene_length_secs", DEFAULT_SCENE_LENGTH_SECS)?;
        let duration = video_duration(ctx);
        let scenes = split_scenes(duration, scene_length)?;

        tracing::debug!(job_id = ctx.job_id, duration, scene_length, "Detecting scenes");
        run_steps(ctx, &self.config).await?;
        requested_failure(ctx)?;

        let data = serde_json::json!({
            "scene_count": scenes.len(),
            "duration_secs": duration,
            "scene_length_secs": scene_length,
        });
        Ok(WorkOutput::data(data).with_scenes(scenes))
    }
}

// ---------------------------------------------------------------------------
// Preview generation
// ---------------------------------------------------------------------------

/// Produces a reference to a (simulated) low-resolution preview.
pub struct PreviewGenerationProcessor {
    config: SimulatedConfig,
}

impl PreviewGenerationProcessor {
    pub fn new(config: SimulatedConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl WorkerProcessor for PreviewGenerationProcessor {
    fn job_type(&self) -> JobType {
        JobType::PreviewGeneration
    }

    async fn process(&self, ctx: &JobContext) -> Result<WorkOutput, WorkerError> {
        let height = ctx.payload_u32("height", 360)?;

        run_steps(ctx, &self.config).await?;
        requested_failure(ctx)?;

        Ok(WorkOutput::data(serde_json::json!({
            "preview_key": format!("previews/{}_{height}p.mp4", ctx.video.id),
            "height": height,
            "duration_secs": video_duration(ctx),
        })))
    }
}

// ---------------------------------------------------------------------------
// Thumbnail extraction
// ---------------------------------------------------------------------------

/// Picks evenly spaced thumbnail timestamps.
pub struct ThumbnailExtractionProcessor {
    config: SimulatedConfig,
}

impl ThumbnailExtractionProcessor {
    pub fn new(config: SimulatedConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl WorkerProcessor for ThumbnailExtractionProcessor {
    fn job_type(&self) -> JobType {
        JobType::ThumbnailExtraction
    }

    async fn process(&self, ctx: &JobContext) -> Result<WorkOutput, WorkerError> {
        let count = ctx.payload_u32("count", DEFAULT_THUMBNAIL_COUNT)?;
        if count > MAX_THUMBNAIL_COUNT {
            return Err(WorkerError::InvalidInput(format!(
                "'count' must be at most {MAX_THUMBNAIL_COUNT}"
            )));
        }

        run_steps(ctx, &self.config).await?;
        requested_failure(ctx)?;

        let duration = video_duration(ctx);
        let interval = duration / f64::from(count + 1);
        let thumbnails: Vec<serde_json::Value> = (1..=count)
            .map(|i| {
                serde_json::json!({
                    "key": format!("thumbnails/{}_{i}.jpg", ctx.video.id),
                    "at_secs": interval * f64::from(i),
                })
            })
            .collect();

        Ok(WorkOutput::data(serde_json::json!({ "thumbnails": thumbnails })))
    }
}
