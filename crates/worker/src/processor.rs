use async_trait::async_trait;
use scenecast_db::models::scene::NewScene;
use scenecast_db::models::status::JobType;

use crate::context::JobContext;
use crate::error::WorkerError;

/// Result of a successful processor run.
///
/// `data` becomes the job's result blob; `scenes` are stored against the
/// job's video only if the job still completes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkOutput {
    pub data: serde_json::Value,
    pub scenes: Vec<NewScene>,
}

impl WorkOutput {
    pub fn data(data: serde_json::Value) -> Self {
        Self {
            data,
            scenes: Vec::new(),
        }
    }

    pub fn with_scenes(mut self, scenes: Vec<NewScene>) -> Self {
        self.scenes = scenes;
        self
    }
}

/// Executes one kind of job.
///
/// Implementations must check `ctx.cancel` at every suspension point and
/// return [`WorkerError::Cancelled`] promptly once it fires.
#[async_trait]
pub trait WorkerProcessor: Send + Sync {
    fn job_type(&self) -> JobType;

    async fn process(&self, ctx: &JobContext) -> Result<WorkOutput, WorkerError>;
}
