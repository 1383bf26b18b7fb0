//! Lookup of processors by job type.

use std::collections::HashMap;
use std::sync::Arc;

use scenecast_db::models::status::JobType;

use crate::processor::WorkerProcessor;
use crate::simulated::{
    PreviewGenerationProcessor, SceneDetectionProcessor, SimulatedConfig,
    ThumbnailExtractionProcessor,
};

/// Maps each [`JobType`] to the processor that runs it.
#[derive(Default, Clone)]
pub struct ProcessorRegistry {
    processors: HashMap<JobType, Arc<dyn WorkerProcessor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the simulated processor for every job type.
    pub fn simulated(config: SimulatedConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SceneDetectionProcessor::new(config.clone())));
        registry.register(Arc::new(PreviewGenerationProcessor::new(config.clone())));
        registry.register(Arc::new(ThumbnailExtractionProcessor::new(config)));
        registry
    }

    /// Register `processor`, replacing any previous one for its job type.
    pub fn register(&mut self, processor: Arc<dyn WorkerProcessor>) -> &mut Self {
        self.processors.insert(processor.job_type(), processor);
        self
    }

    pub fn get(&self, job_type: JobType) -> Option<Arc<dyn WorkerProcessor>> {
        self.processors.get(&job_type).cloned()
    }

    pub fn supports(&self, job_type: JobType) -> bool {
        self.processors.contains_key(&job_type)
    }

    /// Registered job types in declaration order.
    pub fn job_types(&self) -> Vec<JobType> {
        JobType::ALL
            .iter()
            .copied()
            .filter(|t| self.supports(*t))
            .collect()
    }
}
