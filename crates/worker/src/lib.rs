//! Worker processors and the capabilities they run with.
//!
//! A [`WorkerProcessor`] receives a [`JobContext`] holding the job input, a
//! [`ProgressReporter`] and a cancellation token, and returns a
//! [`WorkOutput`] or a [`WorkerError`]. Processors never touch storage;
//! the job queue owns every status write.

pub mod context;
pub mod error;
pub mod processor;
pub mod progress;
pub mod registry;
pub mod simulated;

pub use context::JobContext;
pub use error::WorkerError;
pub use processor::{WorkOutput, WorkerProcessor};
pub use progress::{ProgressReporter, ProgressSink};
pub use registry::ProcessorRegistry;
pub use simulated::SimulatedConfig;

#[cfg(test)]
pub(crate) mod testing;
