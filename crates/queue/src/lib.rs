//! Job orchestration: the single authority over job lifecycle state.
//!
//! [`JobQueue`] accepts submissions, dispatches queued jobs to worker
//! processors through a bounded pool, and applies every status transition
//! as a compare-and-set against the record store. Lifecycle events go out
//! through the injected [`Broadcaster`](scenecast_events::Broadcaster).

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod stats;
pub mod work;

mod dispatcher;
mod lifecycle;

pub use config::QueueConfig;
pub use error::QueueError;
pub use orchestrator::{JobQueue, JobUpdate};
pub use stats::{WorkerSlot, WorkerStats};
pub use work::{InProcessQueue, StorePollingQueue, WorkQueue};
