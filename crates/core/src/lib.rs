//! Shared building blocks for the scenecast workspace.
//!
//! Holds the primitive id/timestamp aliases, the domain error type and the
//! small pieces of pure logic (progress clamping, upload validation) that
//! both the orchestrator and the HTTP surface depend on.

pub mod error;
pub mod job_events;
pub mod progress;
pub mod types;
pub mod video_files;
