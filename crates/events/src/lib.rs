//! Live-update events and the in-process fan-out that carries them.
//!
//! The job queue emits [`LiveEvent`]s through the [`Broadcaster`] trait it
//! is constructed with; the API layer subscribes to the [`EventBus`] and
//! forwards every event to connected WebSocket clients.

pub mod bus;
pub mod event;

pub use bus::{Broadcaster, EventBus};
pub use event::{LiveEvent, LiveEventKind};
