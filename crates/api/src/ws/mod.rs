//! WebSocket infrastructure for live job updates.
//!
//! Provides the subscriber registry, the HTTP upgrade handler, the
//! heartbeat task and the forwarder that relays event bus traffic to
//! every connected client.

mod forwarder;
mod handler;
mod heartbeat;
pub mod manager;

pub use forwarder::forward_events;
pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::{Subscription, WsManager};
