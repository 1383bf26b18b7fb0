//! Live-update client for the scenecast WebSocket feed.
//!
//! [`LiveClient`] keeps a connection to `/api/v1/ws` open, reconnecting
//! with exponential backoff whenever it drops, and exposes the current
//! [`ConnectionState`] and the most recent [`LiveEvent`] through watch
//! channels.
//!
//! [`LiveEvent`]: scenecast_events::LiveEvent

pub mod client;
pub mod error;
pub mod reconnect;

pub use client::{ConnectionState, LiveClient};
pub use error::ClientError;
pub use reconnect::{Backoff, ReconnectConfig};
