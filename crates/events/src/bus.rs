//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`LiveEvent`]s. It is
//! shared via `Arc<EventBus>` and handed to the job queue as an
//! `Arc<dyn Broadcaster>`.

use tokio::sync::broadcast;

use crate::event::LiveEvent;

// ---------------------------------------------------------------------------
// Broadcaster
// ---------------------------------------------------------------------------

/// Fire-and-forget sink for lifecycle events.
///
/// `emit` must never block on subscribers: a slow or missing subscriber
/// cannot hold up the caller.
pub trait Broadcaster: Send + Sync {
    fn emit(&self, event: LiveEvent);
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Every subscriber independently receives every event published after it
/// subscribed, in publish order. There is no replay for late subscribers.
pub struct EventBus {
    sender: broadcast::Sender<LiveEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: LiveEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("Live event dropped, no subscribers");
        }
    }

    /// Subscribe to all events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Broadcaster for EventBus {
    fn emit(&self, event: LiveEvent) {
        self.publish(event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
