use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::Message;
use scenecast_core::types::Timestamp;
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// Registry of live-update subscribers.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application. Each connection drains its own channel,
/// so a slow client never blocks a broadcast.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(&self, conn_id: String) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    /// Register a subscriber under a fresh id. The entry lives exactly as
    /// long as the returned [`Subscription`].
    pub async fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = uuid::Uuid::new_v4().to_string();
        let receiver = self.add(id.clone()).await;
        Subscription {
            id,
            receiver,
            manager: Arc::clone(self),
        }
    }

    /// Remove a connection by its ID.
    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    /// Broadcast a message to all connected clients.
    ///
    /// Connections whose channel is closed are dropped from the registry.
    /// Returns the number of connections the message was delivered to.
    pub async fn broadcast(&self, message: Message) -> usize {
        let mut dead = Vec::new();
        let delivered = {
            let conns = self.connections.read().await;
            let mut delivered = 0;
            for (id, conn) in conns.iter() {
                if conn.sender.send(message.clone()).is_ok() {
                    delivered += 1;
                } else {
                    dead.push(id.clone());
                }
            }
            delivered
        };

        if !dead.is_empty() {
            let mut conns = self.connections.write().await;
            for id in &dead {
                conns.remove(id);
            }
            tracing::debug!(removed = dead.len(), "Pruned closed WebSocket connections");
        }
        delivered
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

/// A registered subscriber's outbound queue.
///
/// Dropping it unregisters the connection, whichever way the session
/// ended.
pub struct Subscription {
    id: String,
    receiver: mpsc::UnboundedReceiver<Message>,
    manager: Arc<WsManager>,
}

impl Subscription {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Next frame queued for this subscriber. `None` once the manager has
    /// dropped the entry (pruned or shut down).
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let id = std::mem::take(&mut self.id);
        if let Ok(mut conns) = self.manager.connections.try_write() {
            conns.remove(&id);
            return;
        }
        // A broadcast holds the lock; finish the removal asynchronously.
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let manager = Arc::clone(&self.manager);
            runtime.spawn(async move { manager.remove(&id).await });
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
