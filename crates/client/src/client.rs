//! The reconnecting live-update client.

use futures::StreamExt;
use scenecast_events::LiveEvent;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::error::ClientError;
use crate::reconnect::{Backoff, ReconnectConfig};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Events buffered for [`LiveClient::next_event`]. Once full, newer events
/// are dropped; [`LiveClient::last_event`] still tracks the latest.
pub const EVENT_BUFFER: usize = 256;

/// Connectivity as seen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Handle to a background task that stays subscribed to the live feed.
///
/// Dropping the handle stops the task.
pub struct LiveClient {
    state: watch::Receiver<ConnectionState>,
    last_event: watch::Receiver<Option<LiveEvent>>,
    events: mpsc::Receiver<LiveEvent>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl LiveClient {
    /// Start connecting to `url` (e.g. `ws://localhost:3000/api/v1/ws`).
    pub fn spawn(url: impl Into<String>, config: ReconnectConfig) -> Result<Self, ClientError> {
        let url = url.into();
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(ClientError::InvalidUrl(url));
        }

        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);
        let (last_tx, last_event) = watch::channel(None);
        let (events_tx, events) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();

        let worker = Worker {
            url,
            config,
            state: state_tx,
            last_event: last_tx,
            events: events_tx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(worker.run());

        Ok(Self {
            state,
            last_event,
            events,
            cancel,
            task: Some(task),
        })
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A receiver that observes every connectivity change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// The most recent event received over any connection.
    pub fn last_event(&self) -> Option<LiveEvent> {
        self.last_event.borrow().clone()
    }

    /// Wait until the client reaches `target`.
    pub async fn wait_for_state(&mut self, target: ConnectionState) {
        let _ = self.state.wait_for(|state| *state == target).await;
    }

    /// Next buffered event in arrival order. `None` once the client is
    /// stopped. At most [`EVENT_BUFFER`] unread events are kept.
    pub async fn next_event(&mut self) -> Option<LiveEvent> {
        self.events.recv().await
    }

    /// Stop reconnecting and close the current connection.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for LiveClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Worker {
    url: String,
    config: ReconnectConfig,
    state: watch::Sender<ConnectionState>,
    last_event: watch::Sender<Option<LiveEvent>>,
    events: mpsc::Sender<LiveEvent>,
    cancel: CancellationToken,
}

impl Worker {
    async fn connect(&self) -> Result<Socket, ClientError> {
        let (socket, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| ClientError::Connection(format!("Failed to connect to {}: {e}", self.url)))?;
        Ok(socket)
    }

    async fn run(self) {
        let mut backoff = Backoff::new(self.config.clone());
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let connected = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = self.connect() => result,
            };

            match connected {
                Ok(socket) => {
                    tracing::info!(url = %self.url, attempt, "Live feed connected");
                    attempt = 0;
                    backoff.reset();
                    self.state.send_replace(ConnectionState::Connected);

                    let outcome = self.read(socket).await;
                    self.state.send_replace(ConnectionState::Disconnected);
                    match outcome {
                        Ok(()) if self.cancel.is_cancelled() => break,
                        Ok(()) => tracing::info!(url = %self.url, "Live feed closed by server"),
                        Err(e) => tracing::warn!(url = %self.url, error = %e, "Live feed dropped"),
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "Live feed connect attempt failed");
                }
            }

            let delay = backoff.next_delay();
            tracing::debug!(delay_ms = delay.as_millis() as u64, "Waiting before reconnect");
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.state.send_replace(ConnectionState::Disconnected);
    }

    /// Read frames until the connection ends or the client is stopped.
    async fn read(&self, mut socket: Socket) -> Result<(), ClientError> {
        loop {
            let frame = tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = socket.close(None).await;
                    return Ok(());
                }
                frame = socket.next() => frame,
            };

            match frame {
                None | Some(Ok(Message::Close(_))) => return Ok(()),
                Some(Ok(Message::Text(text))) => self.deliver(&text),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(ClientError::Protocol(e.to_string())),
            }
        }
    }

    fn deliver(&self, text: &str) {
        match serde_json::from_str::<LiveEvent>(text) {
            Ok(event) => {
                self.last_event.send_replace(Some(event.clone()));
                if let Err(mpsc::error::TrySendError::Full(_)) = self.events.try_send(event) {
                    tracing::debug!("Event buffer full, dropping event");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring unrecognised live frame"),
        }
    }
}
