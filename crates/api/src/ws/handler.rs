use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;

use crate::state::AppState;
use crate::ws::manager::Subscription;

/// Why a subscriber session ended.
#[derive(Debug)]
enum SessionEnd {
    /// The client sent Close or hung up.
    ClientClosed,
    /// The server queued a Close frame (shutdown).
    ServerClosed,
    /// The registry dropped this subscriber.
    Unregistered,
    Transport(axum::Error),
}

/// `GET /api/v1/ws`: upgrade and stream live events to the client.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let manager = state.ws_manager;
    ws.on_upgrade(move |socket| async move {
        let subscription = manager.subscribe().await;
        run_session(socket, subscription).await;
    })
}

/// Pump queued frames out and watch the inbound side for Close, on one
/// task. Clients have nothing to say to us, so inbound data frames are
/// dropped. The subscription is released on every exit path.
async fn run_session(mut socket: WebSocket, mut subscription: Subscription) {
    let conn_id = subscription.id().to_owned();
    tracing::info!(conn_id = %conn_id, "Subscriber connected");

    let end = loop {
        tokio::select! {
            outbound = subscription.recv() => {
                let Some(frame) = outbound else {
                    break SessionEnd::Unregistered;
                };
                let closing = matches!(frame, Message::Close(_));
                if let Err(e) = socket.send(frame).await {
                    break SessionEnd::Transport(e);
                }
                if closing {
                    break SessionEnd::ServerClosed;
                }
            }
            inbound = socket.recv() => match inbound {
                None | Some(Ok(Message::Close(_))) => break SessionEnd::ClientClosed,
                Some(Ok(Message::Pong(_))) => {
                    tracing::trace!(conn_id = %conn_id, "Pong received");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break SessionEnd::Transport(e),
            },
        }
    };

    drop(subscription);
    match end {
        SessionEnd::Transport(e) => {
            tracing::debug!(conn_id = %conn_id, error = %e, "Subscriber transport error");
        }
        reason => {
            tracing::info!(conn_id = %conn_id, ?reason, "Subscriber disconnected");
        }
    }
}
