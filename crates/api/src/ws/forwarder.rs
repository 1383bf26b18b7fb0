use std::sync::Arc;

use axum::extract::ws::Message;
use scenecast_events::LiveEvent;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::ws::manager::WsManager;

/// Relay every event from `receiver` to all WebSocket clients as a JSON
/// text frame.
///
/// Runs until `stop` is cancelled or the bus is dropped. A lagging
/// receiver logs how many events it skipped and keeps going.
pub async fn forward_events(
    mut receiver: broadcast::Receiver<LiveEvent>,
    ws_manager: Arc<WsManager>,
    stop: CancellationToken,
) {
    loop {
        // Buffered events are relayed before a stop request is honoured.
        let event = tokio::select! {
            biased;
            received = receiver.recv() => received,
            _ = stop.cancelled() => break,
        };

        match event {
            Ok(event) => {
                let text = match event.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(error = %e, kind = %event.kind, "Failed to serialize live event");
                        continue;
                    }
                };
                let delivered = ws_manager.broadcast(Message::Text(text.into())).await;
                tracing::trace!(kind = %event.kind, job_id = ?event.job_id(), delivered, "Live event forwarded");
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "Live event forwarder lagged");
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::info!("Event bus closed, live event forwarder shutting down");
                break;
            }
        }
    }
}
