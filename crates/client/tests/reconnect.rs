//! Reconnect behaviour against a local tokio-tungstenite server.

use std::time::Duration;

use futures::SinkExt;
use scenecast_client::client::EVENT_BUFFER;
use scenecast_client::{ClientError, ConnectionState, LiveClient, ReconnectConfig};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

fn fast_config() -> ReconnectConfig {
    ReconnectConfig {
        initial_delay: Duration::from_millis(20),
        max_delay: Duration::from_millis(200),
        multiplier: 2.0,
    }
}

fn job_frame(id: i64, progress: i64) -> Message {
    Message::Text(
        serde_json::json!({
            "type": "job_progress",
            "data": {"job": {"id": id, "progress": progress}},
        })
        .to_string(),
    )
}

/// Accept one connection, send `frames`, then close it.
async fn serve_once(listener: &TcpListener, frames: Vec<Message>) {
    let (stream, _) = listener.accept().await.unwrap();
    let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();
    for frame in frames {
        socket.send(frame).await.unwrap();
    }
    socket.close(None).await.unwrap();
}

async fn within<F: std::future::Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}

#[tokio::test]
async fn receives_events_and_reconnects_after_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let mut client = LiveClient::spawn(url, fast_config()).unwrap();
    assert_eq!(client.state(), ConnectionState::Disconnected);

    within(serve_once(&listener, vec![job_frame(1, 10), job_frame(1, 20)])).await;

    let first = within(client.next_event()).await.unwrap();
    let second = within(client.next_event()).await.unwrap();
    assert_eq!(first.job_id(), Some(1));
    assert_eq!(second.data["job"]["progress"], 20);
    assert_eq!(client.last_event(), Some(second));

    // The server closed; the client comes back on its own.
    within(serve_once(&listener, vec![job_frame(2, 5)])).await;
    let third = within(client.next_event()).await.unwrap();
    assert_eq!(third.job_id(), Some(2));

    client.shutdown().await;
}

#[tokio::test]
async fn state_tracks_connectivity() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let mut client = LiveClient::spawn(url, fast_config()).unwrap();
    let mut states = client.watch_state();

    let (stream, _) = within(listener.accept()).await.unwrap();
    let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();
    within(client.wait_for_state(ConnectionState::Connected)).await;

    socket.close(None).await.unwrap();
    drop(socket);
    within(states.wait_for(|s| *s == ConnectionState::Disconnected))
        .await
        .unwrap();

    client.shutdown().await;
}

#[tokio::test]
async fn unrecognised_frames_are_skipped() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let mut client = LiveClient::spawn(url, fast_config()).unwrap();

    within(serve_once(
        &listener,
        vec![
            Message::Text("not json".into()),
            Message::Text(r#"{"type":"job_exploded","data":{}}"#.into()),
            job_frame(9, 50),
        ],
    ))
    .await;

    let event = within(client.next_event()).await.unwrap();
    assert_eq!(event.job_id(), Some(9));

    client.shutdown().await;
}

#[tokio::test]
async fn unread_events_are_bounded_but_last_event_stays_current() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let mut client = LiveClient::spawn(url, fast_config()).unwrap();

    let total = EVENT_BUFFER as i64 + 10;
    let frames = (0..total).map(|i| job_frame(i, 1)).collect();
    within(serve_once(&listener, frames)).await;

    // Frames are delivered in order, so the last one arriving means every
    // earlier one was offered to the buffer.
    within(async {
        while client.last_event().and_then(|e| e.job_id()) != Some(total - 1) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;

    for expected in 0..EVENT_BUFFER as i64 {
        let event = within(client.next_event()).await.unwrap();
        assert_eq!(event.job_id(), Some(expected));
    }
    let overflow = tokio::time::timeout(Duration::from_millis(50), client.next_event()).await;
    assert!(overflow.is_err(), "events past the buffer should have been dropped");

    client.shutdown().await;
}

#[tokio::test]
async fn keeps_retrying_while_server_is_down() {
    // Reserve a port, then free it so connects are refused.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = LiveClient::spawn(format!("ws://{addr}"), fast_config()).unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(client.last_event().is_none());

    client.shutdown().await;
}

#[test]
fn rejects_non_websocket_urls() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let _guard = runtime.enter();

    let result = LiveClient::spawn("http://localhost:3000", ReconnectConfig::default());

    assert!(matches!(result, Err(ClientError::InvalidUrl(_))));
}
