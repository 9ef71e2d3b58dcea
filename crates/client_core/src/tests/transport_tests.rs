use std::time::Duration;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        WebSocketUpgrade,
    },
    routing::get,
    Router,
};
use tokio::{net::TcpListener, time::timeout};

use super::*;

const WAIT: Duration = Duration::from_secs(5);

/// Serves one greeting frame holding two lines, then forwards every text frame
/// it receives to the returned channel.
async fn spawn_sim() -> (String, mpsc::UnboundedReceiver<String>) {
    let (received_tx, received_rx) = mpsc::unbounded_channel();
    let app = Router::new().route(
        "/ws",
        get(move |ws: WebSocketUpgrade| {
            let received_tx = received_tx.clone();
            async move { ws.on_upgrade(move |socket| sim_connection(socket, received_tx)) }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    (format!("ws://{addr}/ws"), received_rx)
}

async fn sim_connection(mut socket: WebSocket, received: mpsc::UnboundedSender<String>) {
    if socket
        .send(WsMessage::Text(
            "Success: .{a=1}\r\n\nhello there\n".to_string(),
        ))
        .await
        .is_err()
    {
        return;
    }
    while let Some(Ok(msg)) = socket.recv().await {
        if let WsMessage::Text(text) = msg {
            let _ = received.send(text);
        }
    }
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<TransportEvent>) -> TransportEvent {
    timeout(WAIT, events.recv())
        .await
        .expect("event timeout")
        .expect("event channel open")
}

#[tokio::test]
async fn delivers_each_line_and_sends_updates() {
    let (url, mut received) = spawn_sim().await;
    let (transport, mut events) = WsTransport::spawn(&url).expect("spawn");

    assert_eq!(next_event(&mut events).await, TransportEvent::Opened);
    assert!(transport.is_open());
    assert_eq!(
        next_event(&mut events).await,
        TransportEvent::Message("Success: .{a=1}".to_string())
    );
    assert_eq!(
        next_event(&mut events).await,
        TransportEvent::Message("hello there".to_string())
    );

    transport.send("sample_angle 2 mod").expect("send");
    let wire = timeout(WAIT, received.recv())
        .await
        .expect("receive timeout")
        .expect("server channel open");
    assert_eq!(wire, "sample_angle 2 mod");
}

#[tokio::test]
async fn dropping_the_transport_closes_the_connection() {
    let (url, _received) = spawn_sim().await;
    let (transport, mut events) = WsTransport::spawn(&url).expect("spawn");
    assert_eq!(next_event(&mut events).await, TransportEvent::Opened);
    drop(transport);

    loop {
        match next_event(&mut events).await {
            TransportEvent::Closed => break,
            TransportEvent::Message(_) => continue,
            other => panic!("unexpected event {other:?}"),
        }
    }
}

#[tokio::test]
async fn failed_connect_reports_error_then_closed() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let (transport, mut events) = WsTransport::spawn(&format!("ws://{addr}/ws")).expect("spawn");
    assert!(!transport.is_open());
    assert!(matches!(transport.send("a 1"), Err(TransportError::NotOpen)));

    assert!(matches!(
        next_event(&mut events).await,
        TransportEvent::Error(message) if message.contains("failed to connect")
    ));
    assert_eq!(next_event(&mut events).await, TransportEvent::Closed);
    assert!(!transport.is_open());
}

#[test]
fn rejects_non_websocket_urls() {
    assert!(validate_ws_url("wss://sim.example/ws").is_ok());
    assert!(matches!(
        validate_ws_url("http://127.0.0.1:8765/ws"),
        Err(TransportError::InvalidUrl { .. })
    ));
    assert!(matches!(
        validate_ws_url("not a url"),
        Err(TransportError::InvalidUrl { .. })
    ));
}
