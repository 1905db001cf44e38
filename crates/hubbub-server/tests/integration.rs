//! End-to-end integration tests using real WebSocket clients.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use hubbub_server::config::ServerConfig;
use hubbub_server::server::HubServer;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Window used to assert that a peer receives nothing.
const SILENCE: Duration = Duration::from_millis(300);

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Boot a test server on an ephemeral port.
async fn boot(config: ServerConfig) -> (SocketAddr, HubServer) {
    let server = HubServer::new(config);
    let (addr, _handle) = server.listen().await.unwrap();
    (addr, server)
}

async fn connect(addr: SocketAddr) -> WsStream {
    let (ws, _) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("websocket connect");
    ws
}

/// Receive the next Text frame, skipping control frames. `None` on close,
/// error, or timeout.
async fn recv_text(ws: &mut WsStream) -> Option<String> {
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    loop {
        let remaining = deadline
            .checked_duration_since(tokio::time::Instant::now())?;
        match timeout(remaining, ws.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => return Some(text.to_string()),
            Ok(Some(Ok(_))) => {}
            Ok(Some(Err(_)) | None) | Err(_) => return None,
        }
    }
}

/// Assert that no Text frame arrives within [`SILENCE`].
async fn assert_silent(ws: &mut WsStream) {
    let deadline = tokio::time::Instant::now() + SILENCE;
    loop {
        let Some(remaining) = deadline.checked_duration_since(tokio::time::Instant::now())
        else {
            return;
        };
        match timeout(remaining, ws.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                panic!("expected silence, received {text:?}");
            }
            Ok(Some(Ok(_))) => {}
            Ok(Some(Err(_)) | None) | Err(_) => return,
        }
    }
}

async fn wait_for_connections(addr: SocketAddr, expected: usize) {
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    loop {
        let body: serde_json::Value = reqwest::get(format!("http://{addr}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if body["connections"] == expected {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {expected} connections, health = {body}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn health_reports_live_connections() {
    let (addr, _server) = boot(ServerConfig::default()).await;

    let body: serde_json::Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connections"], 0);

    let _peer = connect(addr).await;
    wait_for_connections(addr, 1).await;
}

#[tokio::test]
async fn broadcast_reaches_every_other_peer() {
    // The canonical scenario: A, B, C register. A sends HELLO — B and C
    // each receive it exactly once, A receives nothing. B disconnects.
    // C sends PING — only A receives, and B's departure disturbs nobody.
    let (addr, _server) = boot(ServerConfig::default()).await;

    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    let mut c = connect(addr).await;
    wait_for_connections(addr, 3).await;

    a.send(Message::Text("HELLO".into())).await.unwrap();

    assert_eq!(recv_text(&mut b).await.as_deref(), Some("HELLO"));
    assert_eq!(recv_text(&mut c).await.as_deref(), Some("HELLO"));
    assert_silent(&mut a).await;

    // B leaves; the hub only learns of it through the transport
    b.close(None).await.unwrap();
    drop(b);
    wait_for_connections(addr, 2).await;

    c.send(Message::Text("PING".into())).await.unwrap();

    assert_eq!(recv_text(&mut a).await.as_deref(), Some("PING"));
    assert_silent(&mut c).await;
}

#[tokio::test]
async fn per_peer_delivery_is_fifo() {
    let (addr, _server) = boot(ServerConfig::default()).await;

    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    wait_for_connections(addr, 2).await;

    for i in 0..10 {
        a.send(Message::Text(format!("m{i}").into())).await.unwrap();
    }
    for i in 0..10 {
        assert_eq!(recv_text(&mut b).await, Some(format!("m{i}")));
    }
}

#[tokio::test]
async fn single_peer_hears_only_silence() {
    let (addr, _server) = boot(ServerConfig::default()).await;

    let mut a = connect(addr).await;
    wait_for_connections(addr, 1).await;

    a.send(Message::Text("anyone?".into())).await.unwrap();
    assert_silent(&mut a).await;
}

#[tokio::test]
async fn late_joiner_receives_subsequent_messages() {
    let (addr, _server) = boot(ServerConfig::default()).await;

    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    wait_for_connections(addr, 2).await;

    a.send(Message::Text("early".into())).await.unwrap();
    assert_eq!(recv_text(&mut b).await.as_deref(), Some("early"));

    let mut c = connect(addr).await;
    wait_for_connections(addr, 3).await;

    a.send(Message::Text("late".into())).await.unwrap();
    assert_eq!(recv_text(&mut b).await.as_deref(), Some("late"));
    // C missed "early" (no persistence) but gets everything after joining
    assert_eq!(recv_text(&mut c).await.as_deref(), Some("late"));
}

#[tokio::test]
async fn utf8_binary_frames_rebroadcast_as_text() {
    let (addr, _server) = boot(ServerConfig::default()).await;

    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    wait_for_connections(addr, 2).await;

    a.send(Message::Binary(b"BIN".to_vec().into())).await.unwrap();
    assert_eq!(recv_text(&mut b).await.as_deref(), Some("BIN"));
}

#[tokio::test]
async fn envelope_payloads_pass_through_verbatim() {
    let (addr, _server) = boot(ServerConfig::default()).await;

    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    wait_for_connections(addr, 2).await;

    let frame = r#"{"type":"send_message","payload":{"message":"hi","from":"alice"}}"#;
    a.send(Message::Text(frame.into())).await.unwrap();
    assert_eq!(recv_text(&mut b).await.as_deref(), Some(frame));
}

#[tokio::test]
async fn plain_http_request_to_ws_is_rejected() {
    let (addr, _server) = boot(ServerConfig::default()).await;

    let resp = reqwest::get(format!("http://{addr}/ws")).await.unwrap();
    assert!(resp.status().is_client_error());

    // A bad upgrade never disturbs the hub
    let body: serde_json::Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["connections"], 0);
}

#[tokio::test]
async fn connection_limit_rejects_excess_upgrades() {
    let config = ServerConfig {
        max_connections: 1,
        ..ServerConfig::default()
    };
    let (addr, _server) = boot(config).await;

    let _first = connect(addr).await;
    wait_for_connections(addr, 1).await;

    let second = connect_async(format!("ws://{addr}/ws")).await;
    assert!(second.is_err(), "second upgrade should be refused");
}

#[tokio::test]
async fn unresponsive_peer_is_disconnected_by_heartbeat() {
    let config = ServerConfig {
        heartbeat_interval: Duration::from_millis(100),
        heartbeat_timeout: Duration::from_millis(300),
        ..ServerConfig::default()
    };
    let (addr, _server) = boot(config).await;

    // Never read from the socket, so the client library never answers pings
    let mut silent = connect(addr).await;
    wait_for_connections(addr, 1).await;

    tokio::time::sleep(Duration::from_millis(800)).await;
    wait_for_connections(addr, 0).await;

    // The next read observes the server-side close
    assert_eq!(recv_text(&mut silent).await, None);
}

#[tokio::test]
async fn disconnect_does_not_disturb_remaining_peers() {
    let (addr, _server) = boot(ServerConfig::default()).await;

    let mut a = connect(addr).await;
    let b = connect(addr).await;
    wait_for_connections(addr, 2).await;

    // Abrupt drop, no close handshake — the read half errors server-side
    drop(b);
    wait_for_connections(addr, 1).await;

    // A keeps working and hears nothing about it
    assert_silent(&mut a).await;
}

#[tokio::test]
async fn static_assets_served_next_to_ws() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>lobby</h1>").unwrap();

    let config = ServerConfig {
        public_dir: Some(dir.path().to_path_buf()),
        ..ServerConfig::default()
    };
    let (addr, _server) = boot(config).await;

    let resp = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert!(resp.status().is_success());
    assert_eq!(resp.text().await.unwrap(), "<h1>lobby</h1>");
}

#[tokio::test]
async fn graceful_shutdown_stops_serving() {
    let server = HubServer::new(ServerConfig::default());
    let (addr, handle) = server.listen().await.unwrap();

    // Reachable before shutdown
    assert!(reqwest::get(format!("http://{addr}/health")).await.is_ok());

    server.shutdown().shutdown();
    timeout(TIMEOUT, handle)
        .await
        .expect("shutdown timed out")
        .expect("join error");

    assert!(reqwest::get(format!("http://{addr}/health")).await.is_err());
}
