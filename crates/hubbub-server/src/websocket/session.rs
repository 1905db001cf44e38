//! WebSocket session lifecycle — one connected peer from upgrade through
//! disconnect.
//!
//! Each session runs two pumps that never contend on the same direction of
//! the socket: the inbound pump owns the read half and feeds the relay, the
//! outbound pump owns the write half and drains the peer's outbox. A slow
//! writer therefore never blocks reads from the same peer, and vice versa.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use hubbub_core::event::classify;

use super::heartbeat::{run_heartbeat, HeartbeatResult};
use super::hub::{Hub, RelayEvent};
use super::peer::Peer;
use crate::metrics::{
    WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_CONNECTION_DURATION_SECONDS,
    WS_DISCONNECTIONS_TOTAL,
};

/// Run a WebSocket session for a newly upgraded connection.
///
/// 1. Registers a peer with the hub
/// 2. Spawns the outbound pump (outbox → socket, plus Ping frames)
/// 3. Spawns the heartbeat watchdog
/// 4. Runs the inbound pump (socket → relay) in place
/// 5. Tears down when any of the three finishes
///
/// Teardown is idempotent: whichever pump fails first wins, and the
/// registry's check-then-delete collapses concurrent removals into one.
#[instrument(skip_all, fields(peer_id))]
pub async fn run_peer_session(
    socket: WebSocket,
    hub: Arc<Hub>,
    heartbeat_interval: Duration,
    heartbeat_timeout: Duration,
) {
    let (peer, outbox_rx) = match hub.register().await {
        Ok(registered) => registered,
        Err(err) => {
            // Lost the capacity race between the upgrade check and here
            warn!(error = %err, "registration refused, dropping connection");
            return;
        }
    };
    let _ = tracing::Span::current().record("peer_id", peer.id.as_str());
    info!("peer connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let (ws_tx, ws_rx) = socket.split();

    let mut outbound = tokio::spawn(outbound_pump(ws_tx, outbox_rx, heartbeat_interval));
    let cancel = CancellationToken::new();
    let mut watchdog = tokio::spawn(run_heartbeat(
        peer.clone(),
        heartbeat_interval,
        heartbeat_timeout,
        cancel.clone(),
    ));

    tokio::select! {
        () = inbound_pump(ws_rx, &peer, &hub) => {
            debug!("inbound pump finished");
        }
        _ = &mut outbound => {
            debug!("outbound pump finished");
        }
        result = &mut watchdog => {
            if matches!(result, Ok(HeartbeatResult::TimedOut)) {
                warn!(
                    silent_for = ?peer.last_pong_elapsed(),
                    "peer unresponsive, disconnecting"
                );
            }
        }
        () = peer.wait_closed() => {
            debug!("peer evicted by the hub");
        }
    }

    cancel.cancel();
    outbound.abort();
    let removed = hub.unregister(&peer.id).await;
    info!(removed, "peer disconnected");
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(peer.age().as_secs_f64());
}

/// Read frames until the peer closes, errors, or the relay goes away.
async fn inbound_pump(mut ws_rx: SplitStream<WebSocket>, peer: &Arc<Peer>, hub: &Hub) {
    while let Some(Ok(msg)) = ws_rx.next().await {
        let payload = match inbound_frame(msg) {
            Inbound::Relay(payload) => payload,
            Inbound::Alive => {
                peer.mark_alive();
                continue;
            }
            Inbound::Ignore => continue,
            Inbound::Closed => break,
        };

        // Best-effort diagnostics; the relay treats the payload as opaque.
        debug!(tag = %classify(payload.as_str()), len = payload.len(), "frame received");

        let event = RelayEvent {
            origin: peer.id.clone(),
            payload,
        };
        if hub.submit(event).await.is_err() {
            warn!("relay channel closed, ending session");
            break;
        }
    }
}

/// Drain the outbox into the socket and keep the connection pinged.
async fn outbound_pump(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbox: mpsc::Receiver<Utf8Bytes>,
    ping_interval: Duration,
) {
    let mut ticker = tokio::time::interval(ping_interval);
    // The first tick fires immediately; skip it
    let _ = ticker.tick().await;

    loop {
        tokio::select! {
            payload = outbox.recv() => {
                match payload {
                    Some(text) => {
                        if ws_tx.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = ticker.tick() => {
                if ws_tx.send(Message::Ping(vec![].into())).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// What the inbound pump should do with one frame.
#[derive(Debug, PartialEq)]
enum Inbound {
    /// Relay this payload to the other peers.
    Relay(Utf8Bytes),
    /// Liveness signal only.
    Alive,
    /// Nothing to do.
    Ignore,
    /// The peer said goodbye.
    Closed,
}

fn inbound_frame(msg: Message) -> Inbound {
    match msg {
        Message::Text(text) => Inbound::Relay(text),
        // Some clients send text payloads in binary frames; accept UTF-8
        Message::Binary(data) => match std::str::from_utf8(&data) {
            Ok(text) => Inbound::Relay(Utf8Bytes::from(text.to_owned())),
            Err(_) => {
                info!(len = data.len(), "discarding non-UTF8 binary frame");
                Inbound::Ignore
            }
        },
        Message::Ping(_) | Message::Pong(_) => Inbound::Alive,
        Message::Close(_) => Inbound::Closed,
    }
}
