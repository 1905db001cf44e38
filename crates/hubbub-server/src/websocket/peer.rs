//! Connected peer state.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::extract::ws::Utf8Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use hubbub_core::PeerId;

/// A peer connected over WebSocket.
///
/// A peer pairs its identity with the sending half of its private outbox.
/// The receiving half is owned by the peer's outbound pump, so delivery is
/// FIFO with exactly one consumer; any task may enqueue.
#[derive(Debug)]
pub struct Peer {
    /// Unique peer ID.
    pub id: PeerId,
    /// Sending half of the outbox, drained by the outbound pump.
    outbox: mpsc::Sender<Utf8Bytes>,
    /// When this peer connected.
    pub connected_at: Instant,
    /// Whether the peer has responded since the last heartbeat check.
    pub is_alive: AtomicBool,
    /// When the last Pong (or Ping) was received.
    last_pong: Mutex<Instant>,
    /// Count of payloads dropped because the outbox was full or closed.
    dropped_payloads: AtomicU64,
    /// Cancelled exactly once when the peer leaves the registry; the
    /// session watches it so a hub-side eviction also closes the socket.
    closed: CancellationToken,
}

impl Peer {
    /// Create a new peer around an outbox sender.
    pub fn new(id: PeerId, outbox: mpsc::Sender<Utf8Bytes>) -> Self {
        let now = Instant::now();
        Self {
            id,
            outbox,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_payloads: AtomicU64::new(0),
            closed: CancellationToken::new(),
        }
    }

    /// Enqueue a payload onto this peer's outbox.
    ///
    /// Returns `false` if the outbox is full or closed, and increments the
    /// dropped-payload counter. Never blocks: a stalled peer must not stall
    /// the relay loop.
    pub fn enqueue(&self, payload: Utf8Bytes) -> bool {
        if self.outbox.try_send(payload).is_ok() {
            true
        } else {
            let _ = self.dropped_payloads.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Total payloads dropped for this peer.
    pub fn drop_count(&self) -> u64 {
        self.dropped_payloads.load(Ordering::Relaxed)
    }

    /// Mark the peer as alive (pong received).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Duration since the last pong (or connection establishment).
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Check and reset the alive flag for the heartbeat watchdog.
    ///
    /// Returns `true` if the peer was alive since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Mark the peer closed. Idempotent.
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Whether the peer has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolve once the peer is closed.
    pub async fn wait_closed(&self) {
        self.closed.cancelled().await;
    }
}
