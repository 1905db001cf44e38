//! Heartbeat ping/pong liveness monitoring.
//!
//! The transport only reports a dead peer once a read or write fails, which
//! can take arbitrarily long for a half-open connection. The watchdog closes
//! that gap: the outbound pump sends Ping frames, the inbound pump marks the
//! peer alive on Pong, and this loop evicts peers that stay silent.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use super::peer::Peer;

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// The peer stopped responding within the timeout window.
    TimedOut,
    /// The heartbeat was cancelled externally (normal teardown).
    Cancelled,
}

/// Run the heartbeat watchdog for a peer.
///
/// At each `interval` tick the alive flag is checked and reset. Misses
/// accumulate; once the peer has been silent for `timeout` (expressed as
/// `timeout / interval` consecutive misses, at least one) the loop returns
/// [`HeartbeatResult::TimedOut`].
pub async fn run_heartbeat(
    peer: Arc<Peer>,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> HeartbeatResult {
    let mut ticker = time::interval(interval);
    // The first tick fires immediately; skip it so peers get a full interval
    // to produce their first pong.
    let _ = ticker.tick().await;

    let mut missed: u32 = 0;
    #[allow(clippy::cast_possible_truncation)]
    let max_missed = (timeout.as_millis() / interval.as_millis().max(1)).max(1) as u32;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if peer.check_alive() {
                    missed = 0;
                } else {
                    missed += 1;
                    if missed >= max_missed {
                        return HeartbeatResult::TimedOut;
                    }
                }
                // Stays not-alive until the next pong
                peer.is_alive.store(false, Ordering::Relaxed);
            }
            () = cancel.cancelled() => {
                return HeartbeatResult::Cancelled;
            }
        }
    }
}
