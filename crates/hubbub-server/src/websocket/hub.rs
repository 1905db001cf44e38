//! The hub: peer registry and fan-out relay.
//!
//! The hub owns the set of live peers and the single relay loop that turns
//! one inbound frame into N outbound deliveries. Ingestion is concurrent
//! across peers, but every broadcast decision passes through the relay
//! channel's one consumer, so decisions are made one at a time.
//!
//! Lock discipline: the registry takes an exclusive lock for membership
//! changes and a shared read lock for fan-out. The target set is snapshotted
//! and the lock released before any outbox enqueue, so registry and outbox
//! never nest.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use metrics::counter;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use hubbub_core::{HubError, PeerId};

use super::peer::Peer;
use crate::config::ServerConfig;
use crate::metrics::{FANOUT_DROPS_TOTAL, RELAY_EVENTS_TOTAL};

/// Maximum lifetime payload drops before a slow peer is evicted.
pub const MAX_TOTAL_DROPS: u64 = 100;

/// One inbound frame awaiting fan-out.
///
/// Created by a peer's inbound pump, consumed exactly once by the relay loop.
#[derive(Debug, Clone)]
pub struct RelayEvent {
    /// The peer the frame arrived from (excluded from delivery).
    pub origin: PeerId,
    /// The frame payload, rebroadcast verbatim.
    pub payload: Utf8Bytes,
}

/// Owns the peer registry and the relay channel.
pub struct Hub {
    /// Live peers indexed by ID.
    peers: RwLock<HashMap<PeerId, Arc<Peer>>>,
    /// Atomic counter tracking live peers (avoids read-locking for counts).
    active_count: AtomicUsize,
    /// Registration limit.
    max_peers: usize,
    /// Capacity of each newly created outbox.
    outbox_buffer: usize,
    /// Producer side of the relay channel.
    relay_tx: mpsc::Sender<RelayEvent>,
}

impl Hub {
    /// Create a hub along with the consumer half of its relay channel.
    ///
    /// The caller must drive [`Hub::run_relay`] with the returned receiver
    /// for broadcasts to flow; [`Hub::spawn`] does both in one step.
    pub fn new(config: &ServerConfig) -> (Arc<Self>, mpsc::Receiver<RelayEvent>) {
        let (relay_tx, relay_rx) = mpsc::channel(config.relay_buffer);
        let hub = Arc::new(Self {
            peers: RwLock::new(HashMap::new()),
            active_count: AtomicUsize::new(0),
            max_peers: config.max_connections,
            outbox_buffer: config.outbox_buffer,
            relay_tx,
        });
        (hub, relay_rx)
    }

    /// Create a hub and spawn its relay loop onto the current runtime.
    pub fn spawn(config: &ServerConfig) -> Arc<Self> {
        let (hub, relay_rx) = Self::new(config);
        drop(tokio::spawn(Arc::clone(&hub).run_relay(relay_rx)));
        hub
    }

    /// Register a new peer.
    ///
    /// Assigns a fresh [`PeerId`], creates the peer's outbox, and inserts it
    /// into the registry under an exclusive lock. Returns the peer and the
    /// outbox receiver for the peer's outbound pump.
    pub async fn register(&self) -> Result<(Arc<Peer>, mpsc::Receiver<Utf8Bytes>), HubError> {
        if self.connection_count() >= self.max_peers {
            return Err(HubError::AtCapacity {
                limit: self.max_peers,
            });
        }
        let (tx, rx) = mpsc::channel(self.outbox_buffer);
        let peer = Arc::new(Peer::new(PeerId::new(), tx));
        {
            let mut peers = self.peers.write().await;
            let _ = peers.insert(peer.id.clone(), peer.clone());
        }
        let _ = self.active_count.fetch_add(1, Ordering::Relaxed);
        Ok((peer, rx))
    }

    /// Remove a peer from the registry.
    ///
    /// Exclusive-lock check-then-delete; safe to call any number of times
    /// for the same peer. Returns `true` only for the call that actually
    /// removed it, which drives the single close side effect: that call
    /// cancels the peer's close token, and the session releases the socket
    /// in response.
    pub async fn unregister(&self, id: &PeerId) -> bool {
        let removed = {
            let mut peers = self.peers.write().await;
            peers.remove(id)
        };
        match removed {
            Some(peer) => {
                let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
                peer.close();
                true
            }
            None => false,
        }
    }

    /// Submit an inbound frame for fan-out.
    ///
    /// Awaits capacity on the relay channel: when the relay loop is
    /// saturated, producers block rather than drop. Errors only when the
    /// relay loop is gone.
    pub async fn submit(&self, event: RelayEvent) -> Result<(), HubError> {
        self.relay_tx
            .send(event)
            .await
            .map_err(|_| HubError::RelayClosed)
    }

    /// Run the relay loop until every producer is gone.
    ///
    /// The single point of truth for "who receives this": events are
    /// processed one at a time, keeping the broadcast order each individual
    /// peer observes consistent with relay arrival order.
    pub async fn run_relay(self: Arc<Self>, mut events: mpsc::Receiver<RelayEvent>) {
        while let Some(event) = events.recv().await {
            self.fan_out(event).await;
        }
        debug!("relay loop stopped");
    }

    /// Deliver one event to every live peer except its origin.
    async fn fan_out(&self, event: RelayEvent) {
        counter!(RELAY_EVENTS_TOTAL).increment(1);

        // Snapshot targets so no outbox enqueue happens under the registry
        // lock.
        let targets: Vec<Arc<Peer>> = {
            let peers = self.peers.read().await;
            peers
                .values()
                .filter(|peer| peer.id != event.origin)
                .cloned()
                .collect()
        };
        debug!(
            origin = %event.origin,
            recipients = targets.len(),
            len = event.payload.len(),
            "fan-out"
        );

        let mut evict = Vec::new();
        for peer in &targets {
            if !peer.enqueue(event.payload.clone()) {
                counter!(FANOUT_DROPS_TOTAL).increment(1);
                let drops = peer.drop_count();
                if drops >= MAX_TOTAL_DROPS {
                    warn!(peer_id = %peer.id, drops, "evicting slow peer");
                    evict.push(peer.id.clone());
                } else {
                    warn!(peer_id = %peer.id, drops, "outbox full, payload dropped");
                }
            }
        }

        for id in &evict {
            if self.unregister(id).await {
                info!(peer_id = %id, "slow peer removed from registry");
            }
        }
    }

    /// Number of live peers.
    pub fn connection_count(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }

    /// Whether a peer is currently registered.
    pub async fn contains(&self, id: &PeerId) -> bool {
        self.peers.read().await.contains_key(id)
    }
}
