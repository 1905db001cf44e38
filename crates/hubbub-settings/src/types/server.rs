//! Server network and hub runtime settings.

use serde::{Deserialize, Serialize};

/// Server network and hub runtime settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// HTTP/WebSocket port (`0` for auto-assign).
    pub port: u16,
    /// Directory of static frontend assets served at `/`.
    pub public_dir: String,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// WebSocket heartbeat ping interval in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Disconnect a peer after this long without a pong, in milliseconds.
    pub heartbeat_timeout_ms: u64,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Relay channel capacity (inbound events awaiting fan-out).
    pub relay_buffer: usize,
    /// Per-peer outbox capacity (payloads awaiting write).
    pub outbox_buffer: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            public_dir: "public".to_string(),
            max_connections: 50,
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 90_000,
            max_message_size: 1024 * 1024, // 1 MiB
            relay_buffer: 256,
            outbox_buffer: 64,
        }
    }
}
