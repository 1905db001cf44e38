//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use hubbub_settings::ServerSettings;

/// Runtime configuration for the hubbub server.
///
/// Usually built from [`ServerSettings`] via [`ServerConfig::from_settings`];
/// the [`Default`] values match the settings defaults except for the port
/// (`0` for auto-assign, convenient in tests) and the public directory
/// (`None`, so tests do not serve files).
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Directory of static assets served at `/`, if any.
    pub public_dir: Option<PathBuf>,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Interval between server-initiated Ping frames.
    pub heartbeat_interval: Duration,
    /// Disconnect a peer after this long without a pong.
    pub heartbeat_timeout: Duration,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Relay channel capacity (inbound events awaiting fan-out).
    pub relay_buffer: usize,
    /// Per-peer outbox capacity (payloads awaiting write).
    pub outbox_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            public_dir: None,
            max_connections: 50,
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_timeout: Duration::from_secs(90),
            max_message_size: 1024 * 1024, // 1 MiB
            relay_buffer: 256,
            outbox_buffer: 64,
        }
    }
}

impl ServerConfig {
    /// Build a config from loaded settings.
    ///
    /// An empty `publicDir` disables static serving.
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            public_dir: (!settings.public_dir.is_empty())
                .then(|| PathBuf::from(&settings.public_dir)),
            max_connections: settings.max_connections,
            heartbeat_interval: Duration::from_millis(settings.heartbeat_interval_ms),
            heartbeat_timeout: Duration::from_millis(settings.heartbeat_timeout_ms),
            max_message_size: settings.max_message_size,
            relay_buffer: settings.relay_buffer,
            outbox_buffer: settings.outbox_buffer,
        }
    }
}
