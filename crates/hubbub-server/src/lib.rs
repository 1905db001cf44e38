//! # hubbub-server
//!
//! Axum HTTP + `WebSocket` server and message fan-out.
//!
//! - HTTP endpoints: health check, Prometheus metrics, static assets
//! - `WebSocket` gateway: upgrade endpoint, one peer per connection with an
//!   inbound and an outbound pump, ping/pong liveness watchdog
//! - Fan-out: a single relay loop serializes broadcast decisions and
//!   delivers each inbound frame to every peer except its origin
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;
