//! # hubbubd
//!
//! Hubbub server binary — loads settings, wires the hub, and serves until
//! ctrl-c.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hubbub_server::config::ServerConfig;
use hubbub_server::metrics;
use hubbub_server::server::HubServer;

/// Real-time message fan-out hub.
#[derive(Parser, Debug)]
#[command(name = "hubbubd", about = "Real-time message fan-out hub")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings; 0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Directory of static assets served at `/` (overrides settings).
    #[arg(long)]
    public_dir: Option<PathBuf>,

    /// Path to the settings file (default `~/.hubbub/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
}

/// CLI flags win over settings-file values.
fn apply_cli_overrides(config: &mut ServerConfig, args: &Cli) {
    if let Some(host) = &args.host {
        config.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(dir) = &args.public_dir {
        config.public_dir = Some(dir.clone());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings_path = args
        .settings
        .clone()
        .unwrap_or_else(hubbub_settings::settings_path);
    let settings = hubbub_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("loading settings from '{}'", settings_path.display()))?;

    // RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = ServerConfig::from_settings(&settings.server);
    apply_cli_overrides(&mut config, &args);

    let metrics_handle = metrics::install_recorder();
    let server = HubServer::new(config).with_metrics(metrics_handle);

    let (addr, handle) = server.listen().await.context("failed to bind server")?;
    tracing::info!("hubbub listening on http://{addr} (WebSocket endpoint at /ws)");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    tracing::info!("shutting down...");
    server.shutdown().graceful_shutdown(vec![handle], None).await;
    tracing::info!("shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_to_settings_values() {
        let cli = Cli::parse_from(["hubbubd"]);
        assert_eq!(cli.host, None);
        assert_eq!(cli.port, None);
        assert_eq!(cli.public_dir, None);
        assert_eq!(cli.settings, None);
    }

    #[test]
    fn cli_custom_host_and_port() {
        let cli = Cli::parse_from(["hubbubd", "--host", "0.0.0.0", "--port", "9090"]);
        assert_eq!(cli.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(cli.port, Some(9090));
    }

    #[test]
    fn cli_public_dir() {
        let cli = Cli::parse_from(["hubbubd", "--public-dir", "./web"]);
        assert_eq!(cli.public_dir, Some(PathBuf::from("./web")));
    }

    #[test]
    fn cli_settings_path() {
        let cli = Cli::parse_from(["hubbubd", "--settings", "/tmp/hubbub.json"]);
        assert_eq!(cli.settings, Some(PathBuf::from("/tmp/hubbub.json")));
    }

    #[test]
    fn cli_overrides_win_over_settings() {
        let settings = hubbub_settings::HubbubSettings::default();
        let mut config = ServerConfig::from_settings(&settings.server);
        assert_eq!(config.port, 8080);

        let cli = Cli::parse_from(["hubbubd", "--port", "9999", "--host", "::1"]);
        apply_cli_overrides(&mut config, &cli);
        assert_eq!(config.port, 9999);
        assert_eq!(config.host, "::1");
        // Untouched values survive
        assert_eq!(config.max_connections, 50);
    }

    #[test]
    fn settings_file_feeds_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"server":{"port":7777,"maxConnections":3},"logging":{"filter":"debug"}}"#,
        )
        .unwrap();

        let settings = hubbub_settings::load_settings_from_path(&path).unwrap();
        assert_eq!(settings.logging.filter, "debug");

        let config = ServerConfig::from_settings(&settings.server);
        assert_eq!(config.port, 7777);
        assert_eq!(config.max_connections, 3);
    }
}
