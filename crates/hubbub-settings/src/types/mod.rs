//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` to match the JSON wire
//! format of the browser frontend. Each type implements [`Default`] with
//! production default values. `#[serde(default)]` allows partial JSON —
//! missing fields get their default value during deserialization.

mod logging;
mod server;

pub use logging::*;
pub use server::*;

use serde::{Deserialize, Serialize};

/// Root settings type for the hubbub server.
///
/// Loaded from `~/.hubbub/settings.json` with defaults applied for missing
/// fields. Environment variables can override specific values.
///
/// # JSON Format
///
/// All field names are camelCase. Example:
///
/// ```json
/// {
///   "version": "0.1.0",
///   "server": { "port": 9090, "publicDir": "./public" }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HubbubSettings {
    /// Settings schema version.
    pub version: String,
    /// Server network and hub runtime settings.
    pub server: ServerSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for HubbubSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            server: ServerSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_version() {
        let settings = HubbubSettings::default();
        assert_eq!(settings.version, "0.1.0");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: HubbubSettings =
            serde_json::from_str(r#"{"server":{"port":9090}}"#).unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.server.host, ServerSettings::default().host);
        assert_eq!(settings.logging.filter, LoggingSettings::default().filter);
    }

    #[test]
    fn serializes_camel_case() {
        let settings = HubbubSettings::default();
        let value = serde_json::to_value(&settings).unwrap();
        assert!(value["server"].get("publicDir").is_some());
        assert!(value["server"].get("public_dir").is_none());
    }

    #[test]
    fn serde_roundtrip() {
        let settings = HubbubSettings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let back: HubbubSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.server.port, settings.server.port);
        assert_eq!(back.logging.filter, settings.logging.filter);
    }
}
