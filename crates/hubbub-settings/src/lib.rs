//! # hubbub-settings
//!
//! Configuration management with layered sources for the hubbub server.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`HubbubSettings::default()`]
//! 2. **User file** — `~/.hubbub/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `HUBBUB_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
