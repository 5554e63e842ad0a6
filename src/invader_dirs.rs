//! Application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | App data | `~/Library/Application Support/invader/` | `~/.local/share/invader/` |
//! | Config | `~/Library/Application Support/invader/` | `~/.config/invader/` |
//!
//! # Environment Overrides
//!
//! - `INVADER_DATA_DIR` overrides [`data_dir`]
//! - `INVADER_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Holds the persisted session identifier store and logs.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("INVADER_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("invader"))
        .unwrap_or_else(|| PathBuf::from("/tmp/invader-data"))
}

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("INVADER_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("invader"))
        .unwrap_or_else(|| PathBuf::from("/tmp/invader-config"))
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Session key-value store (`data_dir()/session.json`).
#[must_use]
pub fn session_store_file() -> PathBuf {
    data_dir().join("session.json")
}
