//! Centralized application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | App data | `~/Library/Application Support/waqt/` | `~/.local/share/waqt/` |
//! | Config | `~/Library/Application Support/waqt/` | `~/.config/waqt/` |
//!
//! # Environment Overrides
//!
//! - `WAQT_DATA_DIR` overrides [`data_dir`]
//! - `WAQT_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Holds the durable engine state and logs.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("WAQT_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("waqt"))
        .unwrap_or_else(|| PathBuf::from("/tmp/waqt-data"))
}

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("WAQT_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("waqt"))
        .unwrap_or_else(|| PathBuf::from("/tmp/waqt-config"))
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Durable engine state (`data_dir()/state.json`).
#[must_use]
pub fn state_file() -> PathBuf {
    data_dir().join("state.json")
}

/// Default calendar data file (`data_dir()/calendar.json`).
#[must_use]
pub fn calendar_file() -> PathBuf {
    data_dir().join("calendar.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths_sit_under_their_roots() {
        assert!(logs_dir().starts_with(data_dir()));
        assert!(state_file().starts_with(data_dir()));
        assert!(calendar_file().ends_with("calendar.json"));
        assert!(config_file().starts_with(config_dir()));
    }
}
