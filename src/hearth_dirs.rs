//! Centralized application directory paths for hearth.
//!
//! Single source of truth for all filesystem paths used by the host.
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! # Environment Overrides
//!
//! All roots can be overridden for testing or custom deployments:
//! - `HEARTH_DATA_DIR` — overrides [`data_dir`]
//! - `HEARTH_CONFIG_DIR` — overrides [`config_dir`]
//! - `HEARTH_CACHE_DIR` — overrides [`cache_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Holds persistent host data: the scheduler run-state file and logs.
/// Resolves to `dirs::data_dir()/hearth/` by default.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("HEARTH_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("hearth"))
        .unwrap_or_else(|| PathBuf::from("/tmp/hearth-data"))
}

/// Application config directory.
///
/// Holds `hearth.yml`. Resolves to `dirs::config_dir()/hearth/` by default.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("HEARTH_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("hearth"))
        .unwrap_or_else(|| PathBuf::from("/tmp/hearth-config"))
}

/// Application cache directory.
///
/// Holds the disk-backed content cache: expendable, safe to delete.
/// Resolves to `dirs::cache_dir()/hearth/` by default.
#[must_use]
pub fn cache_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("HEARTH_CACHE_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::cache_dir()
        .map(|d| d.join("hearth"))
        .unwrap_or_else(|| PathBuf::from("/tmp/hearth-cache"))
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Main settings file path (`config_dir()/hearth.yml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("hearth.yml")
}

/// Scheduler run-state file path (`data_dir()/state.json`).
#[must_use]
pub fn state_file() -> PathBuf {
    data_dir().join("state.json")
}
