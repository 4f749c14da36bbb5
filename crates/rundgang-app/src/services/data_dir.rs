// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware data directory resolution and config persistence.

use std::path::{Path, PathBuf};

use rundgang_core::config::SessionConfig;
use rundgang_core::error::Result;
use tracing::{debug, info};

pub const CONFIG_FILE: &str = "config.json";

/// Return the application data directory, creating it if needed.
pub fn data_dir() -> Result<PathBuf> {
    let dir = dirs_fallback().join("rundgang");
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Default location of the config file.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(data_dir()?.join(CONFIG_FILE))
}

fn dirs_fallback() -> PathBuf {
    // Try XDG data dir, then fallback to home
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}

/// Load the config at `path`. A missing file yields the defaults; a file
/// that exists but does not parse is an error.
pub fn load_config(path: &Path) -> Result<SessionConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(SessionConfig::default());
    }
    let data = std::fs::read_to_string(path)?;
    SessionConfig::from_json(&data)
}

pub fn persist_config(path: &Path, config: &SessionConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), "config written");
    Ok(())
}
