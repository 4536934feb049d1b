//! Persisted preferences for the pwdkeeper shell.
//!
//! Stored as JSON at an OS-appropriate location. A missing or unreadable file
//! means defaults; command-line flags always take precedence.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pwdkeeper_core::KdfParams;
use serde::{Deserialize, Serialize};

/// Argon2 cost profile used when sealing documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KdfProfile {
    #[default]
    Standard,
    LowMemory,
}

impl KdfProfile {
    pub fn params(self) -> KdfParams {
        match self {
            KdfProfile::Standard => KdfParams::default(),
            KdfProfile::LowMemory => KdfParams::low_memory(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KdfProfile::Standard => "standard",
            KdfProfile::LowMemory => "low-memory",
        }
    }
}

/// Persisted application settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Document opened when `--file` is not given.
    pub default_document: Option<PathBuf>,
    pub kdf_profile: KdfProfile,
}

/// Returns the path to the settings JSON file.
///
/// - macOS / Linux: `~/.config/pwdkeeper/settings.json`
/// - Windows: `%APPDATA%/Pwdkeeper/settings.json`
pub fn settings_file_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("Pwdkeeper").join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("pwdkeeper").join("settings.json")
    }
}

/// Loads settings; returns defaults if the file is missing or corrupt.
pub fn load_settings(path: &Path) -> AppSettings {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("ignoring unreadable settings at {}: {e}", path.display());
            AppSettings::default()
        }),
        Err(_) => AppSettings::default(),
    }
}

/// Saves settings, creating parent directories as needed.
pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create settings directory")?;
    }
    let json = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;
    fs::write(path, json).context("Failed to write settings")?;
    Ok(())
}
