//! Config command handlers

use std::path::Path;

use anyhow::{bail, Result};

use crate::output::{Output, OutputFormat};
use crate::settings::{load_settings, save_settings, KdfProfile};

/// Show current settings
pub fn show(settings_path: &Path, output: &Output) -> Result<()> {
    let settings = load_settings(settings_path);

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "defaultDocument": settings.default_document,
                    "kdfProfile": settings.kdf_profile.as_str(),
                })
            );
        }
        OutputFormat::Quiet => {
            if let Some(path) = &settings.default_document {
                println!("{}", path.display());
            }
        }
        OutputFormat::Human => {
            println!("Settings:");
            println!(
                "  defaultDocument: {}",
                settings
                    .default_document
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!("  kdfProfile:      {}", settings.kdf_profile.as_str());
            println!();
            println!("Settings file: {}", settings_path.display());
        }
    }

    Ok(())
}

/// Set a settings value
pub fn set(key: &str, value: &str, settings_path: &Path, output: &Output) -> Result<()> {
    let mut settings = load_settings(settings_path);

    match key {
        "defaultDocument" => {
            settings.default_document = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        "kdfProfile" => {
            settings.kdf_profile = match value {
                "standard" => KdfProfile::Standard,
                "low-memory" => KdfProfile::LowMemory,
                other => bail!("Invalid kdfProfile '{other}'. Use 'standard' or 'low-memory'."),
            };
        }
        _ => {
            bail!(
                "Unknown setting: '{}'\n\
                 Valid keys: defaultDocument, kdfProfile",
                key
            );
        }
    }

    save_settings(settings_path, &settings)?;
    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let output = Output::new(OutputFormat::Quiet);

        set("kdfProfile", "low-memory", &path, &output).unwrap();
        set("defaultDocument", "/tmp/vault.pwk", &path, &output).unwrap();

        let loaded = load_settings(&path);
        assert_eq!(loaded.kdf_profile, KdfProfile::LowMemory);
        assert_eq!(loaded.default_document.as_deref(), Some(Path::new("/tmp/vault.pwk")));

        set("defaultDocument", "none", &path, &output).unwrap();
        assert!(load_settings(&path).default_document.is_none());
    }

    #[test]
    fn test_set_rejects_unknown_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let output = Output::new(OutputFormat::Quiet);
        assert!(set("colour", "blue", &path, &output).is_err());
        assert!(set("kdfProfile", "turbo", &path, &output).is_err());
        assert!(!path.exists());
    }
}
