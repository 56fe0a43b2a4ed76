//! Configuration loading for the archiver
//!
//! Settings are resolved in order of priority:
//! 1. Command-line overrides (applied by the caller)
//! 2. Runtime environment variables (the developer token only)
//! 3. JSON file (~/.config/archivist/settings.json)
//! 4. Built-in defaults

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::remote::SyncFilter;
use crate::sync::DEFAULT_PACING;

/// Settings filename in the Archivist config directory
const SETTINGS_FILE: &str = "settings.json";

/// Environment variable holding the Evernote developer token
pub const TOKEN_ENV: &str = "EVERNOTE_DEV_TOKEN";

/// Archiver settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Evernote developer token
    pub auth_token: Option<String>,
    /// Talk to sandbox.evernote.com instead of www.evernote.com
    pub sandbox: bool,
    /// Directory where `<version>.json` artifacts are written
    pub data_dir: PathBuf,
    /// Pause between consecutive version fetches
    pub pacing_ms: u64,
    /// Resume point used while the archive is empty
    pub default_floor: i32,
    pub filter: SyncFilter,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auth_token: None,
            sandbox: false,
            data_dir: PathBuf::from("data"),
            pacing_ms: DEFAULT_PACING.as_millis() as u64,
            default_floor: 0,
            filter: SyncFilter::default(),
        }
    }
}

// The token never reaches logs
impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("sandbox", &self.sandbox)
            .field("data_dir", &self.data_dir)
            .field("pacing_ms", &self.pacing_ms)
            .field("default_floor", &self.default_floor)
            .field("filter", &self.filter)
            .finish()
    }
}

impl SyncConfig {
    /// Load settings from the default file (if present) and the environment
    pub fn load() -> Result<Self> {
        let base = if config::config_exists(SETTINGS_FILE) {
            config::load_json(SETTINGS_FILE)?
        } else {
            Self::default()
        };
        Ok(base.with_env())
    }

    /// Load settings from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        config::load_json_file(path)
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse settings JSON")
    }

    /// Apply the token from the environment, if set
    pub fn with_env(self) -> Self {
        self.with_token_override(std::env::var(TOKEN_ENV).ok())
    }

    fn with_token_override(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.auth_token = Some(token);
        }
        self
    }

    /// The developer token, or an error naming where to put one
    pub fn token(&self) -> Result<&str> {
        self.auth_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .with_context(|| {
                format!(
                    "No developer token: set {} or auth_token in {}",
                    TOKEN_ENV,
                    Self::default_settings_path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| SETTINGS_FILE.to_string())
                )
            })
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    /// Get the default settings file path (~/.config/archivist/settings.json)
    pub fn default_settings_path() -> Option<PathBuf> {
        config::config_path(SETTINGS_FILE)
    }

    /// Check if a settings file exists in the default location
    pub fn exists() -> bool {
        config::config_exists(SETTINGS_FILE)
    }

    /// Write these settings to the default settings file
    pub fn save(&self) -> Result<PathBuf> {
        config::save_json(SETTINGS_FILE, self)?;
        Self::default_settings_path().context("Could not determine config directory")
    }

    /// Write these settings to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        config::save_json_file(path, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.pacing(), Duration::from_secs(1));
        assert_eq!(config.default_floor, 0);
        assert!(!config.filter.include_expunged);
        assert!(config.token().is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SyncConfig::from_json(
            r#"{ "auth_token": "S=s1:U=abc", "sandbox": true, "filter": { "include_expunged": true } }"#,
        )
        .unwrap();
        assert_eq!(config.token().unwrap(), "S=s1:U=abc");
        assert!(config.sandbox);
        assert!(config.filter.include_expunged);
        assert!(config.filter.include_notes);
        assert_eq!(config.pacing_ms, 1000);
    }

    #[test]
    fn test_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "data_dir": "/srv/archive", "default_floor": 100 }"#).unwrap();

        let config = SyncConfig::from_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/archive"));
        assert_eq!(config.default_floor, 100);
    }

    #[test]
    fn test_save_to_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let config = SyncConfig {
            pacing_ms: 2500,
            default_floor: 42,
            ..SyncConfig::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(SyncConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_json() {
        assert!(SyncConfig::from_json(r#"{ "pacing_ms": "fast" }"#).is_err());
    }

    #[test]
    fn test_env_token_overrides_file() {
        let config = SyncConfig::from_json(r#"{ "auth_token": "from-file" }"#)
            .unwrap()
            .with_token_override(Some("from-env".to_string()));
        assert_eq!(config.token().unwrap(), "from-env");

        let config = config.with_token_override(Some("  ".to_string()));
        assert_eq!(config.token().unwrap(), "from-env");
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = SyncConfig {
            auth_token: Some("secret-token".to_string()),
            ..SyncConfig::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }
}
