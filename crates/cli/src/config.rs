//! Configuration management for the CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Persisted defaults, overridden by flags and environment
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub api_url: Option<String>,
    /// User id sent with every request
    pub user: Option<String>,
    pub default_format: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        serde_json::from_str(&content).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// `~/.config/thermo/config.json`
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("thermo").join("config.json"))
    }

    /// Flag or environment value first, then the saved value, then the default
    pub fn resolve_api_url(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn resolve_user(&self, flag: Option<String>) -> Result<String> {
        flag.or_else(|| self.user.clone())
            .filter(|u| !u.trim().is_empty())
            .context("No user configured; pass --user, set THERMO_USER or run `thermo config --user <id>`")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thermo").join("config.json");
        let config = Config {
            api_url: Some("http://thermal:9000".to_string()),
            user: Some("alice".to_string()),
            default_format: None,
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_resolution_order() {
        let saved = Config {
            api_url: Some("http://saved:1".to_string()),
            user: Some("saved-user".to_string()),
            default_format: None,
        };
        assert_eq!(saved.resolve_api_url(Some("http://flag:2".to_string())), "http://flag:2");
        assert_eq!(saved.resolve_api_url(None), "http://saved:1");
        assert_eq!(Config::default().resolve_api_url(None), DEFAULT_API_URL);

        assert_eq!(saved.resolve_user(None).unwrap(), "saved-user");
        assert_eq!(saved.resolve_user(Some("bob".to_string())).unwrap(), "bob");
        assert!(Config::default().resolve_user(None).is_err());
    }
}
