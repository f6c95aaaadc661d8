//! Client configuration
//!
//! Settings are resolved in this order (later wins):
//! 1. Built-in defaults
//! 2. JSON file (~/.config/favorites/client.json)
//! 3. Environment variables (`FAVORITES_API_URL`, `FAVORITES_POLL_INTERVAL_MS`,
//!    `FAVORITES_REQUEST_TIMEOUT_SECS`)

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config filename in the shared config directory
const CLIENT_CONFIG_FILE: &str = "client.json";

const ENV_API_URL: &str = "FAVORITES_API_URL";
const ENV_POLL_INTERVAL_MS: &str = "FAVORITES_POLL_INTERVAL_MS";
const ENV_REQUEST_TIMEOUT_SECS: &str = "FAVORITES_REQUEST_TIMEOUT_SECS";

/// Settings for talking to the favorites backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the backend, without the `/api` prefix
    pub api_url: String,
    /// Period of the background task poll
    pub poll_interval_ms: u64,
    /// Global timeout for a single HTTP request
    pub request_timeout_secs: u64,
    /// Characters of a summary shown before it is truncated
    pub summary_preview_chars: usize,
    /// Re-home children of a deleted folder under its parent
    pub delete_moves_to_parent: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            poll_interval_ms: 5000,
            request_timeout_secs: 10,
            summary_preview_chars: 100,
            delete_moves_to_parent: true,
        }
    }
}

impl ClientConfig {
    /// Load from the default config file (if present), then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let base = if config::config_exists(CLIENT_CONFIG_FILE) {
            config::load_json(CLIENT_CONFIG_FILE)?
        } else {
            Self::default()
        };
        base.with_env_overrides()
    }

    /// Load from a specific JSON file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let base: Self = config::load_json_file(path)?;
        base.with_env_overrides()
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(ms) = lookup(ENV_POLL_INTERVAL_MS) {
            self.poll_interval_ms = ms
                .trim()
                .parse()
                .with_context(|| format!("{} must be an integer, got {:?}", ENV_POLL_INTERVAL_MS, ms))?;
        }
        if let Some(secs) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            self.request_timeout_secs = secs.trim().parse().with_context(|| {
                format!("{} must be an integer, got {:?}", ENV_REQUEST_TIMEOUT_SECS, secs)
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject settings the client cannot run with
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.api_url)
            .with_context(|| format!("Invalid api_url: {}", self.api_url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("api_url must use http or https, got {}", parsed.scheme());
        }
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than zero");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Write this config to the default location, returning the path
    pub fn save(&self) -> Result<PathBuf> {
        config::save_json(CLIENT_CONFIG_FILE, self)
    }

    /// Get the default config file path (~/.config/favorites/client.json)
    pub fn default_config_path() -> Option<PathBuf> {
        config::config_path(CLIENT_CONFIG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ClientConfig::default();
        config.validate().unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.summary_preview_chars, 100);
    }

    #[test]
    fn test_env_overrides() {
        let config = ClientConfig::default()
            .apply_overrides(env(&[
                (ENV_API_URL, "https://favorites.example.com"),
                (ENV_POLL_INTERVAL_MS, "250"),
            ]))
            .unwrap();
        assert_eq!(config.api_url, "https://favorites.example.com");
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.request_timeout_secs, 10);
    }

    #[test]
    fn test_invalid_env_override() {
        let result = ClientConfig::default().apply_overrides(env(&[(ENV_POLL_INTERVAL_MS, "soon")]));
        assert!(result.is_err());

        let result = ClientConfig::default().apply_overrides(env(&[(ENV_API_URL, "ftp://x")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");
        std::fs::write(&path, r#"{ "poll_interval_ms": 1000 }"#).unwrap();

        let config: ClientConfig = config::load_json_file(&path).unwrap();
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.api_url, "http://localhost:8000");
        assert!(config.delete_moves_to_parent);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = ClientConfig {
            poll_interval_ms: 0,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
