//! Configuration management for ChatSync
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{ChatSyncError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for ChatSync
///
/// This structure holds all configuration needed by the client, including
/// backend connection settings, reconciliation timing, and search tuning.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend connection configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Message sync and reconciliation configuration
    #[serde(default)]
    pub sync: SyncConfig,

    /// Search pipeline configuration
    #[serde(default)]
    pub search: SearchConfig,
}

/// Backend connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend API (e.g. `http://localhost:8000/api`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User identifier sent with every request
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_user_id() -> String {
    "default_user".to_string()
}

fn default_timeout() -> u64 {
    60
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_id: default_user_id(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Message sync and reconciliation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Delay before the post-send reconciliation re-fetch (milliseconds)
    ///
    /// After a successful send the coordinator waits this long, then
    /// re-fetches the conversation and compares message counts. The delay
    /// gives the backend time to commit before we verify.
    #[serde(default = "default_reconcile_delay")]
    pub reconcile_delay_ms: u64,
}

fn default_reconcile_delay() -> u64 {
    1500
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reconcile_delay_ms: default_reconcile_delay(),
        }
    }
}

/// Search pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Quiet period before a semantic search is issued (milliseconds)
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,

    /// Minimum query length (in characters) for the semantic stage
    #[serde(default = "default_min_semantic_chars")]
    pub min_semantic_chars: usize,
}

fn default_debounce() -> u64 {
    400
}

fn default_min_semantic_chars() -> usize {
    3
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce(),
            min_semantic_chars: default_min_semantic_chars(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file with environment overrides
    ///
    /// Missing files fall back to defaults so the CLI works out of the box
    /// against a local backend. The `CHATSYNC_BACKEND_URL` environment
    /// variable, when set, overrides the configured base URL.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_yaml::from_str(&contents).map_err(ChatSyncError::Yaml)?
        } else {
            tracing::debug!("Config file {} not found, using defaults", path.display());
            Config::default()
        };

        if let Ok(url) = std::env::var("CHATSYNC_BACKEND_URL") {
            if !url.trim().is_empty() {
                config.backend.base_url = url;
            }
        }

        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any setting is out of its valid range
    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            return Err(ChatSyncError::Config("backend.base_url must not be empty".into()).into());
        }
        url::Url::parse(&self.backend.base_url).map_err(|e| {
            ChatSyncError::Config(format!(
                "backend.base_url is not a valid URL: {}",
                e
            ))
        })?;
        if self.backend.user_id.trim().is_empty() {
            return Err(ChatSyncError::Config("backend.user_id must not be empty".into()).into());
        }
        if self.backend.timeout_seconds == 0 {
            return Err(
                ChatSyncError::Config("backend.timeout_seconds must be positive".into()).into(),
            );
        }
        if self.search.min_semantic_chars == 0 {
            return Err(ChatSyncError::Config(
                "search.min_semantic_chars must be at least 1".into(),
            )
            .into());
        }
        Ok(())
    }
}
