//! AI provider resolution and the persisted override store
//!
//! Which provider a send should use comes from three ranked sources: a
//! client-persisted user override, the backend's reported current provider,
//! and the first configured provider as a fallback. Resolution is a pure
//! function over those inputs; [`OverrideStore`] handles persistence and
//! publishes an invalidation signal whenever the override changes so active
//! consumers re-resolve instead of polling.

use crate::client::types::ProviderInfo;
use crate::error::{ChatSyncError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::watch;

/// A user's provider choice: provider id plus an optional model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSelection {
    /// Stable provider identifier
    pub provider_id: String,
    /// Model to request from that provider, when the user picked one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ProviderSelection {
    /// Create a selection for a provider with no explicit model
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            model: None,
        }
    }

    /// Create a selection with an explicit model
    pub fn with_model(provider_id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            model: Some(model.into()),
        }
    }
}

/// Resolve which provider a send operation should use
///
/// Precedence, first match wins:
/// 1. the saved override, if its provider is in `configured`
/// 2. the backend's current provider, if it is in `configured`
/// 3. the first entry of `configured`
/// 4. `None` when `configured` is empty — sending must be disabled
///
/// Returning `None` is a valid terminal state, not an error; callers
/// surface it as a configuration warning.
///
/// # Examples
///
/// ```
/// use chatsync::client::types::ProviderInfo;
/// use chatsync::provider::{resolve_provider, ProviderSelection};
///
/// let configured = vec![
///     ProviderInfo { id: "openai".into(), name: "OpenAI".into(), model: None },
///     ProviderInfo { id: "lmstudio".into(), name: "LM Studio".into(), model: None },
/// ];
///
/// // Override wins over the backend's current provider.
/// let saved = ProviderSelection::new("lmstudio");
/// let resolved = resolve_provider(&configured, Some(&saved), Some("openai")).unwrap();
/// assert_eq!(resolved.provider_id, "lmstudio");
///
/// // An empty configured list disables sending.
/// assert!(resolve_provider(&[], Some(&saved), Some("openai")).is_none());
/// ```
pub fn resolve_provider(
    configured: &[ProviderInfo],
    saved_override: Option<&ProviderSelection>,
    backend_current: Option<&str>,
) -> Option<ProviderSelection> {
    let is_configured = |id: &str| configured.iter().any(|p| p.id == id);

    if let Some(saved) = saved_override {
        if is_configured(&saved.provider_id) {
            return Some(saved.clone());
        }
        tracing::debug!(
            "Saved override {} is not configured, falling through",
            saved.provider_id
        );
    }

    if let Some(current) = backend_current {
        if !current.is_empty() && is_configured(current) {
            return Some(ProviderSelection::new(current));
        }
    }

    configured.first().map(|p| ProviderSelection::new(&p.id))
}

/// Persisted provider override with cross-context invalidation
///
/// The override survives restarts as a small JSON file under the platform
/// data directory. Every write or clear bumps a generation counter on a
/// watch channel; consumers holding a [`watch::Receiver`] re-resolve when
/// it changes rather than re-reading the file on a timer.
pub struct OverrideStore {
    path: PathBuf,
    changed_tx: watch::Sender<u64>,
}

impl OverrideStore {
    /// Create a store backed by the platform data directory
    ///
    /// # Errors
    ///
    /// Returns error if the data directory cannot be determined or created
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("io", "chatsync", "chatsync").ok_or_else(|| {
            ChatSyncError::OverrideStore("Could not determine data directory".into())
        })?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .map_err(|e| ChatSyncError::OverrideStore(e.to_string()))?;

        Ok(Self::at_path(data_dir.join("provider_override.json")))
    }

    /// Create a store backed by an explicit file path
    ///
    /// Primarily useful for tests where the platform data directory is
    /// not desirable.
    pub fn new_with_path<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ChatSyncError::OverrideStore(e.to_string()))?;
        }
        Ok(Self::at_path(path))
    }

    fn at_path(path: PathBuf) -> Self {
        let (changed_tx, _) = watch::channel(0);
        Self { path, changed_tx }
    }

    /// Load the persisted override, if any
    ///
    /// A missing file means no override. A corrupt file is treated the
    /// same way, with a warning, so a bad write can never wedge sending.
    pub fn load(&self) -> Option<ProviderSelection> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(selection) => Some(selection),
            Err(e) => {
                tracing::warn!("Ignoring corrupt provider override file: {}", e);
                None
            }
        }
    }

    /// Persist a new override and publish the invalidation signal
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn save(&self, selection: &ProviderSelection) -> Result<()> {
        let contents = serde_json::to_string_pretty(selection)?;
        std::fs::write(&self.path, contents)
            .map_err(|e| ChatSyncError::OverrideStore(e.to_string()))?;
        tracing::info!("Saved provider override: {}", selection.provider_id);
        self.publish();
        Ok(())
    }

    /// Remove the persisted override and publish the invalidation signal
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ChatSyncError::OverrideStore(e.to_string()).into()),
        }
        self.publish();
        Ok(())
    }

    /// Subscribe to override-change notifications
    ///
    /// The receiver's value is a generation counter; its actual value is
    /// meaningless beyond inequality with the previously observed one.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed_tx.subscribe()
    }

    /// Publish a change notification (also used for out-of-band changes,
    /// e.g. a settings flow that wrote the file through another store)
    pub fn publish(&self) {
        self.changed_tx.send_modify(|generation| *generation += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn providers(ids: &[&str]) -> Vec<ProviderInfo> {
        ids.iter()
            .map(|id| ProviderInfo {
                id: id.to_string(),
                name: id.to_uppercase(),
                model: None,
            })
            .collect()
    }

    #[test]
    fn test_override_wins_when_configured() {
        let configured = providers(&["openai", "anthropic", "lmstudio"]);
        let saved = ProviderSelection::with_model("anthropic", "claude-3-haiku");

        let resolved = resolve_provider(&configured, Some(&saved), Some("openai")).unwrap();
        assert_eq!(resolved.provider_id, "anthropic");
        assert_eq!(resolved.model.as_deref(), Some("claude-3-haiku"));
    }

    #[test]
    fn test_unconfigured_override_falls_through_to_current() {
        let configured = providers(&["openai", "lmstudio"]);
        let saved = ProviderSelection::new("anthropic");

        let resolved = resolve_provider(&configured, Some(&saved), Some("lmstudio")).unwrap();
        assert_eq!(resolved.provider_id, "lmstudio");
        assert!(resolved.model.is_none());
    }

    #[test]
    fn test_backend_current_used_when_no_override() {
        let configured = providers(&["openai", "lmstudio"]);
        let resolved = resolve_provider(&configured, None, Some("lmstudio")).unwrap();
        assert_eq!(resolved.provider_id, "lmstudio");
    }

    #[test]
    fn test_unconfigured_current_falls_through_to_first() {
        let configured = providers(&["openai", "lmstudio"]);
        let resolved = resolve_provider(&configured, None, Some("google")).unwrap();
        assert_eq!(resolved.provider_id, "openai");
    }

    #[test]
    fn test_empty_current_falls_through_to_first() {
        let configured = providers(&["openai"]);
        let resolved = resolve_provider(&configured, None, Some("")).unwrap();
        assert_eq!(resolved.provider_id, "openai");
    }

    #[test]
    fn test_empty_configured_list_resolves_to_none() {
        let saved = ProviderSelection::new("openai");
        assert!(resolve_provider(&[], Some(&saved), Some("openai")).is_none());
        assert!(resolve_provider(&[], None, None).is_none());
    }

    #[test]
    fn test_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = OverrideStore::new_with_path(dir.path().join("override.json")).unwrap();

        assert!(store.load().is_none());

        let selection = ProviderSelection::with_model("lmstudio", "qwen2.5");
        store.save(&selection).unwrap();
        assert_eq!(store.load(), Some(selection));

        store.clear().unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_clear_without_existing_file_is_ok() {
        let dir = TempDir::new().unwrap();
        let store = OverrideStore::new_with_path(dir.path().join("override.json")).unwrap();
        assert!(store.clear().is_ok());
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("override.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = OverrideStore::new_with_path(&path).unwrap();
        assert!(store.load().is_none());
    }

    #[tokio::test]
    async fn test_save_publishes_invalidation() {
        let dir = TempDir::new().unwrap();
        let store = OverrideStore::new_with_path(dir.path().join("override.json")).unwrap();

        let mut rx = store.subscribe();
        let initial = *rx.borrow_and_update();

        store.save(&ProviderSelection::new("openai")).unwrap();
        rx.changed().await.unwrap();
        assert_ne!(*rx.borrow_and_update(), initial);

        store.clear().unwrap();
        rx.changed().await.unwrap();
    }
}
