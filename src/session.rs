//! Session orchestration across the sync components
//!
//! [`ChatSession`] wires the lifecycle tracker, the send coordinator, the
//! provider resolver, and the search merger into one facade. Each facet of
//! client state still has a single owner (the lifecycle owns status, the
//! coordinator owns the message list, the resolver owns the selection);
//! the session only sequences calls between them and keeps the cached
//! conversation listing that search and the UI read from.

use crate::client::types::{
    Conversation, ConversationId, EndConversationResponse, ProviderInfo,
};
use crate::client::Backend;
use crate::config::Config;
use crate::error::{ChatSyncError, Result};
use crate::lifecycle::{ConversationLifecycle, LifecycleState, SendGate};
use crate::provider::{resolve_provider, OverrideStore, ProviderSelection};
use crate::search::{SearchMerger, SearchResults};
use crate::sync::{MessageSyncCoordinator, SendFailure, SendFailureKind, SendOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Outcome of a session-level send
#[derive(Debug)]
pub enum SessionSend {
    /// The message pair was delivered and appended
    Delivered(SendOutcome),
    /// The conversation has ended; the text is held for fork-and-resend
    HeldForRecovery,
}

/// Facade over the sync components for one user session
pub struct ChatSession {
    backend: Arc<dyn Backend>,
    lifecycle: ConversationLifecycle,
    coordinator: MessageSyncCoordinator,
    search: SearchMerger,
    override_store: OverrideStore,
    conversations: Vec<Conversation>,
    providers: Vec<ProviderInfo>,
    backend_current: Option<String>,
    selection: Option<ProviderSelection>,
}

impl ChatSession {
    /// Create a session from configuration
    ///
    /// # Arguments
    ///
    /// * `backend` - Backend client shared with spawned tasks
    /// * `config` - Timing and threshold configuration
    /// * `override_store` - Persisted provider override storage
    pub fn new(backend: Arc<dyn Backend>, config: &Config, override_store: OverrideStore) -> Self {
        let coordinator = MessageSyncCoordinator::new(
            Arc::clone(&backend),
            Duration::from_millis(config.sync.reconcile_delay_ms),
        );
        let search = SearchMerger::new(
            Arc::clone(&backend),
            Duration::from_millis(config.search.debounce_ms),
            config.search.min_semantic_chars,
        );

        Self {
            backend,
            lifecycle: ConversationLifecycle::new(),
            coordinator,
            search,
            override_store,
            conversations: Vec::new(),
            providers: Vec::new(),
            backend_current: None,
            selection: None,
        }
    }

    // --- provider management ---

    /// Fetch provider configuration and re-resolve the active selection
    ///
    /// Resolving to `None` (no providers configured) is reported, not an
    /// error; sending stays disabled until configuration changes.
    ///
    /// # Errors
    ///
    /// Returns error if the provider listing cannot be fetched
    pub async fn refresh_providers(&mut self) -> Result<Option<&ProviderSelection>> {
        let listing = self.backend.list_providers().await?;
        self.providers = listing.providers;
        self.backend_current = if listing.current_provider.is_empty() {
            None
        } else {
            Some(listing.current_provider)
        };
        self.resolve();
        Ok(self.selection.as_ref())
    }

    /// Re-resolve the selection from cached inputs
    ///
    /// Called after an override-change notification; uses the already
    /// fetched provider listing rather than another round trip.
    pub fn resolve(&mut self) {
        let saved = self.override_store.load();
        self.selection = resolve_provider(
            &self.providers,
            saved.as_ref(),
            self.backend_current.as_deref(),
        );
        match &self.selection {
            Some(selection) => {
                tracing::info!("Active provider: {}", selection.provider_id);
            }
            None => {
                tracing::warn!("No provider available; sending is disabled");
            }
        }
    }

    /// Persist a provider override and make it the active selection
    ///
    /// # Errors
    ///
    /// Returns error if the provider is not configured or the override
    /// cannot be persisted
    pub fn select_provider(&mut self, provider_id: &str, model: Option<String>) -> Result<()> {
        if !self.providers.iter().any(|p| p.id == provider_id) {
            return Err(ChatSyncError::Config(format!(
                "Unknown provider: {} (configured: {})",
                provider_id,
                self.providers
                    .iter()
                    .map(|p| p.id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
            .into());
        }

        let selection = match model {
            Some(model) => ProviderSelection::with_model(provider_id, model),
            None => ProviderSelection::new(provider_id),
        };
        self.override_store.save(&selection)?;
        self.resolve();
        Ok(())
    }

    /// Drop the persisted override, falling back to backend preference
    ///
    /// # Errors
    ///
    /// Returns error if the override file cannot be removed
    pub fn clear_provider_override(&mut self) -> Result<()> {
        self.override_store.clear()?;
        self.resolve();
        Ok(())
    }

    /// The currently resolved provider selection, if any
    pub fn provider(&self) -> Option<&ProviderSelection> {
        self.selection.as_ref()
    }

    /// The configured providers from the last refresh
    pub fn providers(&self) -> &[ProviderInfo] {
        &self.providers
    }

    /// Subscribe to override-change notifications from other contexts
    pub fn override_changes(&self) -> watch::Receiver<u64> {
        self.override_store.subscribe()
    }

    // --- conversation listing ---

    /// Refresh the cached conversation listing from the backend
    ///
    /// # Errors
    ///
    /// Returns error if the listing cannot be fetched
    pub async fn refresh_conversations(&mut self) -> Result<&[Conversation]> {
        self.conversations = self.backend.list_conversations().await?;
        tracing::debug!("Cached {} conversations", self.conversations.len());
        Ok(&self.conversations)
    }

    /// The cached conversation listing
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    // --- lifecycle operations ---

    /// Open a conversation: fetch it, track its status, cache its messages
    ///
    /// # Errors
    ///
    /// Returns error if the conversation cannot be fetched
    pub async fn open(&mut self, id: ConversationId) -> Result<Conversation> {
        let conversation = self.backend.get_conversation(id).await?;
        self.lifecycle.load(id, conversation.status);
        self.coordinator
            .attach(id, conversation.messages.clone().unwrap_or_default());
        Ok(conversation)
    }

    /// Create and open a fresh conversation
    ///
    /// # Errors
    ///
    /// Returns error if creation fails
    pub async fn new_conversation(&mut self, title: Option<&str>) -> Result<ConversationId> {
        let conversation = self.backend.create_conversation(title).await?;
        let id = conversation.id;
        self.lifecycle.activate(id);
        self.coordinator.attach(id, Vec::new());
        self.conversations.insert(0, conversation);
        Ok(id)
    }

    /// Deselect the current conversation
    pub fn close(&mut self) {
        self.lifecycle.reset();
        self.coordinator.detach();
    }

    /// Lifecycle state of the selected conversation
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Id of the selected conversation, if any
    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.lifecycle.conversation_id()
    }

    /// Snapshot of the cached message list
    pub fn messages(&self) -> Vec<crate::client::types::Message> {
        self.coordinator.messages()
    }

    /// The captured text awaiting fork-and-resend, if any
    pub fn held_text(&self) -> Option<&str> {
        self.lifecycle.captured()
    }

    // --- sending ---

    /// Send a message through the lifecycle gate and the coordinator
    ///
    /// A send into an ended conversation never reaches the network: the
    /// text is held and [`SessionSend::HeldForRecovery`] is returned so
    /// the caller can offer fork-and-resend. The same applies when the
    /// backend rejects the send because the conversation ended after our
    /// last read. With no conversation selected, one is created and
    /// becomes the active conversation.
    ///
    /// # Errors
    ///
    /// Returns [`SendFailure`] carrying the attempted text for every
    /// other failure; the cached message list is unchanged
    pub async fn send(&mut self, text: &str) -> std::result::Result<SessionSend, SendFailure> {
        if self.lifecycle.gate_send(text) == SendGate::HeldForRecovery {
            return Ok(SessionSend::HeldForRecovery);
        }

        let target = self.lifecycle.conversation_id();
        match self
            .coordinator
            .send(target, text, self.selection.as_ref())
            .await
        {
            Ok(outcome) => {
                if let Some(conversation) = &outcome.created_conversation {
                    self.lifecycle.activate(conversation.id);
                    // The listing learns about the new conversation right
                    // away so local search can see it before a refresh.
                    self.conversations.insert(0, conversation.clone());
                }
                Ok(SessionSend::Delivered(outcome))
            }
            Err(failure) => {
                if let SendFailureKind::ConversationEnded(_) = failure.kind {
                    // Ended after our last read: flip local state and route
                    // to the same recovery path as the proactive gate.
                    self.lifecycle.mark_ended();
                    self.lifecycle.capture(failure.text);
                    return Ok(SessionSend::HeldForRecovery);
                }
                Err(failure)
            }
        }
    }

    /// Replay the held text into a brand-new conversation
    ///
    /// Returns `Ok(None)` when nothing is held. On failure the text is
    /// re-captured so a later attempt can still recover it.
    ///
    /// # Errors
    ///
    /// Returns [`SendFailure`] if the new conversation cannot be created
    /// or the resend fails
    pub async fn fork_and_resend(
        &mut self,
    ) -> std::result::Result<Option<SendOutcome>, SendFailure> {
        let text = match self.lifecycle.take_captured() {
            Some(text) => text,
            None => return Ok(None),
        };

        tracing::info!("Forking ended conversation: replaying held message");
        self.lifecycle.reset();
        self.coordinator.detach();

        match self
            .coordinator
            .send(None, &text, self.selection.as_ref())
            .await
        {
            Ok(outcome) => {
                self.lifecycle.activate(outcome.conversation_id);
                if let Some(conversation) = &outcome.created_conversation {
                    self.conversations.insert(0, conversation.clone());
                }
                Ok(Some(outcome))
            }
            Err(failure) => {
                self.lifecycle.capture(failure.text.clone());
                Err(failure)
            }
        }
    }

    /// End the selected conversation after backend confirmation
    ///
    /// The local flip to `ended` happens only once the backend has
    /// acknowledged with a generated summary; an acknowledgement without
    /// one is rejected as a contract violation and local state stays
    /// active.
    ///
    /// # Errors
    ///
    /// Returns error if no conversation is selected, the request fails,
    /// or the acknowledgement carries no summary
    pub async fn end(&mut self) -> Result<EndConversationResponse> {
        let id = self
            .lifecycle
            .conversation_id()
            .ok_or_else(|| ChatSyncError::Config("No conversation selected".into()))?;

        let response = self.backend.end_conversation(id).await?;
        if response.summary.trim().is_empty() {
            return Err(ChatSyncError::ContractViolation(
                "end acknowledgement carries no summary".into(),
            )
            .into());
        }

        self.lifecycle.mark_ended();
        if let Some(cached) = self.conversations.iter_mut().find(|c| c.id == id) {
            *cached = response.conversation.clone();
        }
        Ok(response)
    }

    /// Delete a conversation, local listing first
    ///
    /// The listing entry disappears immediately; a backend failure after
    /// that is logged and the next refresh restores the entry if the
    /// delete did not land.
    pub async fn delete(&mut self, id: ConversationId) {
        self.conversations.retain(|c| c.id != id);
        if self.lifecycle.conversation_id() == Some(id) {
            self.close();
        }

        if let Err(e) = self.backend.delete_conversation(id).await {
            tracing::error!("Backend delete for conversation {} failed: {}", id, e);
        }
    }

    // --- search ---

    /// Run the two-source search over the cached listing
    pub fn search(&self, query: &str) {
        self.search.query(query, self.conversations.clone());
    }

    /// Subscribe to search result snapshots
    pub fn search_results(&self) -> watch::Receiver<SearchResults> {
        self.search.subscribe()
    }

    /// The most recent search snapshot
    pub fn current_search(&self) -> SearchResults {
        self.search.current()
    }

    /// Reset search to the unfiltered listing, cancelling any pending
    /// semantic request
    pub fn clear_search(&self) {
        self.search.clear(self.conversations.clone());
    }

    // --- message actions ---

    /// Toggle a message bookmark and apply the confirmed state locally
    ///
    /// # Errors
    ///
    /// Returns error if the backend call fails; the cache is untouched
    pub async fn toggle_bookmark(&mut self, message_id: u64) -> Result<bool> {
        let response = self.backend.toggle_bookmark(message_id).await?;
        self.coordinator
            .apply_bookmark(response.message_id, response.is_bookmarked);
        Ok(response.is_bookmarked)
    }

    /// Add a reaction and apply the confirmed counts locally
    ///
    /// # Errors
    ///
    /// Returns error if the backend call fails; the cache is untouched
    pub async fn add_reaction(&mut self, message_id: u64, reaction: &str) -> Result<()> {
        let response = self.backend.add_reaction(message_id, reaction).await?;
        self.coordinator
            .apply_reactions(response.message_id, response.reactions);
        Ok(())
    }
}
