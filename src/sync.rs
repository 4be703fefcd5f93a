//! Optimistic message delivery with after-the-fact verification
//!
//! The coordinator owns the cached message list for the conversation being
//! observed. A send is optimistic only in the narrow sense that the local
//! list is updated from the send response without waiting for independent
//! confirmation; a short while later a reconciliation re-fetch compares
//! the backend's message count against the expected local count and, on
//! mismatch, replaces the local list wholesale. Local state never wins
//! over backend state. This catches silent persistence failures that
//! return a 200-level response without actually committing.

use crate::client::types::{Conversation, ConversationId, Message, SendMessageResponse};
use crate::client::Backend;
use crate::error::is_conversation_ended;
use crate::provider::ProviderSelection;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Why a send failed
#[derive(Debug, Error)]
pub enum SendFailureKind {
    /// No provider resolved; pre-flight check, nothing reached the network
    #[error("no provider is configured; select a provider before sending")]
    NoProvider,

    /// Creating the conversation for a first send failed
    #[error("failed to create conversation: {0}")]
    CreateFailed(anyhow::Error),

    /// The backend rejected the send because the conversation has ended
    ///
    /// Routed to the fork-and-resend recovery path, never surfaced as a
    /// dead end.
    #[error("conversation {0} has ended")]
    ConversationEnded(ConversationId),

    /// The backend claimed success but a message is missing its id
    ///
    /// Indicates a server-side bug; never retried automatically.
    #[error("backend contract violation: {0}")]
    ContractViolation(String),

    /// Transient network or backend failure; safe to resubmit
    #[error("send failed: {0}")]
    Network(anyhow::Error),
}

/// A failed send, carrying the attempted text back to the caller
///
/// The input text is restored on every failure path so the user can
/// retry (or the recovery flow can replay it); it is never lost.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct SendFailure {
    /// The text the user tried to send
    pub text: String,
    /// The failure classification
    pub kind: SendFailureKind,
}

impl SendFailure {
    fn new(text: impl Into<String>, kind: SendFailureKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}

/// A successful send
#[derive(Debug)]
pub struct SendOutcome {
    /// Conversation the messages were delivered to
    pub conversation_id: ConversationId,
    /// The conversation created for this send, when there was no target
    ///
    /// Carried so callers can insert it into their cached listing without
    /// another fetch.
    pub created_conversation: Option<Conversation>,
    /// The persisted user message
    pub user_message: Message,
    /// The AI reply
    pub ai_message: Message,
}

/// Result of a reconciliation re-fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Backend count matched expectations; local list untouched
    Match,
    /// Counts diverged; local list replaced with the fetched one
    Replaced,
    /// The observed conversation changed before the re-fetch completed
    Skipped,
    /// The re-fetch itself failed; local state left as-is
    FetchFailed,
}

/// Lock a mutex, recovering the guard if a panicking thread poisoned it
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// The cached message list and the conversation it belongs to
#[derive(Debug, Default)]
struct MessageCache {
    conversation_id: Option<ConversationId>,
    messages: Vec<Message>,
}

/// Performs optimistic send plus delayed reconciliation
///
/// Owns the `messages` facet of client state: no other component appends
/// to or replaces the cached message list. Sends are issued one at a time
/// per conversation by the caller; the reconciliation task is the only
/// concurrent writer, and it re-checks that the conversation it was
/// spawned for is still the one being observed before touching anything.
pub struct MessageSyncCoordinator {
    backend: Arc<dyn Backend>,
    cache: Arc<Mutex<MessageCache>>,
    reconcile_delay: Duration,
    reconcile_task: Mutex<Option<JoinHandle<ReconcileOutcome>>>,
}

impl MessageSyncCoordinator {
    /// Create a coordinator with no conversation attached
    ///
    /// # Arguments
    ///
    /// * `backend` - Backend client used for sends and re-fetches
    /// * `reconcile_delay` - How long after a send to verify persistence
    pub fn new(backend: Arc<dyn Backend>, reconcile_delay: Duration) -> Self {
        Self {
            backend,
            cache: Arc::new(Mutex::new(MessageCache::default())),
            reconcile_delay,
            reconcile_task: Mutex::new(None),
        }
    }

    /// Attach to a conversation, replacing the cache with its messages
    pub fn attach(&self, conversation_id: ConversationId, messages: Vec<Message>) {
        let mut cache = lock(&self.cache);
        cache.conversation_id = Some(conversation_id);
        cache.messages = messages;
    }

    /// Detach from the current conversation and clear the cache
    ///
    /// Any in-flight reconciliation for the old conversation becomes a
    /// no-op.
    pub fn detach(&self) {
        let mut cache = lock(&self.cache);
        cache.conversation_id = None;
        cache.messages.clear();
    }

    /// The conversation currently being observed, if any
    pub fn conversation_id(&self) -> Option<ConversationId> {
        lock(&self.cache).conversation_id
    }

    /// Snapshot of the cached message list
    pub fn messages(&self) -> Vec<Message> {
        lock(&self.cache).messages.clone()
    }

    /// Apply a backend-confirmed bookmark state to the cached copy
    pub fn apply_bookmark(&self, message_id: u64, bookmarked: bool) {
        let mut cache = lock(&self.cache);
        if let Some(message) = cache.messages.iter_mut().find(|m| m.id == Some(message_id)) {
            message.bookmarked = Some(bookmarked);
        }
    }

    /// Apply backend-confirmed reaction counts to the cached copy
    pub fn apply_reactions(
        &self,
        message_id: u64,
        reactions: std::collections::HashMap<String, u32>,
    ) {
        let mut cache = lock(&self.cache);
        if let Some(message) = cache.messages.iter_mut().find(|m| m.id == Some(message_id)) {
            message.reactions = Some(reactions);
        }
    }

    /// Send a message, creating a conversation first when needed
    ///
    /// Follows the contract of the send operation end to end:
    /// provider pre-flight, optional conversation creation, durable-id
    /// verification, ordered optimistic append, and scheduling of the
    /// reconciliation re-fetch. Every failure path returns the attempted
    /// text inside [`SendFailure`] and leaves the cached list unchanged.
    ///
    /// # Arguments
    ///
    /// * `conversation_id` - Target conversation; `None` creates one
    /// * `text` - The message text
    /// * `selection` - Resolved provider; `None` aborts pre-flight
    pub async fn send(
        &self,
        conversation_id: Option<ConversationId>,
        text: &str,
        selection: Option<&ProviderSelection>,
    ) -> Result<SendOutcome, SendFailure> {
        // Pre-flight: a missing provider aborts before any network call.
        let selection = match selection {
            Some(selection) => selection,
            None => {
                tracing::warn!("Send aborted: no provider configured");
                return Err(SendFailure::new(text, SendFailureKind::NoProvider));
            }
        };

        let (conversation_id, created) = match conversation_id {
            Some(id) => (id, None),
            None => match self.backend.create_conversation(None).await {
                Ok(conversation) => {
                    tracing::info!("Created conversation {} for first send", conversation.id);
                    (conversation.id, Some(conversation))
                }
                Err(e) => {
                    tracing::error!("Failed to create conversation: {}", e);
                    return Err(SendFailure::new(text, SendFailureKind::CreateFailed(e)));
                }
            },
        };

        let response = match self
            .backend
            .send_message(
                conversation_id,
                text,
                Some(selection.provider_id.as_str()),
                selection.model.as_deref(),
            )
            .await
        {
            Ok(response) => response,
            Err(e) if is_conversation_ended(&e) => {
                return Err(SendFailure::new(
                    text,
                    SendFailureKind::ConversationEnded(conversation_id),
                ));
            }
            Err(e) => {
                tracing::warn!("Send failed, input text restored: {}", e);
                return Err(SendFailure::new(text, SendFailureKind::Network(e)));
            }
        };

        if let Err(violation) = verify_durable(&response) {
            tracing::error!("Rejecting send response: {}", violation);
            return Err(SendFailure::new(
                text,
                SendFailureKind::ContractViolation(violation),
            ));
        }

        let expected_count = {
            let mut cache = lock(&self.cache);
            if cache.conversation_id != Some(conversation_id) {
                // First send into a new or different conversation: the
                // cache follows the send target.
                cache.conversation_id = Some(conversation_id);
                cache.messages.clear();
            }
            // Fixed order: user message immediately followed by AI reply.
            cache.messages.push(response.user_message.clone());
            cache.messages.push(response.ai_message.clone());
            cache.messages.len()
        };

        self.schedule_reconcile(conversation_id, expected_count);

        Ok(SendOutcome {
            conversation_id,
            created_conversation: created,
            user_message: response.user_message,
            ai_message: response.ai_message,
        })
    }

    /// Schedule the fire-and-forget reconciliation re-fetch
    fn schedule_reconcile(&self, conversation_id: ConversationId, expected_count: usize) {
        let backend = Arc::clone(&self.backend);
        let cache = Arc::clone(&self.cache);
        let delay = self.reconcile_delay;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            reconcile(backend, cache, conversation_id, expected_count).await
        });

        *lock(&self.reconcile_task) = Some(handle);
    }

    /// Run a reconciliation re-fetch immediately
    ///
    /// Used by tests to verify reconciliation without waiting out the
    /// configured delay; the spawned task runs the same code.
    pub async fn reconcile_now(
        &self,
        conversation_id: ConversationId,
        expected_count: usize,
    ) -> ReconcileOutcome {
        reconcile(
            Arc::clone(&self.backend),
            Arc::clone(&self.cache),
            conversation_id,
            expected_count,
        )
        .await
    }

    /// Take the handle of the most recently scheduled reconciliation
    ///
    /// Lets callers await completion where determinism matters. The
    /// reconciliation itself never depends on being awaited.
    pub fn take_reconcile_handle(&self) -> Option<JoinHandle<ReconcileOutcome>> {
        lock(&self.reconcile_task).take()
    }
}

/// Check that both messages in a send response carry server ids
fn verify_durable(response: &SendMessageResponse) -> Result<(), String> {
    if response.user_message.id.is_none() {
        return Err("user message missing server-assigned id".to_string());
    }
    if response.ai_message.id.is_none() {
        return Err("AI message missing server-assigned id".to_string());
    }
    Ok(())
}

/// Re-fetch the conversation and replace the local list on count mismatch
///
/// The observed conversation may have changed while the delay elapsed; in
/// that case the result is a no-op. Fetch failures leave local state
/// untouched: the next send schedules a fresh check.
async fn reconcile(
    backend: Arc<dyn Backend>,
    cache: Arc<Mutex<MessageCache>>,
    conversation_id: ConversationId,
    expected_count: usize,
) -> ReconcileOutcome {
    {
        let cache = lock(&cache);
        if cache.conversation_id != Some(conversation_id) {
            tracing::debug!(
                "Skipping reconciliation for conversation {}: no longer observed",
                conversation_id
            );
            return ReconcileOutcome::Skipped;
        }
    }

    let fetched = match backend.get_conversation(conversation_id).await {
        Ok(conversation) => conversation.messages.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(
                "Reconciliation re-fetch failed for conversation {}: {}",
                conversation_id,
                e
            );
            return ReconcileOutcome::FetchFailed;
        }
    };

    let mut cache = lock(&cache);
    if cache.conversation_id != Some(conversation_id) {
        return ReconcileOutcome::Skipped;
    }

    if fetched.len() == expected_count {
        tracing::debug!(
            "Reconciliation for conversation {}: count {} matches",
            conversation_id,
            expected_count
        );
        ReconcileOutcome::Match
    } else {
        tracing::warn!(
            "Reconciliation for conversation {}: expected {} messages, backend has {}; replacing local list",
            conversation_id,
            expected_count,
            fetched.len()
        );
        cache.messages = fetched;
        ReconcileOutcome::Replaced
    }
}
