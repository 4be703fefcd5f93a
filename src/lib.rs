//! ChatSync - conversational AI client library
//!
//! This library keeps a client's cached view of conversations, messages,
//! and provider settings consistent with an authoritative chat backend.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `client`: Backend REST client and wire types
//! - `provider`: Provider resolution and the persisted override store
//! - `lifecycle`: Conversation lifecycle state machine and send gating
//! - `sync`: Optimistic message delivery with delayed reconciliation
//! - `search`: Debounced two-source search and the merge rule
//! - `session`: Facade wiring the components into one chat session
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use chatsync::client::HttpBackend;
//! use chatsync::provider::OverrideStore;
//! use chatsync::{ChatSession, Config};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml")?;
//!     config.validate()?;
//!
//!     let backend = Arc::new(HttpBackend::new(
//!         &config.backend.base_url,
//!         &config.backend.user_id,
//!         Duration::from_secs(config.backend.timeout_seconds),
//!     )?);
//!     let mut session = ChatSession::new(backend, &config, OverrideStore::new()?);
//!     session.refresh_providers().await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod provider;
pub mod search;
pub mod session;
pub mod sync;

// Re-export commonly used types
pub use config::Config;
pub use error::{ChatSyncError, Result};
pub use lifecycle::{ConversationLifecycle, LifecycleState, SendGate};
pub use provider::{resolve_provider, OverrideStore, ProviderSelection};
pub use search::{local_filter, merge_results, SearchMerger, SearchResults, SearchStage};
pub use session::{ChatSession, SessionSend};
pub use sync::{MessageSyncCoordinator, ReconcileOutcome, SendFailure, SendFailureKind, SendOutcome};

#[cfg(test)]
pub mod test_utils;
