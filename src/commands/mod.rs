/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three top-level command modules:

- `chat`          — Interactive chat session
- `conversations` — List, show, end, delete, and search conversations
- `providers`     — List and select AI providers

These handlers are intentionally small and use the library components:
the session facade, the backend client, and the provider store.
*/

pub mod chat;
pub mod conversations;
pub mod providers;

use crate::client::HttpBackend;
use crate::config::Config;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// Build the production backend client from configuration
///
/// # Errors
///
/// Returns error if HTTP client initialization fails
pub fn build_backend(config: &Config) -> Result<Arc<HttpBackend>> {
    Ok(Arc::new(HttpBackend::new(
        &config.backend.base_url,
        &config.backend.user_id,
        Duration::from_secs(config.backend.timeout_seconds),
    )?))
}
