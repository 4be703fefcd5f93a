//! Shared helpers for integration tests
//!
//! JSON payload builders matching the backend wire format, plus
//! constructors for clients and sessions pointed at a wiremock server.

#![allow(dead_code)]

use chatsync::client::HttpBackend;
use chatsync::provider::OverrideStore;
use chatsync::{ChatSession, Config};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Configuration with timings suited to integration tests
pub fn test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.backend.base_url = base_url.to_string();
    config.backend.user_id = "test_user".to_string();
    config.backend.timeout_seconds = 5;
    config.sync.reconcile_delay_ms = 25;
    config.search.debounce_ms = 25;
    config.search.min_semantic_chars = 3;
    config
}

/// An `HttpBackend` pointed at the given wiremock base URL
pub fn backend(base_url: &str) -> Arc<HttpBackend> {
    Arc::new(
        HttpBackend::new(base_url, "test_user", Duration::from_secs(5))
            .expect("backend client should build"),
    )
}

/// A `ChatSession` over an `HttpBackend`, with the override store in `dir`
pub fn session(base_url: &str, dir: &Path) -> ChatSession {
    let store =
        OverrideStore::new_with_path(dir.join("override.json")).expect("override store path");
    ChatSession::new(backend(base_url), &test_config(base_url), store)
}

/// Conversation payload in backend wire format
pub fn conversation_json(id: u64, title: &str, status: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "status": status,
        "start_timestamp": "2025-03-01T10:00:00Z",
        "message_count": 0,
        "topics": [],
    })
}

/// Conversation payload carrying an inline message list
pub fn conversation_with_messages_json(id: u64, status: &str, messages: Vec<Value>) -> Value {
    json!({
        "id": id,
        "title": format!("Conversation {}", id),
        "status": status,
        "start_timestamp": "2025-03-01T10:00:00Z",
        "message_count": messages.len(),
        "topics": [],
        "messages": messages,
    })
}

/// Message payload in backend wire format
pub fn message_json(id: u64, conversation_id: u64, sender: &str, content: &str) -> Value {
    json!({
        "id": id,
        "conversation": conversation_id,
        "sender": sender,
        "content": content,
        "timestamp": "2025-03-01T12:00:00Z",
    })
}

/// Successful send response: persisted user message plus AI reply
pub fn send_response_json(conversation_id: u64, user_id: u64, ai_id: u64, text: &str) -> Value {
    json!({
        "user_message": message_json(user_id, conversation_id, "user", text),
        "ai_message": message_json(ai_id, conversation_id, "ai", &format!("Re: {}", text)),
    })
}

/// Provider listing payload
pub fn provider_listing_json(ids: &[&str], current: &str) -> Value {
    json!({
        "providers": ids
            .iter()
            .map(|id| json!({"id": id, "name": id.to_uppercase()}))
            .collect::<Vec<_>>(),
        "current_provider": current,
    })
}
