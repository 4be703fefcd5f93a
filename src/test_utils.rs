//! Shared fixtures for unit tests
//!
//! Builders for wire types with sensible defaults so individual tests only
//! spell out the fields they assert on.

use crate::client::types::{
    Conversation, ConversationId, ConversationStatus, Message, ProviderInfo, ProviderListing,
    SendMessageResponse, Sender,
};
use crate::config::Config;
use chrono::{TimeZone, Utc};

/// A minimal active conversation
pub fn conversation(id: ConversationId) -> Conversation {
    conversation_named(id, &format!("Conversation {}", id))
}

/// An active conversation with an explicit title
pub fn conversation_named(id: ConversationId, title: &str) -> Conversation {
    Conversation {
        id,
        title: title.to_string(),
        status: ConversationStatus::Active,
        start_time: Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(),
        end_time: None,
        summary: None,
        topics: Vec::new(),
        message_count: 0,
        duration_seconds: None,
        messages: None,
    }
}

/// An ended conversation with a summary
pub fn ended_conversation(id: ConversationId) -> Conversation {
    let mut conversation = conversation(id);
    conversation.status = ConversationStatus::Ended;
    conversation.end_time = Some(Utc.with_ymd_and_hms(2025, 3, 1, 11, 0, 0).unwrap());
    conversation.summary = Some("A finished conversation".to_string());
    conversation
}

/// An active conversation carrying `count` persisted messages
pub fn conversation_with_messages(id: ConversationId, count: usize) -> Conversation {
    let mut conversation = conversation(id);
    conversation.message_count = count;
    conversation.messages = Some(
        (0..count)
            .map(|i| {
                let mut message = persisted_message(i as u64 + 1, id, &format!("message {}", i));
                message.sender = if i % 2 == 0 { Sender::User } else { Sender::Ai };
                message
            })
            .collect(),
    );
    conversation
}

/// A message the backend has assigned an id to
pub fn persisted_message(id: u64, conversation_id: ConversationId, content: &str) -> Message {
    Message {
        id: Some(id),
        conversation_id,
        sender: Sender::User,
        content: content.to_string(),
        timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        reactions: None,
        bookmarked: None,
    }
}

/// A successful send response with persisted user and AI messages
pub fn send_response(
    conversation_id: ConversationId,
    user_id: u64,
    ai_id: u64,
    text: &str,
) -> SendMessageResponse {
    let mut ai_message = persisted_message(ai_id, conversation_id, &format!("Re: {}", text));
    ai_message.sender = Sender::Ai;
    SendMessageResponse {
        user_message: persisted_message(user_id, conversation_id, text),
        ai_message,
    }
}

/// A provider listing with the given ids and current provider
pub fn provider_listing(ids: &[&str], current: &str) -> ProviderListing {
    ProviderListing {
        providers: ids
            .iter()
            .map(|id| ProviderInfo {
                id: id.to_string(),
                name: id.to_uppercase(),
                model: None,
            })
            .collect(),
        current_provider: current.to_string(),
    }
}

/// Default configuration with timings suited to tests
///
/// The reconciliation delay is long enough that a scheduled re-fetch
/// never fires inside a test unless the test awaits it explicitly.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.sync.reconcile_delay_ms = 60_000;
    config.search.debounce_ms = 10;
    config
}
