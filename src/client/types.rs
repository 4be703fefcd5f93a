//! Wire types shared between the backend client and the sync components
//!
//! These mirror the backend's JSON payloads. The backend is the source of
//! truth for every field here; the client only ever holds cached copies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle status of a conversation as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    /// Conversation accepts new messages
    Active,
    /// Conversation has been ended and is read-only
    Ended,
}

impl ConversationStatus {
    /// Lowercase wire representation, also used by the local search filter
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Active => "active",
            ConversationStatus::Ended => "ended",
        }
    }
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The human user
    User,
    /// The AI assistant
    Ai,
}

/// A single chat message
///
/// `id` is absent until the backend assigns one; its presence is the sole
/// signal that the message is durably persisted. The client creates
/// provisional copies at send time, but only server-confirmed messages are
/// ever appended to the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Server-assigned identifier; `None` for provisional messages
    #[serde(default)]
    pub id: Option<u64>,

    /// Identifier of the owning conversation
    #[serde(rename = "conversation", alias = "conversation_id")]
    pub conversation_id: ConversationId,

    /// Message author
    pub sender: Sender,

    /// Message text
    pub content: String,

    /// Server-side timestamp
    pub timestamp: DateTime<Utc>,

    /// Emoji reaction counts, when any exist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactions: Option<HashMap<String, u32>>,

    /// Whether the user bookmarked this message
    #[serde(
        default,
        rename = "is_bookmarked",
        skip_serializing_if = "Option::is_none"
    )]
    pub bookmarked: Option<bool>,
}

impl Message {
    /// Returns true once the backend has assigned a durable identifier
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

/// Opaque stable conversation identifier
///
/// The backend currently uses integral ids; the client treats them as
/// opaque and only ever compares them for equality.
pub type ConversationId = u64;

/// A conversation, owned by the backend and cached read-through here
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Opaque stable identifier
    pub id: ConversationId,

    /// Conversation title
    pub title: String,

    /// Lifecycle status
    pub status: ConversationStatus,

    /// When the conversation started
    #[serde(rename = "start_timestamp")]
    pub start_time: DateTime<Utc>,

    /// When the conversation ended, if it has
    #[serde(rename = "end_timestamp", default)]
    pub end_time: Option<DateTime<Utc>>,

    /// AI-generated summary, present once the conversation has ended
    #[serde(rename = "ai_summary", default)]
    pub summary: Option<String>,

    /// Topic tags; treated as a set (order and duplicates are ignored)
    #[serde(default)]
    pub topics: Vec<String>,

    /// Number of messages the backend reports for this conversation
    #[serde(rename = "message_count", default)]
    pub message_count: usize,

    /// Total duration in seconds, if the backend computed one
    #[serde(rename = "duration", default)]
    pub duration_seconds: Option<u64>,

    /// Full message list; only present on detail fetches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
}

/// Response payload for a successful send
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    /// The persisted copy of the user's message
    pub user_message: Message,
    /// The AI's reply
    pub ai_message: Message,
}

/// Response payload for ending a conversation
///
/// The acknowledgement must carry a generated summary; the lifecycle
/// component treats a missing one as a contract violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndConversationResponse {
    /// The conversation, now in `ended` status
    pub conversation: Conversation,
    /// The generated summary
    pub summary: String,
}

/// A configured AI provider as reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Stable provider identifier (e.g. `openai`, `lmstudio`)
    pub id: String,
    /// Human-readable display name
    pub name: String,
    /// Default model for this provider, when the backend reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Backend-reported provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderListing {
    /// All configured providers, in backend order
    pub providers: Vec<ProviderInfo>,
    /// The provider the backend currently considers active
    #[serde(rename = "current_provider", default)]
    pub current_provider: String,
}

/// Document formats the backend can export a conversation into
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    /// Structured JSON dump
    Json,
    /// Human-readable Markdown transcript
    Markdown,
    /// Rendered PDF document
    Pdf,
}

impl ExportFormat {
    /// Wire representation used in the export URL path
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Markdown => "markdown",
            ExportFormat::Pdf => "pdf",
        }
    }

    /// Conventional file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Markdown => "md",
            ExportFormat::Pdf => "pdf",
        }
    }
}

/// Response payload for creating a share link
///
/// `expires_at` is kept verbatim: the backend emits it without a timezone
/// offset, so it is displayed rather than parsed.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareLink {
    /// Opaque token identifying the share
    pub share_token: String,
    /// Relative URL serving the shared conversation
    pub share_url: String,
    /// Expiry timestamp as reported by the backend
    pub expires_at: String,
}

/// Conversation header as served through a share link
///
/// A trimmed-down projection: share payloads use `summary` instead of
/// `ai_summary` and omit topics and counts.
#[derive(Debug, Clone, Deserialize)]
pub struct SharedConversationHeader {
    /// Conversation identifier
    pub id: ConversationId,
    /// Conversation title
    pub title: String,
    /// Lifecycle status
    pub status: ConversationStatus,
    /// When the conversation started
    #[serde(rename = "start_timestamp")]
    pub start_time: DateTime<Utc>,
    /// When the conversation ended, if it has
    #[serde(rename = "end_timestamp", default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Generated summary, when present
    #[serde(default)]
    pub summary: Option<String>,
}

/// A message as served through a share link
#[derive(Debug, Clone, Deserialize)]
pub struct SharedMessage {
    /// Message identifier
    pub id: u64,
    /// Message author
    pub sender: Sender,
    /// Message text
    pub content: String,
    /// Server-side timestamp
    pub timestamp: DateTime<Utc>,
}

/// A conversation retrieved through a share token
#[derive(Debug, Clone, Deserialize)]
pub struct SharedConversation {
    /// Conversation header
    pub conversation: SharedConversationHeader,
    /// Full message list in timestamp order
    pub messages: Vec<SharedMessage>,
}

/// Per-sender message counts in a stats report
#[derive(Debug, Clone, Deserialize)]
pub struct MessageCounts {
    /// All messages
    pub total: u64,
    /// Messages from the user
    pub user: u64,
    /// Messages from the AI
    pub ai: u64,
}

/// Per-sender word counts in a stats report
#[derive(Debug, Clone, Deserialize)]
pub struct WordCounts {
    /// Words written by the user
    pub user: u64,
    /// Words written by the AI
    pub ai: u64,
    /// Combined total
    pub total: u64,
}

/// Analytics report for one conversation
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationStats {
    /// Conversation identifier
    pub conversation_id: ConversationId,
    /// Conversation title
    pub title: String,
    /// Total duration in seconds, if computed
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    /// Message counts by sender
    pub message_counts: MessageCounts,
    /// Word counts by sender
    pub word_counts: WordCounts,
    /// Number of bookmarked messages
    pub bookmarked_messages: u64,
    /// Aggregated reaction counts across all messages
    #[serde(default)]
    pub reactions: HashMap<String, u32>,
    /// Lifecycle status at report time
    pub status: ConversationStatus,
}

/// Machine-readable error payload carried by non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Error message
    #[serde(default)]
    pub error: String,
}
