//! Backend client for ChatSync
//!
//! The backend is consumed, not implemented, by this crate: everything here
//! is a thin JSON-over-HTTP binding. The [`Backend`] trait is the seam the
//! sync components depend on; [`HttpBackend`] is the production
//! implementation. Non-2xx responses carry a machine-readable
//! `{"error": "..."}` payload which is surfaced as
//! [`ChatSyncError::Api`], except for the distinguishable
//! ended-conversation rejection on send.

pub mod types;

pub use types::{
    ApiErrorBody, Conversation, ConversationId, ConversationStats, ConversationStatus,
    EndConversationResponse, ExportFormat, Message, ProviderInfo, ProviderListing, Sender,
    SendMessageResponse, ShareLink, SharedConversation,
};

use crate::error::{ChatSyncError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Response payload for the bookmark toggle action
#[derive(Debug, Clone, Deserialize)]
pub struct BookmarkResponse {
    /// Id of the affected message
    pub message_id: u64,
    /// New bookmark state
    pub is_bookmarked: bool,
}

/// Response payload for adding a reaction
#[derive(Debug, Clone, Deserialize)]
pub struct ReactionResponse {
    /// Id of the affected message
    pub message_id: u64,
    /// Updated reaction counts
    pub reactions: std::collections::HashMap<String, u32>,
}

/// Operations the client requires from the authoritative backend
///
/// Mirrors the REST surface one-to-one. All methods suspend on I/O and
/// never block the caller's thread.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    /// List the user's conversations (newest first, backend order)
    async fn list_conversations(&self) -> Result<Vec<Conversation>>;

    /// Fetch one conversation including its full message list
    async fn get_conversation(&self, id: ConversationId) -> Result<Conversation>;

    /// Create a new conversation
    async fn create_conversation<'a>(&self, title: Option<&'a str>) -> Result<Conversation>;

    /// End a conversation; the acknowledgement carries a generated summary
    async fn end_conversation(&self, id: ConversationId) -> Result<EndConversationResponse>;

    /// Delete a conversation (204/empty body is a valid success)
    async fn delete_conversation(&self, id: ConversationId) -> Result<()>;

    /// Send a message and receive the persisted user/AI message pair
    ///
    /// Fails with [`ChatSyncError::ConversationEnded`] when the backend
    /// rejects the send because the conversation has ended.
    async fn send_message<'a>(
        &self,
        conversation_id: ConversationId,
        content: &str,
        provider: Option<&'a str>,
        model: Option<&'a str>,
    ) -> Result<SendMessageResponse>;

    /// Search conversations; ranked by relevance when `semantic` is true
    async fn search_conversations(&self, query: &str, semantic: bool)
        -> Result<Vec<Conversation>>;

    /// List configured providers and the backend's current selection
    async fn list_providers(&self) -> Result<ProviderListing>;

    /// Toggle the bookmark flag on a message
    async fn toggle_bookmark(&self, message_id: u64) -> Result<BookmarkResponse>;

    /// Add an emoji reaction to a message
    async fn add_reaction(&self, message_id: u64, reaction: &str) -> Result<ReactionResponse>;

    /// Render a conversation into an exportable document
    async fn export_conversation(
        &self,
        id: ConversationId,
        format: ExportFormat,
    ) -> Result<Vec<u8>>;

    /// Create a time-limited share link for a conversation
    async fn create_share_link(&self, id: ConversationId, expiry_days: u32) -> Result<ShareLink>;

    /// Fetch a conversation through its share token
    async fn get_shared_conversation(&self, token: &str) -> Result<SharedConversation>;

    /// Fetch the analytics report for one conversation
    async fn conversation_stats(&self, id: ConversationId) -> Result<ConversationStats>;
}

/// Listing responses may arrive as a DRF pagination envelope or a bare array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConversationListing {
    Paginated { results: Vec<Conversation> },
    Plain(Vec<Conversation>),
}

impl ConversationListing {
    fn into_vec(self) -> Vec<Conversation> {
        match self {
            ConversationListing::Paginated { results } => results,
            ConversationListing::Plain(items) => items,
        }
    }
}

/// Search responses are wrapped in a `{"results": [...]}` envelope
#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    results: Vec<Conversation>,
}

/// Request body for creating a conversation
#[derive(Debug, Serialize)]
struct CreateConversationRequest<'a> {
    title: &'a str,
    user_id: &'a str,
}

/// Request body for sending a message
#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    conversation_id: ConversationId,
    content: &'a str,
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

/// Request body for adding a reaction
#[derive(Debug, Serialize)]
struct ReactionRequest<'a> {
    reaction: &'a str,
}

/// Request body for creating a share link
#[derive(Debug, Serialize)]
struct ShareLinkRequest {
    expiry_days: u32,
}

/// Production JSON-over-HTTP backend client
pub struct HttpBackend {
    client: Client,
    base_url: String,
    user_id: String,
}

impl HttpBackend {
    /// Create a new backend client
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the backend API, e.g. `http://localhost:8000/api`
    /// * `user_id` - User identifier sent with every request
    /// * `timeout` - Per-request timeout
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(base_url: &str, user_id: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("chatsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChatSyncError::Config(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Initialized backend client: base_url={}", base_url);

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id: user_id.to_string(),
        })
    }

    /// Build a full endpoint URL from a path relative to the API base
    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Turn a non-2xx response into an error, extracting the payload message
    async fn error_from_response(response: reqwest::Response) -> anyhow::Error {
        let status = response.status();
        let body: ApiErrorBody = response.json().await.unwrap_or(ApiErrorBody {
            error: String::new(),
        });
        let message = if body.error.is_empty() {
            format!("HTTP {}", status.as_u16())
        } else {
            body.error
        };
        ChatSyncError::Api {
            status: status.as_u16(),
            message,
        }
        .into()
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let url = self.endpoint("conversations/");
        tracing::debug!("Listing conversations: {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("user_id", self.user_id.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let listing: ConversationListing = response.json().await?;
        Ok(listing.into_vec())
    }

    async fn get_conversation(&self, id: ConversationId) -> Result<Conversation> {
        let url = self.endpoint(&format!("conversations/{}/", id));
        tracing::debug!("Fetching conversation {}", id);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    async fn create_conversation<'a>(&self, title: Option<&'a str>) -> Result<Conversation> {
        let url = self.endpoint("conversations/");
        let body = CreateConversationRequest {
            title: title.unwrap_or("New Conversation"),
            user_id: &self.user_id,
        };
        tracing::debug!("Creating conversation: title={}", body.title);

        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    async fn end_conversation(&self, id: ConversationId) -> Result<EndConversationResponse> {
        let url = self.endpoint(&format!("conversations/{}/end/", id));
        tracing::debug!("Ending conversation {}", id);

        let response = self.client.post(&url).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    async fn delete_conversation(&self, id: ConversationId) -> Result<()> {
        let url = self.endpoint(&format!("conversations/{}/", id));
        tracing::debug!("Deleting conversation {}", id);

        let response = self.client.delete(&url).send().await?;

        // 204/empty body is a valid delete success; no payload is read.
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::error_from_response(response).await)
    }

    async fn send_message<'a>(
        &self,
        conversation_id: ConversationId,
        content: &str,
        provider: Option<&'a str>,
        model: Option<&'a str>,
    ) -> Result<SendMessageResponse> {
        let url = self.endpoint("messages/send/");
        let body = SendMessageRequest {
            conversation_id,
            content,
            user_id: &self.user_id,
            provider,
            model,
        };
        tracing::debug!(
            "Sending message to conversation {} (provider={:?})",
            conversation_id,
            provider
        );

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let payload: ApiErrorBody = response.json().await.unwrap_or(ApiErrorBody {
                error: String::new(),
            });

            // The backend signals a lifecycle conflict with a 4xx whose
            // payload names the ended conversation.
            if status.is_client_error()
                && payload.error.to_lowercase().contains("ended conversation")
            {
                tracing::warn!("Send rejected: conversation {} has ended", conversation_id);
                return Err(ChatSyncError::ConversationEnded(conversation_id.to_string()).into());
            }

            let message = if payload.error.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                payload.error
            };
            return Err(ChatSyncError::Api {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        Ok(response.json().await?)
    }

    async fn search_conversations(
        &self,
        query: &str,
        semantic: bool,
    ) -> Result<Vec<Conversation>> {
        let url = self.endpoint("conversations/search/");
        tracing::debug!("Searching conversations: q={:?} semantic={}", query, semantic);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("semantic", if semantic { "true" } else { "false" }),
                ("user_id", self.user_id.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let envelope: SearchEnvelope = response.json().await?;
        Ok(envelope.results)
    }

    async fn list_providers(&self) -> Result<ProviderListing> {
        let url = self.endpoint("settings/ai/providers/");
        tracing::debug!("Listing configured providers");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    async fn toggle_bookmark(&self, message_id: u64) -> Result<BookmarkResponse> {
        let url = self.endpoint(&format!("messages/{}/bookmark/", message_id));
        let response = self.client.post(&url).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    async fn add_reaction(&self, message_id: u64, reaction: &str) -> Result<ReactionResponse> {
        let url = self.endpoint(&format!("messages/{}/react/", message_id));
        let body = ReactionRequest { reaction };
        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    async fn export_conversation(
        &self,
        id: ConversationId,
        format: ExportFormat,
    ) -> Result<Vec<u8>> {
        let url = self.endpoint(&format!("conversations/{}/export/{}/", id, format.as_str()));
        tracing::debug!("Exporting conversation {} as {}", id, format.as_str());

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        // The body is an opaque document (PDF exports are binary).
        Ok(response.bytes().await?.to_vec())
    }

    async fn create_share_link(&self, id: ConversationId, expiry_days: u32) -> Result<ShareLink> {
        let url = self.endpoint(&format!("conversations/{}/share/", id));
        let body = ShareLinkRequest { expiry_days };
        tracing::debug!("Creating share link for conversation {} ({} days)", id, expiry_days);

        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    async fn get_shared_conversation(&self, token: &str) -> Result<SharedConversation> {
        let url = self.endpoint(&format!("shared/{}/", token));
        tracing::debug!("Fetching shared conversation");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    async fn conversation_stats(&self, id: ConversationId) -> Result<ConversationStats> {
        let url = self.endpoint(&format!("conversations/{}/stats/", id));
        tracing::debug!("Fetching stats for conversation {}", id);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(response.json().await?)
    }
}
