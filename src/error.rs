//! Error types for ChatSync
//!
//! This module defines all error types used throughout the client,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for ChatSync operations
///
/// This enum encompasses all possible errors that can occur while talking
/// to the backend, resolving provider configuration, and reconciling
/// cached state.
#[derive(Error, Debug)]
pub enum ChatSyncError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend returned a non-2xx response with a machine-readable payload
    #[error("Backend error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the backend
        status: u16,
        /// Error message extracted from the response payload
        message: String,
    },

    /// Send was rejected because the target conversation has ended
    ///
    /// This is kept distinguishable from other API errors because it is
    /// routed to the fork-and-resend recovery path instead of being
    /// surfaced as a dead end.
    #[error("Conversation {0} has ended")]
    ConversationEnded(String),

    /// No AI provider is configured; sending is disabled until one is
    #[error("No AI provider is configured")]
    NoProviderConfigured,

    /// Backend claimed success but violated its contract
    ///
    /// The canonical case is a send response where a message is missing
    /// its server-assigned id. This indicates a server-side bug and is
    /// never retried automatically.
    #[error("Backend contract violation: {0}")]
    ContractViolation(String),

    /// Provider override store errors (read/write of persisted state)
    #[error("Override store error: {0}")]
    OverrideStore(String),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatSyncError {
    /// Returns true if this error is the distinguishable ended-conversation
    /// rejection from the backend.
    pub fn is_conversation_ended(&self) -> bool {
        matches!(self, ChatSyncError::ConversationEnded(_))
    }
}

/// Result type alias for ChatSync operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

/// Returns true if an `anyhow::Error` wraps an ended-conversation rejection.
///
/// Callers that receive boxed errors from the backend client use this to
/// decide whether to route into the recovery flow.
pub fn is_conversation_ended(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ChatSyncError>()
        .map(ChatSyncError::is_conversation_ended)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = ChatSyncError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_api_error_display() {
        let error = ChatSyncError::Api {
            status: 404,
            message: "Conversation not found".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Backend error (404): Conversation not found"
        );
    }

    #[test]
    fn test_conversation_ended_display() {
        let error = ChatSyncError::ConversationEnded("42".to_string());
        assert_eq!(error.to_string(), "Conversation 42 has ended");
        assert!(error.is_conversation_ended());
    }

    #[test]
    fn test_no_provider_display() {
        let error = ChatSyncError::NoProviderConfigured;
        assert_eq!(error.to_string(), "No AI provider is configured");
        assert!(!error.is_conversation_ended());
    }

    #[test]
    fn test_contract_violation_display() {
        let error = ChatSyncError::ContractViolation("user message missing id".to_string());
        assert_eq!(
            error.to_string(),
            "Backend contract violation: user message missing id"
        );
    }

    #[test]
    fn test_override_store_display() {
        let error = ChatSyncError::OverrideStore("cannot write file".to_string());
        assert_eq!(error.to_string(), "Override store error: cannot write file");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: ChatSyncError = io_error.into();
        assert!(matches!(error, ChatSyncError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_str = "{invalid json}";
        let json_error = serde_json::from_str::<serde_json::Value>(json_str).unwrap_err();
        let error: ChatSyncError = json_error.into();
        assert!(matches!(error, ChatSyncError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_str = "invalid: : yaml";
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let error: ChatSyncError = yaml_error.into();
        assert!(matches!(error, ChatSyncError::Yaml(_)));
    }

    #[test]
    fn test_is_conversation_ended_through_anyhow() {
        let err: anyhow::Error = ChatSyncError::ConversationEnded("7".to_string()).into();
        assert!(is_conversation_ended(&err));

        let err: anyhow::Error = ChatSyncError::Config("x".to_string()).into();
        assert!(!is_conversation_ended(&err));

        let err = anyhow::anyhow!("plain error");
        assert!(!is_conversation_ended(&err));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ChatSyncError>();
    }
}
