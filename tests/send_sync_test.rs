//! Send and reconciliation integration tests
//!
//! Runs the `MessageSyncCoordinator` against a wiremock backend to verify
//! the send contract end to end: durable-id verification before any local
//! mutation, restoration of the input text on failure, and the delayed
//! count-compare reconciliation with its replace and no-op outcomes.

mod common;

use chatsync::provider::ProviderSelection;
use chatsync::sync::{MessageSyncCoordinator, ReconcileOutcome, SendFailureKind};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn coordinator(base_url: &str) -> MessageSyncCoordinator {
    MessageSyncCoordinator::new(common::backend(base_url), Duration::from_millis(25))
}

fn selection() -> ProviderSelection {
    ProviderSelection::new("openai")
}

#[tokio::test]
async fn test_send_then_reconcile_without_replacement() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages/send/"))
        .and(body_partial_json(json!({
            "conversation_id": 7,
            "content": "Hi",
            "provider": "openai",
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::send_response_json(7, 101, 102, "Hi")),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/conversations/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            common::conversation_with_messages_json(
                7,
                "active",
                vec![
                    common::message_json(101, 7, "user", "Hi"),
                    common::message_json(102, 7, "ai", "Re: Hi"),
                ],
            ),
        ))
        .mount(&server)
        .await;

    let coordinator = coordinator(&server.uri());
    coordinator.attach(7, vec![]);

    let outcome = coordinator
        .send(Some(7), "Hi", Some(&selection()))
        .await
        .unwrap();
    assert_eq!(outcome.user_message.id, Some(101));
    assert_eq!(outcome.ai_message.id, Some(102));

    let messages = coordinator.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].id, Some(101));
    assert_eq!(messages[1].id, Some(102));

    // The scheduled re-fetch finds matching counts and leaves the local
    // list untouched.
    let reconcile = coordinator.take_reconcile_handle().unwrap().await.unwrap();
    assert_eq!(reconcile, ReconcileOutcome::Match);
    assert_eq!(coordinator.messages().len(), 2);
}

#[tokio::test]
async fn test_send_response_missing_id_rejected_before_mutation() {
    let server = MockServer::start().await;

    // AI message arrives without a server-assigned id.
    Mock::given(method("POST"))
        .and(path("/messages/send/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user_message": common::message_json(101, 7, "user", "Hi"),
            "ai_message": {
                "conversation": 7,
                "sender": "ai",
                "content": "Re: Hi",
                "timestamp": "2025-03-01T12:00:00Z",
            },
        })))
        .mount(&server)
        .await;

    let coordinator = coordinator(&server.uri());
    coordinator.attach(7, vec![]);

    let failure = coordinator
        .send(Some(7), "Hi", Some(&selection()))
        .await
        .unwrap_err();

    assert_eq!(failure.text, "Hi");
    assert!(matches!(
        failure.kind,
        SendFailureKind::ContractViolation(_)
    ));
    assert!(coordinator.messages().is_empty());
}

#[tokio::test]
async fn test_network_failure_restores_text_and_leaves_list() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages/send/"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "backend down"})))
        .mount(&server)
        .await;

    let coordinator = coordinator(&server.uri());
    coordinator.attach(3, vec![]);

    let failure = coordinator
        .send(Some(3), "retry me", Some(&selection()))
        .await
        .unwrap_err();

    assert_eq!(failure.text, "retry me");
    assert!(matches!(failure.kind, SendFailureKind::Network(_)));
    assert!(coordinator.messages().is_empty());
}

#[tokio::test]
async fn test_ended_rejection_is_distinguished_from_network_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages/send/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "Cannot send messages to an ended conversation"
        })))
        .mount(&server)
        .await;

    let coordinator = coordinator(&server.uri());
    coordinator.attach(5, vec![]);

    let failure = coordinator
        .send(Some(5), "hello", Some(&selection()))
        .await
        .unwrap_err();

    assert_eq!(failure.text, "hello");
    assert!(matches!(
        failure.kind,
        SendFailureKind::ConversationEnded(5)
    ));
}

#[tokio::test]
async fn test_reconcile_mismatch_replaces_local_list_wholesale() {
    let server = MockServer::start().await;

    // Backend has three messages where the client expected two.
    Mock::given(method("GET"))
        .and(path("/conversations/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            common::conversation_with_messages_json(
                7,
                "active",
                vec![
                    common::message_json(101, 7, "user", "Hi"),
                    common::message_json(102, 7, "ai", "Re: Hi"),
                    common::message_json(103, 7, "ai", "An afterthought"),
                ],
            ),
        ))
        .mount(&server)
        .await;

    let coordinator = coordinator(&server.uri());
    coordinator.attach(
        7,
        vec![
            chatsync::client::types::Message {
                id: Some(101),
                conversation_id: 7,
                sender: chatsync::client::types::Sender::User,
                content: "Hi".to_string(),
                timestamp: chrono::Utc::now(),
                reactions: None,
                bookmarked: None,
            },
            chatsync::client::types::Message {
                id: Some(102),
                conversation_id: 7,
                sender: chatsync::client::types::Sender::Ai,
                content: "Re: Hi".to_string(),
                timestamp: chrono::Utc::now(),
                reactions: None,
                bookmarked: None,
            },
        ],
    );

    let outcome = coordinator.reconcile_now(7, 2).await;
    assert_eq!(outcome, ReconcileOutcome::Replaced);
    assert_eq!(coordinator.messages().len(), 3);
}

#[tokio::test]
async fn test_reconcile_is_noop_after_conversation_switch() {
    let server = MockServer::start().await;

    // The re-fetch must never be issued once another conversation is
    // being observed.
    Mock::given(method("GET"))
        .and(path("/conversations/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            common::conversation_with_messages_json(7, "active", vec![]),
        ))
        .expect(0)
        .mount(&server)
        .await;

    let coordinator = coordinator(&server.uri());
    coordinator.attach(8, vec![]);

    let outcome = coordinator.reconcile_now(7, 2).await;
    assert_eq!(outcome, ReconcileOutcome::Skipped);
}

#[tokio::test]
async fn test_first_send_creates_conversation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/conversations/"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(common::conversation_json(42, "New Conversation", "active")),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/messages/send/"))
        .and(body_partial_json(json!({"conversation_id": 42})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(common::send_response_json(42, 201, 202, "first words")),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/conversations/42/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            common::conversation_with_messages_json(
                42,
                "active",
                vec![
                    common::message_json(201, 42, "user", "first words"),
                    common::message_json(202, 42, "ai", "Re: first words"),
                ],
            ),
        ))
        .mount(&server)
        .await;

    let coordinator = coordinator(&server.uri());
    let outcome = coordinator
        .send(None, "first words", Some(&selection()))
        .await
        .unwrap();

    let created = outcome.created_conversation.as_ref().unwrap();
    assert_eq!(created.id, 42);
    assert_eq!(outcome.conversation_id, 42);
    assert_eq!(coordinator.conversation_id(), Some(42));
    assert_eq!(coordinator.messages().len(), 2);

    let reconcile = coordinator.take_reconcile_handle().unwrap().await.unwrap();
    assert_eq!(reconcile, ReconcileOutcome::Match);
}
