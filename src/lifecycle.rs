//! Conversation lifecycle state machine
//!
//! Each conversation the client is looking at is in one of three states:
//! no conversation selected, active, or ended. `ended` is terminal for a
//! given conversation id. The state machine gates sends before they reach
//! the network and holds the attempted message text whenever a send is
//! blocked, so the fork-and-resend recovery path can replay it into a new
//! conversation. The `active -> ended` transition is backend-confirmed:
//! callers flip the local state only after the backend acknowledged the
//! end with a generated summary.

use crate::client::types::{ConversationId, ConversationStatus};
use std::fmt;

/// Lifecycle state of the currently selected conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No conversation selected
    None,
    /// Selected conversation accepts sends
    Active,
    /// Selected conversation has ended; sends are intercepted locally
    Ended,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Active => write!(f, "active"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

/// Result of gating a send attempt against the lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendGate {
    /// The conversation (or lack of one) permits a send
    Allowed,
    /// The conversation has ended; the text was captured for recovery
    HeldForRecovery,
}

/// Per-conversation lifecycle tracker
///
/// Owns the `status` facet of client state: no other component flips a
/// conversation between active and ended. Also owns the captured message
/// text that the recovery flow replays.
#[derive(Debug, Default)]
pub struct ConversationLifecycle {
    state: Option<(ConversationId, LifecycleState)>,
    captured: Option<String>,
}

impl ConversationLifecycle {
    /// Create a tracker with no conversation selected
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state (`None` variant when nothing is selected)
    pub fn state(&self) -> LifecycleState {
        match self.state {
            Some((_, state)) => state,
            None => LifecycleState::None,
        }
    }

    /// Id of the selected conversation, if any
    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.state.map(|(id, _)| id)
    }

    /// Returns true when the selected conversation has ended
    pub fn is_ended(&self) -> bool {
        self.state() == LifecycleState::Ended
    }

    /// Enter `active` for a newly created conversation
    pub fn activate(&mut self, id: ConversationId) {
        tracing::debug!("Conversation {} is now active", id);
        self.state = Some((id, LifecycleState::Active));
    }

    /// Enter the state matching a loaded conversation's reported status
    ///
    /// A conversation loaded already in `ended` state enters `Ended`
    /// directly; there is no local transition to observe.
    pub fn load(&mut self, id: ConversationId, status: ConversationStatus) {
        let state = match status {
            ConversationStatus::Active => LifecycleState::Active,
            ConversationStatus::Ended => LifecycleState::Ended,
        };
        tracing::debug!("Loaded conversation {} in state {}", id, state);
        self.state = Some((id, state));
    }

    /// Deselect the current conversation
    pub fn reset(&mut self) {
        self.state = None;
    }

    /// Flip the selected conversation to `ended`
    ///
    /// Callers invoke this only after the backend acknowledged the end
    /// operation (with its generated summary). Ended is terminal: the
    /// transition is ignored with a warning when nothing is active.
    pub fn mark_ended(&mut self) {
        match &mut self.state {
            Some((id, state)) => {
                tracing::info!("Conversation {} ended", id);
                *state = LifecycleState::Ended;
            }
            None => {
                tracing::warn!("mark_ended called with no conversation selected");
            }
        }
    }

    /// Gate a send attempt against the current state
    ///
    /// When the selected conversation has ended the attempted text is
    /// captured and the send never reaches the network; the caller offers
    /// the fork-and-resend recovery action instead.
    pub fn gate_send(&mut self, text: &str) -> SendGate {
        if self.is_ended() {
            tracing::info!("Send intercepted: conversation has ended, text captured");
            self.captured = Some(text.to_string());
            SendGate::HeldForRecovery
        } else {
            SendGate::Allowed
        }
    }

    /// Capture text after a reactive ended-rejection from the backend
    ///
    /// Used when the conversation ended between our read and the send
    /// (the backend rejected the write); the same recovery path applies.
    pub fn capture(&mut self, text: impl Into<String>) {
        self.captured = Some(text.into());
    }

    /// The captured text awaiting recovery, if any
    pub fn captured(&self) -> Option<&str> {
        self.captured.as_deref()
    }

    /// Take the captured text for replay into a new conversation
    ///
    /// Callers that fail to deliver the text must re-capture it; it is
    /// never dropped on a failed recovery.
    pub fn take_captured(&mut self) -> Option<String> {
        self.captured.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_none() {
        let lifecycle = ConversationLifecycle::new();
        assert_eq!(lifecycle.state(), LifecycleState::None);
        assert!(lifecycle.conversation_id().is_none());
        assert!(!lifecycle.is_ended());
    }

    #[test]
    fn test_activate_enters_active() {
        let mut lifecycle = ConversationLifecycle::new();
        lifecycle.activate(7);
        assert_eq!(lifecycle.state(), LifecycleState::Active);
        assert_eq!(lifecycle.conversation_id(), Some(7));
    }

    #[test]
    fn test_load_ended_conversation_enters_ended_directly() {
        let mut lifecycle = ConversationLifecycle::new();
        lifecycle.load(3, ConversationStatus::Ended);
        assert_eq!(lifecycle.state(), LifecycleState::Ended);
        assert!(lifecycle.is_ended());
    }

    #[test]
    fn test_load_active_conversation() {
        let mut lifecycle = ConversationLifecycle::new();
        lifecycle.load(3, ConversationStatus::Active);
        assert_eq!(lifecycle.state(), LifecycleState::Active);
    }

    #[test]
    fn test_mark_ended_flips_active() {
        let mut lifecycle = ConversationLifecycle::new();
        lifecycle.activate(9);
        lifecycle.mark_ended();
        assert_eq!(lifecycle.state(), LifecycleState::Ended);
        assert_eq!(lifecycle.conversation_id(), Some(9));
    }

    #[test]
    fn test_mark_ended_without_selection_is_ignored() {
        let mut lifecycle = ConversationLifecycle::new();
        lifecycle.mark_ended();
        assert_eq!(lifecycle.state(), LifecycleState::None);
    }

    #[test]
    fn test_gate_send_allows_active() {
        let mut lifecycle = ConversationLifecycle::new();
        lifecycle.activate(1);
        assert_eq!(lifecycle.gate_send("hello"), SendGate::Allowed);
        assert!(lifecycle.captured().is_none());
    }

    #[test]
    fn test_gate_send_allows_no_selection() {
        // No conversation yet: the coordinator will create one first.
        let mut lifecycle = ConversationLifecycle::new();
        assert_eq!(lifecycle.gate_send("hello"), SendGate::Allowed);
    }

    #[test]
    fn test_gate_send_captures_on_ended() {
        let mut lifecycle = ConversationLifecycle::new();
        lifecycle.load(5, ConversationStatus::Ended);

        assert_eq!(lifecycle.gate_send("hello"), SendGate::HeldForRecovery);
        assert_eq!(lifecycle.captured(), Some("hello"));
    }

    #[test]
    fn test_take_captured_moves_text_out() {
        let mut lifecycle = ConversationLifecycle::new();
        lifecycle.load(5, ConversationStatus::Ended);
        lifecycle.gate_send("hello");

        assert_eq!(lifecycle.take_captured(), Some("hello".to_string()));
        assert!(lifecycle.captured().is_none());
    }

    #[test]
    fn test_reactive_capture() {
        let mut lifecycle = ConversationLifecycle::new();
        lifecycle.activate(2);
        // Backend rejected the send with an ended error after our read.
        lifecycle.capture("raced message");
        assert_eq!(lifecycle.captured(), Some("raced message"));
    }

    #[test]
    fn test_reset_deselects() {
        let mut lifecycle = ConversationLifecycle::new();
        lifecycle.activate(1);
        lifecycle.reset();
        assert_eq!(lifecycle.state(), LifecycleState::None);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(LifecycleState::None.to_string(), "none");
        assert_eq!(LifecycleState::Active.to_string(), "active");
        assert_eq!(LifecycleState::Ended.to_string(), "ended");
    }
}
