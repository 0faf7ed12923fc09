use chrono::{DateTime, Utc};

use kiosk_core::session::Action;

/// One message arriving from the chat transport. The sender id doubles as
/// the customer id for non-admin senders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// What the orchestrator did with a turn. Replies themselves go out through
/// the notification sink; this is for callers and tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Empty message, dropped without touching any state.
    Ignored,
    /// Admin side-channel command, handled outside the customer pipeline.
    Admin,
    /// Customer turn handled; the action is absent when the turn was
    /// resolved deterministically by the negotiation machine.
    Replied { action: Option<Action> },
}
