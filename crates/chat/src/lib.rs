//! Conversational order orchestration.
//!
//! This crate owns the message pipeline: admin side-channel routing,
//! per-customer turn serialization, deterministic negotiation replies
//! (address, CONFIRM, CANCEL), oracle-backed intent dispatch, and the
//! order commit sequence that keeps stock consistent under racing turns.

pub mod admin;
pub mod commit;
pub mod events;
pub mod messages;
pub mod notify;
pub mod orchestrator;
pub mod sweep;

pub use admin::AdminRouter;
pub use commit::{CommitError, OrderCommitService};
pub use events::{InboundMessage, TurnOutcome};
pub use notify::{NoopSink, NotificationSink, Notifier, NotifyError, RecordingSink};
pub use orchestrator::{CustomerLocks, Orchestrator};
pub use sweep::NegotiationSweeper;
