//! Intent oracle - LLM-backed classification of customer messages.
//!
//! The model is strictly a translator: it maps free-form chat into one of a
//! fixed set of actions plus an optional order intent. It never decides
//! prices, stock, or order state - those are deterministic decisions made by
//! the orchestrator against the database.
//!
//! Degradation is part of the contract:
//! - a reply that is not valid JSON is relayed verbatim as a general inquiry
//! - a failed model invocation becomes an escalation to a human

pub mod llm;
pub mod oracle;
pub mod prompt;

pub use llm::{HttpLlmClient, LlmClient};
pub use oracle::{Classification, IntentClassifier, OracleClassifier};
pub use prompt::TurnContext;
