use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use kiosk_core::domain::product::ProductId;
use kiosk_core::session::Action;

use crate::llm::LlmClient;
use crate::prompt::{build_prompt, TurnContext};

/// Fallback reply when the model invocation itself fails.
pub const ESCALATION_FALLBACK: &str =
    "I'm here to help! Let me connect you with our support team for better assistance.";

/// The oracle's verdict on one customer message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    pub message: String,
    pub action: Action,
    pub requires_human: bool,
    pub target_product: Option<ProductId>,
    pub quantity: Option<u32>,
    pub suggested_products: Vec<ProductId>,
}

impl Classification {
    fn general_inquiry(message: String) -> Self {
        Self {
            message,
            action: Action::GeneralInquiry,
            requires_human: false,
            target_product: None,
            quantity: None,
            suggested_products: Vec::new(),
        }
    }

    fn escalation() -> Self {
        Self {
            message: ESCALATION_FALLBACK.to_string(),
            action: Action::Escalate,
            requires_human: true,
            target_product: None,
            quantity: None,
            suggested_products: Vec::new(),
        }
    }
}

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, context: &TurnContext<'_>) -> Classification;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    message: String,
    action: String,
    #[serde(default)]
    requires_human: bool,
    #[serde(default)]
    suggested_products: Vec<String>,
    #[serde(default)]
    order_intent: Option<WireOrderIntent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireOrderIntent {
    product_id: Option<String>,
    quantity: Option<u32>,
}

pub struct OracleClassifier {
    llm: Arc<dyn LlmClient>,
}

impl OracleClassifier {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl IntentClassifier for OracleClassifier {
    /// Classification never fails the turn. An unreachable or erroring model
    /// degrades to escalation; an unparsable reply is relayed verbatim as a
    /// general inquiry.
    async fn classify(&self, context: &TurnContext<'_>) -> Classification {
        let prompt = build_prompt(context);
        match self.llm.complete(&prompt).await {
            Ok(raw) => parse_reply(&raw),
            Err(err) => {
                tracing::warn!(
                    event_name = "oracle_invocation_failed",
                    error = %err,
                    "model invocation failed, escalating turn",
                );
                Classification::escalation()
            }
        }
    }
}

fn parse_reply(raw: &str) -> Classification {
    let cleaned = strip_code_fences(raw);
    let wire: WireResponse = match serde_json::from_str(cleaned) {
        Ok(wire) => wire,
        Err(_) => return Classification::general_inquiry(raw.trim().to_string()),
    };

    // An unknown action label means the model wandered off the closed set;
    // treat the reply as a general inquiry rather than guessing.
    let Some(action) = Action::parse(&wire.action) else {
        return Classification::general_inquiry(wire.message);
    };

    let (target_product, quantity) = match wire.order_intent {
        Some(intent) => (
            intent.product_id.filter(|id| !id.is_empty()).map(ProductId),
            intent.quantity.filter(|quantity| *quantity > 0),
        ),
        None => (None, None),
    };

    Classification {
        message: wire.message,
        action,
        requires_human: wire.requires_human,
        target_product,
        quantity,
        suggested_products: wire
            .suggested_products
            .into_iter()
            .filter(|id| !id.is_empty())
            .map(ProductId)
            .collect(),
    }
}

/// Models often wrap JSON in markdown fences despite instructions.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
