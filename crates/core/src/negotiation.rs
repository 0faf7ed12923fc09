use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::customer::Address;
use crate::domain::order::PaymentMethod;
use crate::domain::product::ProductSnapshot;
use crate::pricing::{FeeSchedule, PricingBreakdown, ZoneQuote};

/// Slot-filling stages for one in-progress order attempt. `Committed` and
/// `Cancelled` are not stages: the negotiation is removed from the session
/// when it ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationStage {
    CollectingAddress,
    AwaitingConfirmation,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Negotiation {
    pub product: ProductSnapshot,
    pub quantity: u32,
    pub address: Option<Address>,
    pub pricing: Option<PricingBreakdown>,
    pub zone: Option<ZoneQuote>,
    pub stage: NegotiationStage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Negotiation {
    /// Opens a negotiation for a customer with no usable delivery address.
    pub fn collecting_address(product: ProductSnapshot, quantity: u32, now: DateTime<Utc>) -> Self {
        Self {
            product,
            quantity,
            address: None,
            pricing: None,
            zone: None,
            stage: NegotiationStage::CollectingAddress,
            created_at: now,
            updated_at: now,
        }
    }

    /// Opens a negotiation directly at confirmation, pricing against an
    /// address already on file.
    pub fn awaiting_confirmation(
        product: ProductSnapshot,
        quantity: u32,
        address: Address,
        schedule: &FeeSchedule,
        now: DateTime<Utc>,
    ) -> Self {
        let mut negotiation = Self::collecting_address(product, quantity, now);
        negotiation.provide_address(address, schedule, now);
        negotiation
    }

    /// Fills the address slot and recomputes pricing, advancing to
    /// `AwaitingConfirmation`.
    pub fn provide_address(&mut self, address: Address, schedule: &FeeSchedule, now: DateTime<Utc>) {
        let (pricing, zone) =
            schedule.price(self.product.unit_price, self.quantity, &address.region);
        self.address = Some(address);
        self.pricing = Some(pricing);
        self.zone = Some(zone);
        self.stage = NegotiationStage::AwaitingConfirmation;
        self.updated_at = now;
    }

    /// Revises the quantity after a stock re-check found fewer units than
    /// requested. Pricing is recomputed; the stage does not change.
    pub fn revise_quantity(&mut self, available: u32, schedule: &FeeSchedule, now: DateTime<Utc>) {
        self.quantity = available;
        if let Some(address) = &self.address {
            let (pricing, zone) =
                schedule.price(self.product.unit_price, self.quantity, &address.region);
            self.pricing = Some(pricing);
            self.zone = Some(zone);
        }
        self.updated_at = now;
    }

    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now - self.updated_at >= timeout
    }

    pub fn is_for_product(&self, product_id: &str) -> bool {
        self.product.id.0 == product_id
    }
}

/// A parsed reply while a negotiation awaits confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmationReply {
    Confirm(PaymentMethod),
    Cancel,
}

/// Recognizes explicit confirm/cancel replies. Anything else is not a
/// negotiation reply and should fall through to intent classification.
pub fn parse_confirmation_reply(text: &str) -> Option<ConfirmationReply> {
    let normalized = text.trim().to_lowercase();
    if normalized == "cancel" || normalized.starts_with("cancel ") {
        return Some(ConfirmationReply::Cancel);
    }
    if !normalized.contains("confirm") {
        return None;
    }
    if normalized.contains("cod") || normalized.contains("cash") {
        return Some(ConfirmationReply::Confirm(PaymentMethod::CashOnDelivery));
    }
    if normalized.contains("transfer") || normalized.contains("bank") {
        return Some(ConfirmationReply::Confirm(PaymentMethod::Transfer));
    }
    None
}

/// Parses a comma-separated "street, city, region[, landmark]" message.
/// The region must be recognizable against the fee schedule; otherwise the
/// caller re-prompts rather than guessing.
pub fn parse_address(text: &str, schedule: &FeeSchedule) -> Option<Address> {
    let region = schedule.recognize_region(text)?;
    let parts: Vec<&str> =
        text.split(',').map(str::trim).filter(|part| !part.is_empty()).collect();
    if parts.len() < 2 {
        return None;
    }

    let street = parts[0].to_string();
    let city = parts
        .get(1)
        .filter(|part| !part.eq_ignore_ascii_case(&region))
        .unwrap_or(&"")
        .to_string();
    let landmark = parts
        .iter()
        .skip(2)
        .find(|part| !part.eq_ignore_ascii_case(&region))
        .map(|part| part.to_string());

    Some(Address { street, city, region, landmark, is_default: false })
}
