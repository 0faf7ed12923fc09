use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order::{OrderId, OrderStatus};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub region: String,
    pub landmark: Option<String>,
    pub is_default: bool,
}

impl Address {
    /// An address is usable for delivery pricing only when the region is
    /// known, since the fee schedule is keyed by region.
    pub fn is_usable(&self) -> bool {
        !self.region.trim().is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VipTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl VipTier {
    /// Thresholds evaluated highest-first.
    pub fn from_total_spent(total_spent: Decimal) -> Option<Self> {
        if total_spent >= Decimal::new(500_000, 0) {
            Some(Self::Platinum)
        } else if total_spent >= Decimal::new(300_000, 0) {
            Some(Self::Gold)
        } else if total_spent >= Decimal::new(150_000, 0) {
            Some(Self::Silver)
        } else if total_spent >= Decimal::new(50_000, 0) {
            Some(Self::Bronze)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "bronze" => Some(Self::Bronze),
            "silver" => Some(Self::Silver),
            "gold" => Some(Self::Gold),
            "platinum" => Some(Self::Platinum),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub total: Decimal,
    pub placed_at: DateTime<Utc>,
    pub status: OrderStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: Option<String>,
    pub addresses: Vec<Address>,
    pub order_history: Vec<OrderSummary>,
    pub total_spent: Decimal,
    pub total_orders: u32,
    pub loyalty_points: u64,
    pub vip_tier: Option<VipTier>,
    pub cart: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    pub last_interaction: DateTime<Utc>,
}

impl Customer {
    pub fn new(id: CustomerId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: None,
            addresses: Vec::new(),
            order_history: Vec::new(),
            total_spent: Decimal::ZERO,
            total_orders: 0,
            loyalty_points: 0,
            vip_tier: None,
            cart: Vec::new(),
            created_at: now,
            last_interaction: now,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id.0)
    }

    pub fn is_vip(&self) -> bool {
        self.vip_tier.is_some()
    }

    pub fn default_address(&self) -> Option<&Address> {
        self.addresses.iter().find(|address| address.is_default).or_else(|| self.addresses.first())
    }

    /// A delivery address the orchestrator can price against, if any.
    pub fn usable_address(&self) -> Option<&Address> {
        self.default_address().filter(|address| address.is_usable())
    }

    /// First saved address becomes the default.
    pub fn add_address(&mut self, mut address: Address) {
        if self.addresses.is_empty() {
            address.is_default = true;
        }
        self.addresses.push(address);
    }

    /// Appends an order summary and updates spend aggregates: totals,
    /// loyalty points (1 per 100 spent), and the VIP tier.
    pub fn record_order(&mut self, summary: OrderSummary, now: DateTime<Utc>) {
        self.total_spent += summary.total;
        self.total_orders += 1;
        self.loyalty_points +=
            (summary.total / Decimal::new(100, 0)).floor().to_u64().unwrap_or(0);
        self.vip_tier = VipTier::from_total_spent(self.total_spent);
        self.order_history.insert(0, summary);
        self.last_interaction = now;
    }

    pub fn clear_cart(&mut self) {
        self.cart.clear();
    }
}
