use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::customer::{Address, CustomerId};
use crate::domain::product::ProductId;
use crate::errors::DomainError;
use crate::pricing::PricingBreakdown;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CashOnDelivery,
    Transfer,
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            Self::CashOnDelivery => "Cash on Delivery",
            Self::Transfer => "Bank Transfer",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CashOnDelivery => "cod",
            Self::Transfer => "transfer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cod" => Some(Self::CashOnDelivery),
            "transfer" => Some(Self::Transfer),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "processing" => Some(Self::Processing),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Statuses that count as an open order for conversation context.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed | Self::Processing | Self::Shipped)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub subtotal: Decimal,
}

impl LineItem {
    pub fn new(product_id: ProductId, name: String, unit_price: Decimal, quantity: u32) -> Self {
        let subtotal = unit_price * Decimal::from(quantity);
        Self { product_id, name, unit_price, quantity, subtotal }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub address: Address,
    pub zone: String,
    pub estimated_days: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: OrderStatus,
    pub at: DateTime<Utc>,
    pub note: String,
    pub updated_by: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub customer_name: Option<String>,
    pub items: Vec<LineItem>,
    pub pricing: PricingBreakdown,
    pub delivery: DeliveryDetails,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub status_history: Vec<StatusEntry>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Builds a new `pending` order. Line subtotals and the pricing totals
    /// are recomputed here and never taken from the caller's arithmetic.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: OrderId,
        customer_id: CustomerId,
        customer_name: Option<String>,
        items: Vec<LineItem>,
        delivery_fee: Decimal,
        discount: Decimal,
        delivery: DeliveryDetails,
        payment_method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Self {
        let items: Vec<LineItem> = items
            .into_iter()
            .map(|item| LineItem::new(item.product_id, item.name, item.unit_price, item.quantity))
            .collect();
        let subtotal: Decimal = items.iter().map(|item| item.subtotal).sum();
        let pricing = PricingBreakdown {
            subtotal,
            delivery_fee,
            discount,
            total: subtotal + delivery_fee - discount,
        };

        Self {
            id,
            customer_id,
            customer_name,
            items,
            pricing,
            delivery,
            payment_method,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Pending,
            status_history: vec![StatusEntry {
                status: OrderStatus::Pending,
                at: now,
                note: "order created".to_string(),
                updated_by: "system".to_string(),
            }],
            created_at: now,
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self.status, next),
            (OrderStatus::Pending, OrderStatus::Confirmed)
                | (OrderStatus::Confirmed, OrderStatus::Processing)
                | (OrderStatus::Processing, OrderStatus::Shipped)
                | (OrderStatus::Shipped, OrderStatus::Delivered)
        ) || (next == OrderStatus::Cancelled && !self.status.is_terminal())
    }

    /// Applies a lifecycle transition, appending to the status history.
    /// Delivery marks the payment as collected.
    pub fn transition_to(
        &mut self,
        next: OrderStatus,
        note: impl Into<String>,
        updated_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.can_transition_to(next) {
            return Err(DomainError::InvalidOrderTransition { from: self.status, to: next });
        }
        self.status = next;
        if next == OrderStatus::Delivered {
            self.payment_status = PaymentStatus::Paid;
        }
        self.status_history.push(StatusEntry {
            status: next,
            at: now,
            note: note.into(),
            updated_by: updated_by.into(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::customer::{Address, CustomerId};
    use crate::domain::product::ProductId;

    use super::{
        DeliveryDetails, LineItem, Order, OrderId, OrderStatus, PaymentMethod, PaymentStatus,
    };

    fn order(quantity: u32) -> Order {
        Order::new(
            OrderId("ORD-2608-0001".to_string()),
            CustomerId("2348012345678".to_string()),
            Some("Ada".to_string()),
            vec![LineItem::new(
                ProductId("PRD-001".to_string()),
                "Wireless Earbuds".to_string(),
                Decimal::new(50_000, 0),
                quantity,
            )],
            Decimal::new(3_000, 0),
            Decimal::ZERO,
            DeliveryDetails {
                address: Address {
                    street: "15 Admiralty Way".to_string(),
                    city: "Lekki".to_string(),
                    region: "Lagos".to_string(),
                    landmark: None,
                    is_default: true,
                },
                zone: "Lagos & Abuja (Major Cities)".to_string(),
                estimated_days: "1-2 days".to_string(),
            },
            PaymentMethod::CashOnDelivery,
            Utc::now(),
        )
    }

    #[test]
    fn totals_are_recomputed_from_line_items() {
        let order = order(2);
        assert_eq!(order.items[0].subtotal, Decimal::new(100_000, 0));
        assert_eq!(order.pricing.subtotal, Decimal::new(100_000, 0));
        assert_eq!(
            order.pricing.total,
            order.pricing.subtotal + order.pricing.delivery_fee - order.pricing.discount
        );
    }

    #[test]
    fn new_order_starts_pending_with_history_entry() {
        let order = order(1);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.status_history.len(), 1);
        assert_eq!(order.status_history[0].status, OrderStatus::Pending);
    }

    #[test]
    fn lifecycle_transitions_append_history() {
        let mut order = order(1);
        let now = Utc::now();
        order.transition_to(OrderStatus::Confirmed, "payment seen", "admin", now).expect("confirm");
        order.transition_to(OrderStatus::Processing, "", "admin", now).expect("process");
        order.transition_to(OrderStatus::Shipped, "", "admin", now).expect("ship");
        order.transition_to(OrderStatus::Delivered, "", "rider", now).expect("deliver");

        assert_eq!(order.status_history.len(), 5);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn skipping_stages_is_rejected() {
        let mut order = order(1);
        let error = order
            .transition_to(OrderStatus::Shipped, "", "admin", Utc::now())
            .expect_err("pending cannot ship");
        assert!(error.to_string().contains("invalid order transition"));
    }

    #[test]
    fn cancelled_order_cannot_move_again() {
        let mut order = order(1);
        order.transition_to(OrderStatus::Cancelled, "customer request", "system", Utc::now())
            .expect("cancel");
        assert!(order
            .transition_to(OrderStatus::Confirmed, "", "admin", Utc::now())
            .is_err());
    }

    #[test]
    fn payment_method_labels_round_trip() {
        assert_eq!(PaymentMethod::parse("cod"), Some(PaymentMethod::CashOnDelivery));
        assert_eq!(PaymentMethod::parse("transfer"), Some(PaymentMethod::Transfer));
        assert_eq!(PaymentMethod::CashOnDelivery.label(), "Cash on Delivery");
    }
}
