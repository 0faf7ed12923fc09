use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use kiosk_core::domain::customer::{Customer, CustomerId};
use kiosk_core::domain::order::{Order, OrderId, OrderStatus};
use kiosk_core::domain::product::{Product, ProductId};

pub mod customer;
pub mod memory;
pub mod order;
pub mod product;

pub use customer::SqlCustomerRepository;
pub use memory::{InMemoryCustomerRepository, InMemoryOrderRepository, InMemoryProductRepository};
pub use order::SqlOrderRepository;
pub use product::SqlProductRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("insufficient stock for {product_id}: {available} available")]
    InsufficientStock { product_id: String, available: u32 },
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Looks up a customer, creating an empty aggregate on first contact.
    async fn find_or_create(
        &self,
        id: &CustomerId,
        now: DateTime<Utc>,
    ) -> Result<Customer, RepositoryError>;

    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError>;

    async fn save(&self, customer: Customer) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Active, in-stock products for catalog replies, featured first.
    async fn list_active(&self, limit: usize) -> Result<Vec<Product>, RepositoryError>;

    /// Atomically removes `quantity` units. Fails with `InsufficientStock`
    /// without changing anything when the product cannot cover the quantity;
    /// this is the single contended step of order commit.
    async fn decrement_stock(
        &self,
        id: &ProductId,
        quantity: u32,
    ) -> Result<(), RepositoryError>;

    /// Returns units to stock, reactivating an out-of-stock product. Used to
    /// compensate when order creation fails after the decrement.
    async fn restock(&self, id: &ProductId, quantity: u32) -> Result<(), RepositoryError>;

    async fn record_view(&self, id: &ProductId) -> Result<(), RepositoryError>;

    async fn save(&self, product: Product) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Issues the next `ORD-YYMM-NNNN` id for the given instant. Ids are
    /// monotonic within a period and never reused, including for orders
    /// that subsequently fail to persist.
    async fn allocate_order_id(&self, now: DateTime<Utc>) -> Result<OrderId, RepositoryError>;

    async fn create(&self, order: Order) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;

    async fn list_recent_for_customer(
        &self,
        customer_id: &CustomerId,
        limit: usize,
    ) -> Result<Vec<Order>, RepositoryError>;

    async fn list_open_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<Order>, RepositoryError>;

    async fn list_by_status(
        &self,
        status: Option<OrderStatus>,
        limit: usize,
    ) -> Result<Vec<Order>, RepositoryError>;

    async fn save(&self, order: Order) -> Result<(), RepositoryError>;
}

pub(crate) fn parse_rfc3339(field: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|err| RepositoryError::Decode(format!("invalid {field} timestamp: {err}")))
}

pub(crate) fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    raw.parse::<Decimal>()
        .map_err(|err| RepositoryError::Decode(format!("invalid {field} amount: {err}")))
}

pub(crate) fn to_json<T: Serialize>(field: &str, value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value)
        .map_err(|err| RepositoryError::Decode(format!("failed to encode {field}: {err}")))
}

pub(crate) fn from_json<T: DeserializeOwned>(
    field: &str,
    raw: &str,
) -> Result<T, RepositoryError> {
    serde_json::from_str(raw)
        .map_err(|err| RepositoryError::Decode(format!("failed to decode {field}: {err}")))
}
