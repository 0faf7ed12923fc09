use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use kiosk_core::domain::customer::CustomerId;
use kiosk_core::domain::order::{
    Order, OrderId, OrderStatus, PaymentMethod, PaymentStatus,
};
use kiosk_core::pricing::PricingBreakdown;

use super::{from_json, parse_decimal, parse_rfc3339, to_json, OrderRepository, RepositoryError};
use crate::DbPool;

const ORDER_COLUMNS: &str = r#"
    id, customer_id, customer_name, items_json, subtotal, delivery_fee,
    discount, total, delivery_json, payment_method, payment_status,
    status, status_history_json, created_at
"#;

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn allocate_order_id(&self, now: DateTime<Utc>) -> Result<OrderId, RepositoryError> {
        let period = now.format("%y%m").to_string();
        let seq: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO order_sequences (period, seq) VALUES (?, 1)
            ON CONFLICT(period) DO UPDATE SET seq = seq + 1
            RETURNING seq
            "#,
        )
        .bind(&period)
        .fetch_one(&self.pool)
        .await?;

        Ok(OrderId(format!("ORD-{period}-{seq:04}")))
    }

    async fn create(&self, order: Order) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_id, customer_name, items_json, subtotal,
                delivery_fee, discount, total, delivery_json, payment_method,
                payment_status, status, status_history_json, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.id.0)
        .bind(&order.customer_id.0)
        .bind(order.customer_name.as_deref())
        .bind(to_json("order items", &order.items)?)
        .bind(order.pricing.subtotal.to_string())
        .bind(order.pricing.delivery_fee.to_string())
        .bind(order.pricing.discount.to_string())
        .bind(order.pricing.total.to_string())
        .bind(to_json("order delivery", &order.delivery)?)
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.status.as_str())
        .bind(to_json("order status history", &order.status_history)?)
        .bind(order.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|value| order_from_row(&value)).transpose()
    }

    async fn list_recent_for_customer(
        &self,
        customer_id: &CustomerId,
        limit: usize,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE customer_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#
        ))
        .bind(&customer_id.0)
        .bind(limit.clamp(1, 100) as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(order_from_row).collect()
    }

    async fn list_open_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE customer_id = ?
              AND status IN ('pending', 'confirmed', 'processing', 'shipped')
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(&customer_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(order_from_row).collect()
    }

    async fn list_by_status(
        &self,
        status: Option<OrderStatus>,
        limit: usize,
    ) -> Result<Vec<Order>, RepositoryError> {
        let limit = limit.clamp(1, 100) as i64;
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    r#"
                    SELECT {ORDER_COLUMNS} FROM orders
                    WHERE status = ?
                    ORDER BY created_at DESC, id DESC
                    LIMIT ?
                    "#
                ))
                .bind(status.as_str())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    r#"
                    SELECT {ORDER_COLUMNS} FROM orders
                    ORDER BY created_at DESC, id DESC
                    LIMIT ?
                    "#
                ))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(order_from_row).collect()
    }

    async fn save(&self, order: Order) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE orders SET
                payment_status = ?,
                status = ?,
                status_history_json = ?
            WHERE id = ?
            "#,
        )
        .bind(order.payment_status.as_str())
        .bind(order.status.as_str())
        .bind(to_json("order status history", &order.status_history)?)
        .bind(&order.id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn order_from_row(row: &SqliteRow) -> Result<Order, RepositoryError> {
    let payment_method_raw: String = row.try_get("payment_method")?;
    let payment_method = PaymentMethod::parse(&payment_method_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("invalid order payment_method: {payment_method_raw}"))
    })?;

    let payment_status_raw: String = row.try_get("payment_status")?;
    let payment_status = PaymentStatus::parse(&payment_status_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("invalid order payment_status: {payment_status_raw}"))
    })?;

    let status_raw: String = row.try_get("status")?;
    let status = OrderStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("invalid order status: {status_raw}")))?;

    Ok(Order {
        id: OrderId(row.try_get("id")?),
        customer_id: CustomerId(row.try_get("customer_id")?),
        customer_name: row.try_get("customer_name")?,
        items: from_json("order items", &row.try_get::<String, _>("items_json")?)?,
        pricing: PricingBreakdown {
            subtotal: parse_decimal("order subtotal", &row.try_get::<String, _>("subtotal")?)?,
            delivery_fee: parse_decimal(
                "order delivery_fee",
                &row.try_get::<String, _>("delivery_fee")?,
            )?,
            discount: parse_decimal("order discount", &row.try_get::<String, _>("discount")?)?,
            total: parse_decimal("order total", &row.try_get::<String, _>("total")?)?,
        },
        delivery: from_json("order delivery", &row.try_get::<String, _>("delivery_json")?)?,
        payment_method,
        payment_status,
        status,
        status_history: from_json(
            "order status history",
            &row.try_get::<String, _>("status_history_json")?,
        )?,
        created_at: parse_rfc3339("order created_at", &row.try_get::<String, _>("created_at")?)?,
    })
}
