use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use kiosk_core::domain::customer::{Customer, CustomerId, VipTier};

use super::{from_json, parse_decimal, parse_rfc3339, to_json, CustomerRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn find_or_create(
        &self,
        id: &CustomerId,
        now: DateTime<Utc>,
    ) -> Result<Customer, RepositoryError> {
        if let Some(existing) = self.find_by_id(id).await? {
            return Ok(existing);
        }

        let fresh = Customer::new(id.clone(), now);
        sqlx::query(
            r#"
            INSERT INTO customers (id, created_at, last_interaction)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&fresh.id.0)
        .bind(fresh.created_at.to_rfc3339())
        .bind(fresh.last_interaction.to_rfc3339())
        .execute(&self.pool)
        .await?;

        // Re-read in case a concurrent first contact won the insert.
        Ok(self.find_by_id(id).await?.unwrap_or(fresh))
    }

    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT
                id, name, addresses_json, order_history_json, total_spent,
                total_orders, loyalty_points, vip_tier, cart_json,
                created_at, last_interaction
            FROM customers
            WHERE id = ?
            "#,
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|value| customer_from_row(&value)).transpose()
    }

    async fn save(&self, customer: Customer) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, addresses_json, order_history_json, total_spent,
                total_orders, loyalty_points, vip_tier, cart_json,
                created_at, last_interaction
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                addresses_json = excluded.addresses_json,
                order_history_json = excluded.order_history_json,
                total_spent = excluded.total_spent,
                total_orders = excluded.total_orders,
                loyalty_points = excluded.loyalty_points,
                vip_tier = excluded.vip_tier,
                cart_json = excluded.cart_json,
                last_interaction = excluded.last_interaction
            "#,
        )
        .bind(&customer.id.0)
        .bind(customer.name.as_deref())
        .bind(to_json("customer addresses", &customer.addresses)?)
        .bind(to_json("customer order history", &customer.order_history)?)
        .bind(customer.total_spent.to_string())
        .bind(customer.total_orders as i64)
        .bind(customer.loyalty_points as i64)
        .bind(customer.vip_tier.map(|tier| tier.label()))
        .bind(to_json("customer cart", &customer.cart)?)
        .bind(customer.created_at.to_rfc3339())
        .bind(customer.last_interaction.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn customer_from_row(row: &SqliteRow) -> Result<Customer, RepositoryError> {
    let vip_tier = row
        .try_get::<Option<String>, _>("vip_tier")?
        .map(|raw| {
            VipTier::parse(&raw)
                .ok_or_else(|| RepositoryError::Decode(format!("invalid customer vip_tier: {raw}")))
        })
        .transpose()?;

    Ok(Customer {
        id: CustomerId(row.try_get("id")?),
        name: row.try_get("name")?,
        addresses: from_json("customer addresses", &row.try_get::<String, _>("addresses_json")?)?,
        order_history: from_json(
            "customer order history",
            &row.try_get::<String, _>("order_history_json")?,
        )?,
        total_spent: parse_decimal("customer total_spent", &row.try_get::<String, _>("total_spent")?)?,
        total_orders: row.try_get::<i64, _>("total_orders")? as u32,
        loyalty_points: row.try_get::<i64, _>("loyalty_points")? as u64,
        vip_tier,
        cart: from_json("customer cart", &row.try_get::<String, _>("cart_json")?)?,
        created_at: parse_rfc3339("customer created_at", &row.try_get::<String, _>("created_at")?)?,
        last_interaction: parse_rfc3339(
            "customer last_interaction",
            &row.try_get::<String, _>("last_interaction")?,
        )?,
    })
}
