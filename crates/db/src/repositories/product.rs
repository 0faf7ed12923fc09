use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use kiosk_core::domain::product::{Product, ProductId, ProductStatus};

use super::{parse_decimal, parse_rfc3339, ProductRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT
                id, name, description, price, stock, category, status,
                featured, views_count, orders_count, created_at
            FROM products
            WHERE id = ?
            "#,
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|value| product_from_row(&value)).transpose()
    }

    async fn list_active(&self, limit: usize) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                id, name, description, price, stock, category, status,
                featured, views_count, orders_count, created_at
            FROM products
            WHERE status = 'active' AND stock > 0
            ORDER BY featured DESC, orders_count DESC, name ASC
            LIMIT ?
            "#,
        )
        .bind(limit.clamp(1, 100) as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }

    async fn decrement_stock(
        &self,
        id: &ProductId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        // The guarded UPDATE is the check-and-decrement: it only applies
        // when stock covers the quantity, so two racing commits can never
        // both succeed on the last unit.
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - ?2,
                status = CASE WHEN stock - ?2 = 0 THEN 'out_of_stock' ELSE status END,
                orders_count = orders_count + 1
            WHERE id = ?1 AND status = 'active' AND stock >= ?2
            "#,
        )
        .bind(&id.0)
        .bind(quantity as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let row = sqlx::query("SELECT stock, status FROM products WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            None => Err(RepositoryError::NotFound(format!("product {}", id.0))),
            Some(row) => {
                let status_raw: String = row.try_get("status")?;
                let available = if status_raw == "active" {
                    row.try_get::<i64, _>("stock")?.max(0) as u32
                } else {
                    0
                };
                Err(RepositoryError::InsufficientStock { product_id: id.0.clone(), available })
            }
        }
    }

    async fn restock(&self, id: &ProductId, quantity: u32) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?2,
                status = CASE WHEN status = 'out_of_stock' THEN 'active' ELSE status END
            WHERE id = ?1
            "#,
        )
        .bind(&id.0)
        .bind(quantity as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("product {}", id.0)));
        }
        Ok(())
    }

    async fn record_view(&self, id: &ProductId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE products SET views_count = views_count + 1 WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, price, stock, category, status,
                featured, views_count, orders_count, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                price = excluded.price,
                stock = excluded.stock,
                category = excluded.category,
                status = excluded.status,
                featured = excluded.featured,
                views_count = excluded.views_count,
                orders_count = excluded.orders_count
            "#,
        )
        .bind(&product.id.0)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.to_string())
        .bind(product.stock as i64)
        .bind(&product.category)
        .bind(product.status.as_str())
        .bind(product.featured)
        .bind(product.views_count as i64)
        .bind(product.orders_count as i64)
        .bind(product.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn product_from_row(row: &SqliteRow) -> Result<Product, RepositoryError> {
    let status_raw: String = row.try_get("status")?;
    let status = ProductStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("invalid product status: {status_raw}")))?;

    Ok(Product {
        id: ProductId(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: parse_decimal("product price", &row.try_get::<String, _>("price")?)?,
        stock: row.try_get::<i64, _>("stock")?.max(0) as u32,
        category: row.try_get("category")?,
        status,
        featured: row.try_get("featured")?,
        views_count: row.try_get::<i64, _>("views_count")? as u64,
        orders_count: row.try_get::<i64, _>("orders_count")? as u64,
        created_at: parse_rfc3339("product created_at", &row.try_get::<String, _>("created_at")?)?,
    })
}
