//! In-memory repository implementations for tests and local experiments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use kiosk_core::domain::customer::{Customer, CustomerId};
use kiosk_core::domain::order::{Order, OrderId, OrderStatus};
use kiosk_core::domain::product::{Product, ProductId};

use super::{CustomerRepository, OrderRepository, ProductRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryCustomerRepository {
    customers: Arc<RwLock<HashMap<CustomerId, Customer>>>,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_or_create(
        &self,
        id: &CustomerId,
        now: DateTime<Utc>,
    ) -> Result<Customer, RepositoryError> {
        let mut customers = self.customers.write().await;
        Ok(customers.entry(id.clone()).or_insert_with(|| Customer::new(id.clone(), now)).clone())
    }

    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        Ok(self.customers.read().await.get(id).cloned())
    }

    async fn save(&self, customer: Customer) -> Result<(), RepositoryError> {
        self.customers.write().await.insert(customer.id.clone(), customer);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products.read().await.get(id).cloned())
    }

    async fn list_active(&self, limit: usize) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        let mut active: Vec<Product> =
            products.values().filter(|product| product.is_orderable()).cloned().collect();
        active.sort_by(|a, b| {
            b.featured
                .cmp(&a.featured)
                .then(b.orders_count.cmp(&a.orders_count))
                .then(a.name.cmp(&b.name))
        });
        active.truncate(limit);
        Ok(active)
    }

    async fn decrement_stock(
        &self,
        id: &ProductId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(format!("product {}", id.0)))?;
        if !product.is_orderable() {
            return Err(RepositoryError::InsufficientStock {
                product_id: id.0.clone(),
                available: 0,
            });
        }
        if product.stock < quantity {
            return Err(RepositoryError::InsufficientStock {
                product_id: id.0.clone(),
                available: product.stock,
            });
        }
        product.remove_stock(quantity);
        product.orders_count += 1;
        Ok(())
    }

    async fn restock(&self, id: &ProductId, quantity: u32) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(format!("product {}", id.0)))?;
        product.add_stock(quantity);
        Ok(())
    }

    async fn record_view(&self, id: &ProductId) -> Result<(), RepositoryError> {
        if let Some(product) = self.products.write().await.get_mut(id) {
            product.views_count += 1;
        }
        Ok(())
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        self.products.write().await.insert(product.id.clone(), product);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    sequences: Arc<Mutex<HashMap<String, i64>>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn allocate_order_id(&self, now: DateTime<Utc>) -> Result<OrderId, RepositoryError> {
        let period = now.format("%y%m").to_string();
        let mut sequences = self.sequences.lock().await;
        let seq = sequences.entry(period.clone()).or_insert(0);
        *seq += 1;
        Ok(OrderId(format!("ORD-{period}-{:04}", *seq)))
    }

    async fn create(&self, order: Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(RepositoryError::Decode(format!("duplicate order id {}", order.id.0)));
        }
        orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.read().await.get(id).cloned())
    }

    async fn list_recent_for_customer(
        &self,
        customer_id: &CustomerId,
        limit: usize,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        let mut matching: Vec<Order> =
            orders.values().filter(|order| &order.customer_id == customer_id).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn list_open_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        let mut matching: Vec<Order> = orders
            .values()
            .filter(|order| &order.customer_id == customer_id && order.status.is_open())
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matching)
    }

    async fn list_by_status(
        &self,
        status: Option<OrderStatus>,
        limit: usize,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        let mut matching: Vec<Order> = orders
            .values()
            .filter(|order| status.map_or(true, |wanted| order.status == wanted))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn save(&self, order: Order) -> Result<(), RepositoryError> {
        self.orders.write().await.insert(order.id.clone(), order);
        Ok(())
    }
}
