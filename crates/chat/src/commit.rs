//! Order commit: the only path that turns a confirmed negotiation into a
//! persisted order. Stock is the contended resource, so the decrement is the
//! single atomic step; everything after it either succeeds or compensates.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use kiosk_core::domain::customer::{Customer, OrderSummary};
use kiosk_core::domain::order::{DeliveryDetails, LineItem, Order, PaymentMethod};
use kiosk_core::negotiation::Negotiation;
use kiosk_db::repositories::{
    CustomerRepository, OrderRepository, ProductRepository, RepositoryError,
};

#[derive(Debug, Error)]
pub enum CommitError {
    /// Stock can no longer cover the negotiated quantity. `available` is the
    /// number of units the customer could still order (zero when the product
    /// is gone or inactive).
    #[error("insufficient stock: {available} unit(s) available")]
    InsufficientStock { available: u32 },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct OrderCommitService {
    customers: Arc<dyn CustomerRepository>,
    products: Arc<dyn ProductRepository>,
    orders: Arc<dyn OrderRepository>,
}

impl OrderCommitService {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        products: Arc<dyn ProductRepository>,
        orders: Arc<dyn OrderRepository>,
    ) -> Self {
        Self { customers, products, orders }
    }

    /// Commits a confirmed negotiation:
    /// 1. allocate the order id (ids are never reused, even on failure)
    /// 2. atomically decrement stock - the race-deciding step
    /// 3. persist the order; on failure, restock to compensate
    /// 4. update the customer aggregates (best effort - the order stands)
    ///
    /// The caller holds the per-customer lock, so one customer cannot have
    /// two commits in flight; cross-customer races are decided by step 2.
    pub async fn commit(
        &self,
        customer: &mut Customer,
        negotiation: &Negotiation,
        payment_method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<Order, CommitError> {
        let address = negotiation
            .address
            .clone()
            .ok_or_else(|| RepositoryError::Decode("negotiation has no address".to_string()))?;
        let zone = negotiation
            .zone
            .clone()
            .ok_or_else(|| RepositoryError::Decode("negotiation has no zone quote".to_string()))?;
        let pricing = negotiation
            .pricing
            .clone()
            .ok_or_else(|| RepositoryError::Decode("negotiation has no pricing".to_string()))?;

        let order_id = self.orders.allocate_order_id(now).await?;

        match self.products.decrement_stock(&negotiation.product.id, negotiation.quantity).await {
            Ok(()) => {}
            Err(RepositoryError::InsufficientStock { available, .. }) => {
                return Err(CommitError::InsufficientStock { available });
            }
            Err(RepositoryError::NotFound(_)) => {
                return Err(CommitError::InsufficientStock { available: 0 });
            }
            Err(err) => return Err(err.into()),
        }

        let order = Order::new(
            order_id,
            customer.id.clone(),
            customer.name.clone(),
            vec![LineItem::new(
                negotiation.product.id.clone(),
                negotiation.product.name.clone(),
                negotiation.product.unit_price,
                negotiation.quantity,
            )],
            pricing.delivery_fee,
            pricing.discount,
            DeliveryDetails {
                address,
                zone: zone.zone,
                estimated_days: zone.estimated_days,
            },
            payment_method,
            now,
        );

        if let Err(err) = self.orders.create(order.clone()).await {
            tracing::error!(
                event_name = "order_create_failed",
                order_id = %order.id.0,
                error = %err,
                "order persistence failed after stock decrement, restocking",
            );
            if let Err(restock_err) =
                self.products.restock(&negotiation.product.id, negotiation.quantity).await
            {
                tracing::error!(
                    event_name = "order_restock_failed",
                    product_id = %negotiation.product.id.0,
                    quantity = negotiation.quantity,
                    error = %restock_err,
                    "compensating restock failed, stock requires manual correction",
                );
            }
            return Err(err.into());
        }

        customer.record_order(
            OrderSummary {
                order_id: order.id.clone(),
                total: order.pricing.total,
                placed_at: now,
                status: order.status,
            },
            now,
        );
        customer.clear_cart();
        if let Err(err) = self.customers.save(customer.clone()).await {
            // The order is already committed; aggregates catch up on the
            // next successful save.
            tracing::warn!(
                event_name = "customer_aggregate_save_failed",
                customer_id = %customer.id.0,
                order_id = %order.id.0,
                error = %err,
                "customer aggregate update failed after order commit",
            );
        }

        tracing::info!(
            event_name = "order_committed",
            order_id = %order.id.0,
            customer_id = %customer.id.0,
            total = %order.pricing.total,
            payment_method = payment_method.as_str(),
            "order committed",
        );

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use kiosk_core::domain::customer::{Address, Customer, CustomerId};
    use kiosk_core::domain::order::{OrderStatus, PaymentMethod};
    use kiosk_core::domain::product::{Product, ProductId, ProductStatus};
    use kiosk_core::negotiation::Negotiation;
    use kiosk_core::pricing::FeeSchedule;
    use kiosk_db::repositories::{
        CustomerRepository, InMemoryCustomerRepository, InMemoryOrderRepository,
        InMemoryProductRepository, OrderRepository, ProductRepository,
    };

    use super::{CommitError, OrderCommitService};

    struct Fixture {
        customers: Arc<InMemoryCustomerRepository>,
        products: Arc<InMemoryProductRepository>,
        orders: Arc<InMemoryOrderRepository>,
        service: OrderCommitService,
    }

    fn fixture() -> Fixture {
        let customers = Arc::new(InMemoryCustomerRepository::new());
        let products = Arc::new(InMemoryProductRepository::new());
        let orders = Arc::new(InMemoryOrderRepository::new());
        let service = OrderCommitService::new(customers.clone(), products.clone(), orders.clone());
        Fixture { customers, products, orders, service }
    }

    fn earbuds(stock: u32) -> Product {
        Product {
            id: ProductId("PRD-001".to_string()),
            name: "Wireless Earbuds".to_string(),
            description: String::new(),
            price: Decimal::new(50_000, 0),
            stock,
            category: "audio".to_string(),
            status: ProductStatus::Active,
            featured: false,
            views_count: 0,
            orders_count: 0,
            created_at: Utc::now(),
        }
    }

    fn ogun_address() -> Address {
        Address {
            street: "4 Stadium Road".to_string(),
            city: "Abeokuta".to_string(),
            region: "Ogun".to_string(),
            landmark: None,
            is_default: true,
        }
    }

    #[tokio::test]
    async fn commit_persists_order_and_updates_aggregates() {
        let fixture = fixture();
        let schedule = FeeSchedule { free_delivery_minimum: Decimal::new(150_000, 0), ..FeeSchedule::default() };
        fixture.products.save(earbuds(5)).await.expect("save product");
        let mut customer = Customer::new(CustomerId("2348012345678".to_string()), Utc::now());
        let negotiation = Negotiation::awaiting_confirmation(
            earbuds(5).snapshot(),
            2,
            ogun_address(),
            &schedule,
            Utc::now(),
        );

        let order = fixture
            .service
            .commit(&mut customer, &negotiation, PaymentMethod::CashOnDelivery, Utc::now())
            .await
            .expect("commit");

        // 2 x 50,000 + 3,000 delivery to a South-West zone.
        assert_eq!(order.pricing.total, Decimal::new(103_000, 0));
        assert_eq!(order.status, OrderStatus::Pending);

        let product = fixture
            .products
            .find_by_id(&ProductId("PRD-001".to_string()))
            .await
            .expect("find")
            .expect("present");
        assert_eq!(product.stock, 3);

        assert_eq!(customer.total_orders, 1);
        assert_eq!(customer.loyalty_points, 1_030);
        let saved = fixture
            .customers
            .find_by_id(&customer.id)
            .await
            .expect("find")
            .expect("present");
        assert_eq!(saved.total_orders, 1);

        let stored = fixture.orders.find_by_id(&order.id).await.expect("find").expect("present");
        assert_eq!(stored.pricing.total, order.pricing.total);
    }

    #[tokio::test]
    async fn commit_fails_closed_when_stock_cannot_cover() {
        let fixture = fixture();
        let schedule = FeeSchedule::default();
        fixture.products.save(earbuds(1)).await.expect("save product");
        let mut customer = Customer::new(CustomerId("2348012345678".to_string()), Utc::now());
        let negotiation = Negotiation::awaiting_confirmation(
            earbuds(1).snapshot(),
            2,
            ogun_address(),
            &schedule,
            Utc::now(),
        );

        let err = fixture
            .service
            .commit(&mut customer, &negotiation, PaymentMethod::Transfer, Utc::now())
            .await
            .expect_err("cannot oversell");
        match err {
            CommitError::InsufficientStock { available } => assert_eq!(available, 1),
            other => panic!("unexpected error: {other}"),
        }

        // Nothing committed: stock intact, no order, aggregates untouched.
        let product = fixture
            .products
            .find_by_id(&ProductId("PRD-001".to_string()))
            .await
            .expect("find")
            .expect("present");
        assert_eq!(product.stock, 1);
        assert_eq!(customer.total_orders, 0);
        assert!(fixture
            .orders
            .list_recent_for_customer(&customer.id, 10)
            .await
            .expect("list")
            .is_empty());
    }

    #[tokio::test]
    async fn racing_commits_on_the_last_unit_admit_exactly_one() {
        let fixture = fixture();
        let schedule = FeeSchedule::default();
        fixture.products.save(earbuds(1)).await.expect("save product");

        let mut ada = Customer::new(CustomerId("2348000000001".to_string()), Utc::now());
        let mut bola = Customer::new(CustomerId("2348000000002".to_string()), Utc::now());
        let negotiation = |customer_region: &str| {
            Negotiation::awaiting_confirmation(
                earbuds(1).snapshot(),
                1,
                Address { region: customer_region.to_string(), ..ogun_address() },
                &schedule,
                Utc::now(),
            )
        };

        let first = fixture
            .service
            .commit(&mut ada, &negotiation("Ogun"), PaymentMethod::CashOnDelivery, Utc::now())
            .await;
        let second = fixture
            .service
            .commit(&mut bola, &negotiation("Lagos"), PaymentMethod::CashOnDelivery, Utc::now())
            .await;

        assert!(first.is_ok());
        match second {
            Err(CommitError::InsufficientStock { available: 0 }) => {}
            other => panic!("expected zero availability, got {other:?}"),
        }

        let product = fixture
            .products
            .find_by_id(&ProductId("PRD-001".to_string()))
            .await
            .expect("find")
            .expect("present");
        assert_eq!(product.stock, 0);
    }
}
