use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

use kiosk_core::domain::customer::{Address, CustomerId, OrderSummary};
use kiosk_core::domain::order::{
    DeliveryDetails, LineItem, Order, OrderStatus, PaymentMethod,
};
use kiosk_core::domain::product::{Product, ProductId, ProductStatus};
use kiosk_db::repositories::{
    CustomerRepository, OrderRepository, ProductRepository, RepositoryError,
    SqlCustomerRepository, SqlOrderRepository, SqlProductRepository,
};
use kiosk_core::config::DatabaseConfig;
use kiosk_db::{connect, migrations, DbPool};

async fn test_pool() -> DbPool {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        acquire_timeout_secs: 5,
    };
    let pool = connect(&config).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrate");
    pool
}

fn earbuds(stock: u32) -> Product {
    Product {
        id: ProductId("PRD-001".to_string()),
        name: "Wireless Earbuds".to_string(),
        description: "Noise-cancelling earbuds".to_string(),
        price: Decimal::new(50_000, 0),
        stock,
        category: "audio".to_string(),
        status: ProductStatus::Active,
        featured: true,
        views_count: 0,
        orders_count: 0,
        created_at: Utc::now(),
    }
}

fn lagos_delivery() -> DeliveryDetails {
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
    }
}

#[tokio::test]
async fn customer_round_trips_with_aggregates() {
    let pool = test_pool().await;
    let repo = SqlCustomerRepository::new(pool);
    let id = CustomerId("2348012345678".to_string());

    let mut customer = repo.find_or_create(&id, Utc::now()).await.expect("create");
    assert_eq!(customer.total_orders, 0);

    customer.name = Some("Ada".to_string());
    customer.add_address(Address {
        street: "15 Admiralty Way".to_string(),
        city: "Lekki".to_string(),
        region: "Lagos".to_string(),
        landmark: Some("Near Landmark Beach".to_string()),
        is_default: false,
    });
    customer.record_order(
        OrderSummary {
            order_id: kiosk_core::domain::order::OrderId("ORD-2608-0001".to_string()),
            total: Decimal::new(103_000, 0),
            placed_at: Utc::now(),
            status: OrderStatus::Pending,
        },
        Utc::now(),
    );
    repo.save(customer.clone()).await.expect("save");

    let loaded = repo.find_by_id(&id).await.expect("find").expect("present");
    assert_eq!(loaded.name.as_deref(), Some("Ada"));
    assert_eq!(loaded.total_spent, Decimal::new(103_000, 0));
    assert_eq!(loaded.loyalty_points, 1_030);
    assert_eq!(loaded.addresses.len(), 1);
    assert!(loaded.addresses[0].is_default);
    assert_eq!(loaded.order_history.len(), 1);
}

#[tokio::test]
async fn find_or_create_is_idempotent() {
    let pool = test_pool().await;
    let repo = SqlCustomerRepository::new(pool);
    let id = CustomerId("2348000000009".to_string());

    let first = repo.find_or_create(&id, Utc::now()).await.expect("first");
    let second = repo.find_or_create(&id, Utc::now()).await.expect("second");
    assert_eq!(first.created_at, second.created_at);
}

#[tokio::test]
async fn decrement_is_atomic_and_marks_out_of_stock() {
    let pool = test_pool().await;
    let repo = SqlProductRepository::new(pool);
    repo.save(earbuds(2)).await.expect("save");
    let id = ProductId("PRD-001".to_string());

    repo.decrement_stock(&id, 2).await.expect("covered quantity");
    let drained = repo.find_by_id(&id).await.expect("find").expect("present");
    assert_eq!(drained.stock, 0);
    assert_eq!(drained.status, ProductStatus::OutOfStock);
    assert_eq!(drained.orders_count, 1);

    let err = repo.decrement_stock(&id, 1).await.expect_err("nothing left");
    match err {
        RepositoryError::InsufficientStock { available, .. } => assert_eq!(available, 0),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn restock_reactivates_a_drained_product() {
    let pool = test_pool().await;
    let repo = SqlProductRepository::new(pool);
    repo.save(earbuds(1)).await.expect("save");
    let id = ProductId("PRD-001".to_string());

    repo.decrement_stock(&id, 1).await.expect("drain");
    repo.restock(&id, 1).await.expect("restock");

    let restored = repo.find_by_id(&id).await.expect("find").expect("present");
    assert_eq!(restored.stock, 1);
    assert_eq!(restored.status, ProductStatus::Active);
}

#[tokio::test]
async fn order_ids_are_monotonic_and_reset_per_period() {
    let pool = test_pool().await;
    let repo = SqlOrderRepository::new(pool);
    let august = Utc.with_ymd_and_hms(2026, 8, 15, 12, 0, 0).unwrap();
    let september = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();

    assert_eq!(repo.allocate_order_id(august).await.expect("id").0, "ORD-2608-0001");
    assert_eq!(repo.allocate_order_id(august).await.expect("id").0, "ORD-2608-0002");
    assert_eq!(repo.allocate_order_id(september).await.expect("id").0, "ORD-2609-0001");
}

#[tokio::test]
async fn orders_round_trip_and_filter_by_status() {
    let pool = test_pool().await;
    let repo = SqlOrderRepository::new(pool);
    let customer_id = CustomerId("2348012345678".to_string());
    let now = Utc::now();

    let order_id = repo.allocate_order_id(now).await.expect("id");
    let mut order = Order::new(
        order_id.clone(),
        customer_id.clone(),
        Some("Ada".to_string()),
        vec![LineItem::new(
            ProductId("PRD-001".to_string()),
            "Wireless Earbuds".to_string(),
            Decimal::new(50_000, 0),
            2,
        )],
        Decimal::new(3_000, 0),
        Decimal::ZERO,
        lagos_delivery(),
        PaymentMethod::CashOnDelivery,
        now,
    );
    repo.create(order.clone()).await.expect("create");

    let open = repo.list_open_for_customer(&customer_id).await.expect("open");
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].pricing.total, Decimal::new(103_000, 0));

    order.transition_to(OrderStatus::Cancelled, "customer request", "system", now)
        .expect("cancel");
    repo.save(order).await.expect("save");

    assert!(repo.list_open_for_customer(&customer_id).await.expect("open").is_empty());
    let cancelled =
        repo.list_by_status(Some(OrderStatus::Cancelled), 10).await.expect("by status");
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].id, order_id);
    assert_eq!(cancelled[0].status_history.len(), 2);
}
