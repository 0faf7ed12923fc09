//! Operator side-channel. Messages from the configured admin sender that
//! start with the command prefix bypass the customer pipeline entirely: no
//! session, no oracle, no negotiation state is touched.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Utc;

use kiosk_core::config::BusinessConfig;
use kiosk_core::domain::order::{OrderId, OrderStatus};
use kiosk_core::domain::product::{ProductId, ProductStatus};
use kiosk_db::repositories::{OrderRepository, ProductRepository};

use crate::messages::format_amount;

const LIST_LIMIT: usize = 10;

pub struct AdminRouter {
    orders: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
    business: BusinessConfig,
}

impl AdminRouter {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        products: Arc<dyn ProductRepository>,
        business: BusinessConfig,
    ) -> Self {
        Self { orders, products, business }
    }

    /// True when the sender is the configured admin and the text carries the
    /// command prefix. Non-admin senders never reach command handling, so a
    /// customer typing "!orders" gets the normal pipeline.
    pub fn is_admin_command(
        &self,
        admin_id: Option<&str>,
        prefix: &str,
        sender_id: &str,
        text: &str,
    ) -> bool {
        admin_id == Some(sender_id) && text.trim_start().starts_with(prefix)
    }

    pub async fn handle(&self, text: &str) -> String {
        let mut parts = text.trim().split_whitespace();
        let Some(command) = parts.next() else {
            return self.help();
        };
        let args: Vec<&str> = parts.collect();

        tracing::info!(event_name = "admin_command", command = %command, "handling admin command");

        match command.to_lowercase().as_str() {
            "!help" => self.help(),
            "!orders" => self.orders_list(args.first().copied()).await,
            "!updateorder" => self.update_order(&args).await,
            "!products" => self.products_list().await,
            "!updatestock" => self.update_stock(&args).await,
            other => {
                format!("Unknown command: {other}\n\nReply \"!help\" to see available commands.")
            }
        }
    }

    fn help(&self) -> String {
        "🤖 *ADMIN COMMANDS*\n\n\
         *Order Management:*\n\
         !orders [status] - View orders (pending, confirmed, all)\n\
         !updateorder <orderId> <status> - Update order status\n\n\
         *Product Management:*\n\
         !products - List all products\n\
         !updatestock <productId> <quantity> - Set stock level\n\n\
         *System:*\n\
         !help - Show this help message\n\n\
         Examples:\n\
         • !orders pending\n\
         • !updateorder ORD-2608-0001 confirmed\n\
         • !updatestock PRD-001 50"
            .to_string()
    }

    async fn orders_list(&self, filter: Option<&str>) -> String {
        let filter = filter.unwrap_or("pending");
        let status = if filter == "all" {
            None
        } else {
            match OrderStatus::parse(filter) {
                Some(status) => Some(status),
                None => {
                    return format!(
                        "Unknown status \"{filter}\". Use pending, confirmed, processing, \
                         shipped, delivered, cancelled, or all."
                    )
                }
            }
        };

        let orders = match self.orders.list_by_status(status, LIST_LIMIT).await {
            Ok(orders) => orders,
            Err(err) => {
                tracing::error!(event_name = "admin_orders_failed", error = %err, "order listing failed");
                return "Error retrieving orders.".to_string();
            }
        };

        if orders.is_empty() {
            return format!("No {filter} orders found.");
        }

        let currency = &self.business.currency_symbol;
        let mut message = format!("📦 *{} ORDERS* ({})\n\n", filter.to_uppercase(), orders.len());
        for order in &orders {
            let _ = write!(
                message,
                "*{id}*\n\
                 Customer: {customer}\n\
                 Items: {items} | Total: {currency}{total}\n\
                 Payment: {payment} ({payment_status})\n\
                 State: {region}\n\
                 ─────────────\n",
                id = order.id.0,
                customer = order.customer_name.as_deref().unwrap_or(&order.customer_id.0),
                items = order.items.len(),
                total = format_amount(order.pricing.total),
                payment = order.payment_method.label(),
                payment_status = order.payment_status.as_str(),
                region = order.delivery.address.region,
            );
        }
        message.push_str("\nTo update an order:\n!updateorder <orderId> <status>");
        message
    }

    /// `!updateorder <orderId> <status>` drives the order lifecycle. Jumps
    /// the status machine forbids, like shipping a pending order, are
    /// rejected with both statuses named.
    async fn update_order(&self, args: &[&str]) -> String {
        let (Some(order_id), Some(status_raw)) = (args.first(), args.get(1)) else {
            return "Usage: !updateorder <orderId> <status>\n\n\
                    Example: !updateorder ORD-2608-0001 confirmed"
                .to_string();
        };
        let Some(next) = OrderStatus::parse(&status_raw.to_lowercase()) else {
            return format!(
                "Unknown status \"{status_raw}\". Use pending, confirmed, processing, \
                 shipped, delivered, or cancelled."
            );
        };

        let id = OrderId(order_id.to_string());
        let mut order = match self.orders.find_by_id(&id).await {
            Ok(Some(order)) => order,
            Ok(None) => return format!("Order {order_id} not found."),
            Err(err) => {
                tracing::error!(event_name = "admin_updateorder_failed", error = %err, "order lookup failed");
                return "Error updating order.".to_string();
            }
        };

        let previous = order.status;
        if order.transition_to(next, "status updated", "admin", Utc::now()).is_err() {
            return format!(
                "Cannot move {order_id} from {} to {}.",
                previous.as_str(),
                next.as_str(),
            );
        }
        if let Err(err) = self.orders.save(order).await {
            tracing::error!(event_name = "admin_updateorder_failed", error = %err, "order save failed");
            return "Error updating order.".to_string();
        }

        format!(
            "✅ Order updated!\n\n\
             Order: {order_id}\n\
             Old Status: {}\n\
             New Status: {}",
            previous.as_str(),
            next.as_str(),
        )
    }

    async fn products_list(&self) -> String {
        let products = match self.products.list_active(20).await {
            Ok(products) => products,
            Err(err) => {
                tracing::error!(event_name = "admin_products_failed", error = %err, "product listing failed");
                return "Error retrieving products.".to_string();
            }
        };

        if products.is_empty() {
            return "No products found.".to_string();
        }

        let currency = &self.business.currency_symbol;
        let mut message = format!("📦 *PRODUCTS* ({})\n\n", products.len());
        for product in &products {
            let stock_status =
                if product.stock > 0 { format!("✅ {}", product.stock) } else { "❌ Out".to_string() };
            let _ = write!(
                message,
                "*{id}* - {name}\n\
                 Price: {currency}{price} | Stock: {stock_status}\n\
                 Category: {category} | Orders: {orders}\n\
                 ─────────────\n",
                id = product.id.0,
                name = product.name,
                price = format_amount(product.price),
                category = product.category,
                orders = product.orders_count,
            );
        }
        message
    }

    /// `!updatestock <productId> <quantity>` sets the absolute stock level,
    /// reactivating an out-of-stock product when the new level is positive.
    async fn update_stock(&self, args: &[&str]) -> String {
        let (Some(product_id), Some(quantity_raw)) = (args.first(), args.get(1)) else {
            return "Usage: !updatestock <productId> <quantity>\n\nExample: !updatestock PRD-001 50"
                .to_string();
        };
        let Ok(quantity) = quantity_raw.parse::<u32>() else {
            return "Invalid quantity. Please provide a non-negative number.".to_string();
        };

        let id = ProductId(product_id.to_string());
        let mut product = match self.products.find_by_id(&id).await {
            Ok(Some(product)) => product,
            Ok(None) => return format!("Product {product_id} not found."),
            Err(err) => {
                tracing::error!(event_name = "admin_updatestock_failed", error = %err, "stock lookup failed");
                return "Error updating stock.".to_string();
            }
        };

        let old_stock = product.stock;
        product.stock = quantity;
        if quantity > 0 && product.status == ProductStatus::OutOfStock {
            product.status = ProductStatus::Active;
        } else if quantity == 0 && product.status == ProductStatus::Active {
            product.status = ProductStatus::OutOfStock;
        }
        let status = product.status;

        if let Err(err) = self.products.save(product).await {
            tracing::error!(event_name = "admin_updatestock_failed", error = %err, "stock save failed");
            return "Error updating stock.".to_string();
        }

        format!(
            "✅ Stock updated successfully!\n\n\
             Product: {product_id}\n\
             Old Stock: {old_stock}\n\
             New Stock: {quantity}\n\
             Status: {}",
            status.as_str(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use kiosk_core::config::BusinessConfig;
    use kiosk_core::domain::customer::{Address, CustomerId};
    use kiosk_core::domain::order::{
        DeliveryDetails, LineItem, Order, OrderId, OrderStatus, PaymentMethod, PaymentStatus,
    };
    use kiosk_core::domain::product::{Product, ProductId, ProductStatus};
    use kiosk_db::repositories::{
        InMemoryOrderRepository, InMemoryProductRepository, OrderRepository, ProductRepository,
    };

    use super::AdminRouter;

    fn router(products: Arc<InMemoryProductRepository>) -> AdminRouter {
        AdminRouter::new(
            Arc::new(InMemoryOrderRepository::new()),
            products,
            BusinessConfig::default(),
        )
    }

    fn router_with_orders(orders: Arc<InMemoryOrderRepository>) -> AdminRouter {
        AdminRouter::new(orders, Arc::new(InMemoryProductRepository::new()), BusinessConfig::default())
    }

    fn pending_order() -> Order {
        Order::new(
            OrderId("ORD-2608-0001".to_string()),
            CustomerId("2348012345678".to_string()),
            Some("Ada".to_string()),
            vec![LineItem::new(
                ProductId("PRD-001".to_string()),
                "Wireless Earbuds".to_string(),
                Decimal::new(50_000, 0),
                1,
            )],
            Decimal::new(2_000, 0),
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

    fn drained_product() -> Product {
        Product {
            id: ProductId("PRD-001".to_string()),
            name: "Wireless Earbuds".to_string(),
            description: String::new(),
            price: Decimal::new(50_000, 0),
            stock: 0,
            category: "audio".to_string(),
            status: ProductStatus::OutOfStock,
            featured: false,
            views_count: 0,
            orders_count: 0,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn only_the_admin_sender_with_prefix_is_routed() {
        let router = router(Arc::new(InMemoryProductRepository::new()));
        assert!(router.is_admin_command(Some("234809"), "!", "234809", "!orders"));
        assert!(!router.is_admin_command(Some("234809"), "!", "234801", "!orders"));
        assert!(!router.is_admin_command(Some("234809"), "!", "234809", "show me orders"));
        assert!(!router.is_admin_command(None, "!", "234809", "!orders"));
    }

    #[tokio::test]
    async fn updatestock_sets_level_and_reactivates() {
        let products = Arc::new(InMemoryProductRepository::new());
        products.save(drained_product()).await.expect("save");
        let router = router(products.clone());

        let reply = router.handle("!updatestock PRD-001 50").await;
        assert!(reply.contains("New Stock: 50"));
        assert!(reply.contains("Status: active"));

        let product = products
            .find_by_id(&ProductId("PRD-001".to_string()))
            .await
            .expect("find")
            .expect("present");
        assert_eq!(product.stock, 50);
        assert_eq!(product.status, ProductStatus::Active);
    }

    #[tokio::test]
    async fn updateorder_advances_the_lifecycle_and_persists_history() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        orders.create(pending_order()).await.expect("create");
        let router = router_with_orders(orders.clone());

        let reply = router.handle("!updateorder ORD-2608-0001 confirmed").await;
        assert!(reply.contains("Order updated!"));
        assert!(reply.contains("Old Status: pending"));
        assert!(reply.contains("New Status: confirmed"));

        let order = orders
            .find_by_id(&OrderId("ORD-2608-0001".to_string()))
            .await
            .expect("find")
            .expect("present");
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.status_history.len(), 2);
        assert_eq!(order.status_history[1].updated_by, "admin");
    }

    #[tokio::test]
    async fn updateorder_marks_payment_collected_on_delivery() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        orders.create(pending_order()).await.expect("create");
        let router = router_with_orders(orders.clone());

        router.handle("!updateorder ORD-2608-0001 confirmed").await;
        router.handle("!updateorder ORD-2608-0001 processing").await;
        router.handle("!updateorder ORD-2608-0001 shipped").await;
        let reply = router.handle("!updateorder ORD-2608-0001 delivered").await;
        assert!(reply.contains("New Status: delivered"));

        let order = orders
            .find_by_id(&OrderId("ORD-2608-0001".to_string()))
            .await
            .expect("find")
            .expect("present");
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn updateorder_rejects_forbidden_jumps_and_bad_input() {
        let orders = Arc::new(InMemoryOrderRepository::new());
        orders.create(pending_order()).await.expect("create");
        let router = router_with_orders(orders.clone());

        let reply = router.handle("!updateorder ORD-2608-0001 shipped").await;
        assert!(reply.contains("Cannot move ORD-2608-0001 from pending to shipped"));

        let reply = router.handle("!updateorder ORD-2608-0001 teleported").await;
        assert!(reply.contains("Unknown status"));

        let reply = router.handle("!updateorder ORD-9999-0001 confirmed").await;
        assert!(reply.contains("not found"));

        let reply = router.handle("!updateorder").await;
        assert!(reply.contains("Usage: !updateorder"));

        // The rejected jump left the order untouched.
        let order = orders
            .find_by_id(&OrderId("ORD-2608-0001".to_string()))
            .await
            .expect("find")
            .expect("present");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.status_history.len(), 1);
    }

    #[tokio::test]
    async fn unknown_command_points_at_help() {
        let router = router(Arc::new(InMemoryProductRepository::new()));
        let reply = router.handle("!analytics").await;
        assert!(reply.contains("Unknown command"));
        assert!(reply.contains("!help"));
    }

    #[tokio::test]
    async fn orders_rejects_unknown_status_filter() {
        let router = router(Arc::new(InMemoryProductRepository::new()));
        let reply = router.handle("!orders sideways").await;
        assert!(reply.contains("Unknown status"));
    }
}
