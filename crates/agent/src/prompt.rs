use std::fmt::Write as _;

use kiosk_core::config::BusinessConfig;
use kiosk_core::domain::customer::Customer;
use kiosk_core::domain::order::Order;
use kiosk_core::domain::product::Product;
use kiosk_core::session::{Turn, TurnRole};

/// Everything the classification prompt needs about the current turn.
pub struct TurnContext<'a> {
    pub message: &'a str,
    pub customer: &'a Customer,
    pub products: &'a [Product],
    pub open_orders: &'a [Order],
    pub turns: &'a [Turn],
    pub business: &'a BusinessConfig,
}

/// Renders the single-shot classification prompt. The instructions pin the
/// reply to a JSON object with a closed action set; everything else in the
/// prompt is context to classify against.
pub fn build_prompt(context: &TurnContext<'_>) -> String {
    let currency = &context.business.currency_symbol;
    let mut prompt = format!(
        "You are a chat storefront assistant for {name}. Help customers browse \
         products, place orders, and track deliveries. Be friendly and concise.\n\n",
        name = context.business.name,
    );

    prompt.push_str("## Customer\n");
    let customer = context.customer;
    let _ = writeln!(prompt, "- Name: {}", customer.name.as_deref().unwrap_or("New Customer"));
    let _ = writeln!(prompt, "- Previous orders: {}", customer.total_orders);
    let _ = writeln!(prompt, "- Total spent: {currency}{}", customer.total_spent);
    match customer.vip_tier {
        Some(tier) => {
            let _ = writeln!(prompt, "- VIP: yes ({})", tier.label());
        }
        None => {
            let _ = writeln!(prompt, "- VIP: no");
        }
    }

    prompt.push_str("\n## Available Products\n");
    if context.products.is_empty() {
        prompt.push_str("No products available.\n");
    } else {
        for product in context.products {
            let _ = writeln!(
                prompt,
                "- {id}: {name} | {currency}{price} | Stock: {stock} | Category: {category}",
                id = product.id.0,
                name = product.name,
                price = product.price,
                stock = product.stock,
                category = product.category,
            );
        }
    }

    prompt.push_str("\n## Active Orders\n");
    if context.open_orders.is_empty() {
        prompt.push_str("No active orders.\n");
    } else {
        for order in context.open_orders {
            let _ = writeln!(
                prompt,
                "- {id} | Status: {status} | Total: {currency}{total}",
                id = order.id.0,
                status = order.status.as_str(),
                total = order.pricing.total,
            );
        }
    }

    prompt.push_str("\n## Recent Conversation\n");
    if context.turns.is_empty() {
        prompt.push_str("First interaction.\n");
    } else {
        for turn in context.turns.iter().rev().take(3).rev() {
            let role = match turn.role {
                TurnRole::Customer => "customer",
                TurnRole::Assistant => "assistant",
            };
            let _ = writeln!(prompt, "{role}: {}", turn.text);
        }
    }

    let _ = write!(
        prompt,
        "\n## Business\n\
         - Support: {phone} / {email}\n\
         - Payment: Cash on Delivery, Bank Transfer\n\
         - Free delivery on orders above {currency}{free_minimum}\n\n\
         ## Customer Message\n\
         \"{message}\"\n\n\
         ## Your Task\n\
         Respond ONLY with valid JSON in exactly this shape, no markdown, no code fences:\n\
         {{\n\
           \"message\": \"your reply to the customer\",\n\
           \"action\": \"browse_products|place_order|track_order|escalate|general_inquiry\",\n\
           \"requiresHuman\": false,\n\
           \"suggestedProducts\": [\"PRD-001\"],\n\
           \"orderIntent\": {{ \"productId\": \"PRD-001\", \"quantity\": 1 }}\n\
         }}\n\
         Omit orderIntent unless the customer clearly wants to buy a specific product. \
         Escalate for refunds, complaints, damaged goods, or anything you cannot resolve.",
        phone = context.business.support_phone,
        email = context.business.support_email,
        free_minimum = context.business.free_delivery_minimum,
        message = context.message,
    );

    prompt
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use kiosk_core::config::BusinessConfig;
    use kiosk_core::domain::customer::{Customer, CustomerId};
    use kiosk_core::domain::product::{Product, ProductId, ProductStatus};
    use kiosk_core::session::{Turn, TurnRole};

    use super::{build_prompt, TurnContext};

    #[test]
    fn prompt_includes_catalog_history_and_message() {
        let customer = Customer::new(CustomerId("2348012345678".to_string()), Utc::now());
        let products = vec![Product {
            id: ProductId("PRD-001".to_string()),
            name: "Wireless Earbuds".to_string(),
            description: String::new(),
            price: Decimal::new(50_000, 0),
            stock: 5,
            category: "audio".to_string(),
            status: ProductStatus::Active,
            featured: false,
            views_count: 0,
            orders_count: 0,
            created_at: Utc::now(),
        }];
        let turns = vec![Turn {
            role: TurnRole::Customer,
            text: "do you sell earbuds?".to_string(),
            at: Utc::now(),
        }];
        let business = BusinessConfig::default();

        let prompt = build_prompt(&TurnContext {
            message: "I want the earbuds",
            customer: &customer,
            products: &products,
            open_orders: &[],
            turns: &turns,
            business: &business,
        });

        assert!(prompt.contains("PRD-001: Wireless Earbuds"));
        assert!(prompt.contains("customer: do you sell earbuds?"));
        assert!(prompt.contains("\"I want the earbuds\""));
        assert!(prompt.contains("browse_products|place_order|track_order|escalate|general_inquiry"));
    }

    #[test]
    fn history_is_truncated_to_the_last_three_turns() {
        let customer = Customer::new(CustomerId("2348012345678".to_string()), Utc::now());
        let turns: Vec<Turn> = (0..6)
            .map(|i| Turn {
                role: TurnRole::Customer,
                text: format!("message {i}"),
                at: Utc::now(),
            })
            .collect();
        let business = BusinessConfig::default();

        let prompt = build_prompt(&TurnContext {
            message: "hello",
            customer: &customer,
            products: &[],
            open_orders: &[],
            turns: &turns,
            business: &business,
        });

        assert!(!prompt.contains("message 2"));
        assert!(prompt.contains("message 3"));
        assert!(prompt.contains("message 5"));
    }
}
