//! Customer-facing and operator-facing message builders. These are plain
//! string templates; every number shown here is computed elsewhere.

use std::fmt::Write as _;

use rust_decimal::Decimal;

use kiosk_core::config::BusinessConfig;
use kiosk_core::domain::customer::Customer;
use kiosk_core::domain::order::{Order, OrderStatus, PaymentMethod};
use kiosk_core::domain::product::{Product, ProductSnapshot};
use kiosk_core::negotiation::Negotiation;

/// Renders an amount with thousands separators, e.g. `103,000`.
pub fn format_amount(amount: Decimal) -> String {
    let raw = amount.round_dp(2).normalize().to_string();
    let (sign, rest) = raw.strip_prefix('-').map_or(("", raw.as_str()), |rest| ("-", rest));
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (rest, None),
    };

    let mut grouped = String::new();
    let digits: Vec<char> = int_part.chars().collect();
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*digit);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

pub fn address_request(
    product: &ProductSnapshot,
    quantity: u32,
    business: &BusinessConfig,
) -> String {
    let currency = &business.currency_symbol;
    format!(
        "Great choice! 🎉\n\n\
         *{name}*\n\
         Quantity: {quantity}\n\
         Price: {currency}{price}\n\n\
         To complete your order, I need your delivery details:\n\n\
         Please provide:\n\
         1️⃣ Full delivery address\n\
         2️⃣ City\n\
         3️⃣ State\n\
         4️⃣ Landmark (optional)\n\n\
         Example:\n\
         \"15 Admiralty Way, Lekki, Lagos, Near Landmark Beach\"\n\n\
         Please send your address now 📍",
        name = product.name,
        price = format_amount(product.unit_price * Decimal::from(quantity)),
    )
}

pub fn address_retry() -> String {
    "I couldn't read that address. Please send it as:\n\
     \"street, city, state, landmark (optional)\"\n\n\
     Example: \"15 Admiralty Way, Lekki, Lagos, Near Landmark Beach\"\n\n\
     Or reply \"CANCEL\" to cancel this order."
        .to_string()
}

/// The confirmation summary. Only valid once the negotiation has an address,
/// pricing, and zone; missing slots render as a re-prompt instead.
pub fn order_summary(negotiation: &Negotiation, business: &BusinessConfig) -> String {
    let currency = &business.currency_symbol;
    let (Some(address), Some(pricing), Some(zone)) =
        (&negotiation.address, &negotiation.pricing, &negotiation.zone)
    else {
        return address_retry();
    };

    let free_delivery_note = if pricing.delivery_fee == Decimal::ZERO {
        format!(
            "\n🎁 *FREE DELIVERY!* (Order over {currency}{})",
            format_amount(Decimal::from(business.free_delivery_minimum)),
        )
    } else {
        String::new()
    };

    let mut message = format!(
        "📋 *ORDER SUMMARY*\n\n\
         *Product:* {name}\n\
         *Quantity:* {quantity}\n\
         *Unit Price:* {currency}{unit_price}\n\
         *Subtotal:* {currency}{subtotal}\n\
         *Delivery Fee:* {currency}{delivery_fee}{free_delivery_note}\n\
         *TOTAL:* {currency}{total}\n\n\
         📍 *Delivery Address:*\n\
         {street}, {city}, {region}\n",
        name = negotiation.product.name,
        quantity = negotiation.quantity,
        unit_price = format_amount(negotiation.product.unit_price),
        subtotal = format_amount(pricing.subtotal),
        delivery_fee = format_amount(pricing.delivery_fee),
        total = format_amount(pricing.total),
        street = address.street,
        city = address.city,
        region = address.region,
    );
    if let Some(landmark) = &address.landmark {
        let _ = writeln!(message, "Landmark: {landmark}");
    }
    let _ = write!(
        message,
        "\n⏱️ *Estimated Delivery:* {estimated}\n\n\
         💳 *Payment Options:*\n\
         1. Cash on Delivery\n\
         2. Bank Transfer\n\n\
         To confirm, reply with:\n\
         ✅ \"CONFIRM COD\" for Cash on Delivery\n\
         ✅ \"CONFIRM TRANSFER\" for Bank Transfer\n\n\
         Or reply \"CANCEL\" to cancel this order.",
        estimated = zone.estimated_days,
    );
    message
}

pub fn order_confirmed(order: &Order, business: &BusinessConfig) -> String {
    match order.payment_method {
        PaymentMethod::CashOnDelivery => confirmation_cod(order, business),
        PaymentMethod::Transfer => confirmation_transfer(order, business),
    }
}

fn confirmation_cod(order: &Order, business: &BusinessConfig) -> String {
    let currency = &business.currency_symbol;
    let items: String = order
        .items
        .iter()
        .map(|item| {
            format!("• {} x{} - {currency}{}", item.name, item.quantity, format_amount(item.unit_price))
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "✅ *Order Confirmed!*\n\n\
         Order ID: *{id}*\n\
         Total: *{currency}{total}*\n\n\
         📦 *Order Details:*\n\
         {items}\n\n\
         📍 *Delivery To:*\n\
         {street}\n\
         {city}, {region}\n\n\
         💳 *Payment:* Cash on Delivery\n\
         ⏱️ *Estimated Delivery:* {estimated}\n\n\
         We'll notify you when your order is ready for delivery!\n\n\
         To track your order, reply with \"Track {id}\"\n\n\
         Thank you for shopping with {name}! 🎉",
        id = order.id.0,
        total = format_amount(order.pricing.total),
        street = order.delivery.address.street,
        city = order.delivery.address.city,
        region = order.delivery.address.region,
        estimated = order.delivery.estimated_days,
        name = business.name,
    )
}

fn confirmation_transfer(order: &Order, business: &BusinessConfig) -> String {
    let currency = &business.currency_symbol;
    format!(
        "✅ *Order Confirmed!*\n\n\
         Order ID: *{id}*\n\
         Total: *{currency}{total}*\n\n\
         💳 *Payment Instructions:*\n\
         1. Transfer the total to the account below\n\
         2. Complete payment within 24 hours\n\
         3. Your order will ship immediately after payment\n\n\
         After payment, send your payment reference.\n\n\
         Thank you for shopping with {name}! 🎉",
        id = order.id.0,
        total = format_amount(order.pricing.total),
        name = business.name,
    )
}

pub fn operator_new_order(order: &Order, business: &BusinessConfig) -> String {
    let currency = &business.currency_symbol;
    format!(
        "🛒 *NEW ORDER RECEIVED!*\n\n\
         Order ID: {id}\n\
         Customer: {customer}\n\
         Items: {items}\n\
         Total: {currency}{total}\n\
         Payment: {payment}\n\
         Location: {region}\n\n\
         Reply \"!orders\" to view all pending orders.",
        id = order.id.0,
        customer = order.customer_name.as_deref().unwrap_or(&order.customer_id.0),
        items = order.items.len(),
        total = format_amount(order.pricing.total),
        payment = match order.payment_method {
            PaymentMethod::CashOnDelivery => "COD",
            PaymentMethod::Transfer => "Transfer",
        },
        region = order.delivery.address.region,
    )
}

pub fn escalation_reply(business: &BusinessConfig) -> String {
    format!(
        "I understand this requires personal attention. I'm connecting you with \
         our support team right away! 👤\n\n\
         Support: {phone}\n\
         Email: {email}",
        phone = business.support_phone,
        email = business.support_email,
    )
}

pub fn operator_escalation(customer: &Customer, original_message: &str) -> String {
    format!(
        "🚨 *CUSTOMER NEEDS ASSISTANCE*\n\n\
         From: {name}\n\
         Phone: {phone}\n\
         VIP: {vip}\n\n\
         Message: \"{original_message}\"\n\n\
         Please respond ASAP!",
        name = customer.display_name(),
        phone = customer.id.0,
        vip = customer.vip_tier.map_or("No", |tier| tier.label()),
    )
}

pub fn product_card(product: &Product, business: &BusinessConfig) -> String {
    let currency = &business.currency_symbol;
    let stock_status = if product.stock > 0 {
        format!("✅ In Stock ({})", product.stock)
    } else {
        "❌ Out of Stock".to_string()
    };
    format!(
        "*{name}*\n\n\
         💵 Price: {currency}{price}\n\
         📦 {stock_status}\n\
         🏷️ Category: {category}\n\n\
         {description}\n\n\
         To order, just say \"I want {name}\" 🛒",
        name = product.name,
        price = format_amount(product.price),
        category = product.category,
        description = product.description,
    )
}

pub fn order_status(order: &Order, business: &BusinessConfig) -> String {
    let currency = &business.currency_symbol;
    let emoji = match order.status {
        OrderStatus::Pending => "⏳",
        OrderStatus::Confirmed => "✅",
        OrderStatus::Processing => "📦",
        OrderStatus::Shipped => "🚚",
        OrderStatus::Delivered => "🎉",
        OrderStatus::Cancelled => "❌",
    };
    format!(
        "{emoji} *Order #{id}*\n\n\
         Status: {status}\n\
         Items: {items} item(s)\n\
         Total: {currency}{total}\n\
         Payment: {payment}\n\
         📅 Estimated: {estimated}",
        id = order.id.0,
        status = order.status.as_str().to_uppercase(),
        items = order.items.len(),
        total = format_amount(order.pricing.total),
        payment = order.payment_method.label(),
        estimated = order.delivery.estimated_days,
    )
}

pub fn cancelled_ack() -> String {
    "No problem, I've cancelled that order. Let me know if you'd like anything else! 🛒"
        .to_string()
}

pub fn product_unavailable() -> String {
    "I'm sorry, that product is not available right now. Would you like to see similar items? 🔍"
        .to_string()
}

pub fn stock_short(product_name: &str, available: u32) -> String {
    format!(
        "Unfortunately, we only have {available} unit(s) of *{product_name}* in stock right now. \
         Would you like to order what's available? 📦"
    )
}

/// Sent when a confirmation-time stock re-check found fewer units than the
/// negotiated quantity. A fresh summary follows.
pub fn quantity_revised(product_name: &str, available: u32) -> String {
    format!(
        "Quick update: only {available} unit(s) of *{product_name}* are left, so I've \
         adjusted your order. Here is the updated summary:"
    )
}

pub fn stock_gone(product_name: &str) -> String {
    format!(
        "I'm so sorry - *{product_name}* just sold out, so I've had to cancel this order. \
         Would you like to see similar items? 🔍"
    )
}

pub fn order_in_progress(product_name: &str) -> String {
    format!(
        "You already have an order for *{product_name}* in progress. Let's finish that one \
         first, or reply \"CANCEL\" to cancel it and start over."
    )
}

pub fn negotiation_expired() -> String {
    "Your pending order expired because we didn't hear back from you. \
     No worries - just tell me what you'd like whenever you're ready! 🛒"
        .to_string()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::format_amount;

    #[test]
    fn amounts_are_grouped_in_thousands() {
        assert_eq!(format_amount(Decimal::new(103_000, 0)), "103,000");
        assert_eq!(format_amount(Decimal::new(1_200_000, 0)), "1,200,000");
        assert_eq!(format_amount(Decimal::new(500, 0)), "500");
        assert_eq!(format_amount(Decimal::ZERO), "0");
        assert_eq!(format_amount(Decimal::new(2_500_50, 2)), "2,500.5");
    }
}
