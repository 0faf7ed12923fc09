use chrono::Utc;
use rust_decimal::Decimal;

use crate::commands::CommandResult;
use kiosk_core::config::AppConfig;
use kiosk_core::domain::product::{Product, ProductId, ProductStatus};
use kiosk_db::repositories::{ProductRepository, SqlProductRepository};
use kiosk_db::{connect, migrations};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(None) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let repository = SqlProductRepository::new(pool.clone());
        let mut inserted = 0usize;
        let mut skipped = 0usize;
        for product in demo_catalog() {
            let existing = repository
                .find_by_id(&product.id)
                .await
                .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
            if existing.is_some() {
                skipped += 1;
                continue;
            }
            repository
                .save(product)
                .await
                .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
            inserted += 1;
        }

        pool.close().await;
        Ok::<(usize, usize), (&'static str, String, u8)>((inserted, skipped))
    });

    match result {
        Ok((inserted, skipped)) => CommandResult::success(
            "seed",
            format!("demo catalog loaded: {inserted} product(s) inserted, {skipped} already present"),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

/// Demo storefront catalog for development and manual testing.
pub fn demo_catalog() -> Vec<Product> {
    let entries: Vec<(&str, &str, &str, i64, u32, &str, bool)> = vec![
        (
            "PRD-001",
            "iPhone 15 Pro Max 256GB",
            "Latest Apple flagship with A17 Pro chip, titanium design, and advanced camera \
             system. Brand new, factory sealed with full warranty.",
            1_450_000,
            8,
            "smartphones",
            true,
        ),
        (
            "PRD-002",
            "Samsung Galaxy S24 Ultra 512GB",
            "Premium Samsung flagship with S Pen, stunning AMOLED display, and exceptional \
             camera capabilities. Comes with Galaxy Buds.",
            1_280_000,
            12,
            "smartphones",
            true,
        ),
        (
            "PRD-003",
            "MacBook Pro 14\" M3 Pro 16GB/512GB",
            "Powerful Apple MacBook Pro with M3 Pro chip. Perfect for professionals and \
             creators. Stunning Liquid Retina XDR display.",
            2_850_000,
            5,
            "laptops",
            true,
        ),
        (
            "PRD-004",
            "Dell XPS 15 Intel i7 16GB/1TB",
            "Premium Windows laptop with stunning 4K display, powerful performance, and sleek \
             design. Perfect for work and entertainment.",
            1_850_000,
            7,
            "laptops",
            false,
        ),
        (
            "PRD-005",
            "Apple AirPods Pro 2nd Gen",
            "Premium wireless earbuds with active noise cancellation, spatial audio, and \
             MagSafe charging case. Crystal clear sound quality.",
            185_000,
            25,
            "accessories",
            true,
        ),
        (
            "PRD-006",
            "Sony WH-1000XM5 Headphones",
            "Industry-leading noise cancelling headphones with exceptional sound quality. \
             Premium comfort for long listening sessions.",
            295_000,
            15,
            "audio",
            true,
        ),
        (
            "PRD-007",
            "Apple Watch Series 9 45mm GPS",
            "Advanced health and fitness tracking with always-on Retina display. Track \
             workouts, monitor heart health, and stay connected.",
            385_000,
            10,
            "smartwatches",
            false,
        ),
        (
            "PRD-008",
            "PlayStation 5 Slim 1TB Bundle",
            "Latest PS5 Slim console with 1TB storage and two controllers. Ready to play!",
            685_000,
            6,
            "gaming",
            true,
        ),
    ];

    let now = Utc::now();
    entries
        .into_iter()
        .map(|(id, name, description, price, stock, category, featured)| Product {
            id: ProductId(id.to_string()),
            name: name.to_string(),
            description: description.to_string(),
            price: Decimal::new(price, 0),
            stock,
            category: category.to_string(),
            status: ProductStatus::Active,
            featured,
            views_count: 0,
            orders_count: 0,
            created_at: now,
        })
        .collect()
}
