//! # Seed Data Generator
//!
//! Populates a development database with demo products, a tax
//! configuration and a handful of coupons.
//!
//! ## Usage
//! ```bash
//! # Seed ./checkout_dev.db
//! cargo run -p checkout-db --bin seed
//!
//! # Specify database path
//! cargo run -p checkout-db --bin seed -- --db ./data/checkout.db
//! ```
//!
//! ## Generated Data
//! - Products across shirts, hoodies, mugs and posters, each with a
//!   carrier reference `pod-{id}`
//! - One active tax configuration (US, CA, GB, DE, FR)
//! - Coupons: `SAVE10`, `WELCOME5` (single use), `MUGS20` (mugs only)

use chrono::{Duration, Utc};
use std::env;

use checkout_core::{
    ApplicableTo, CountryTaxRate, Coupon, DiscountType, Money, TaxConfiguration,
};
use checkout_db::{Database, DbConfig, Product};

/// (category, product names, base price in cents)
const CATALOGUE: &[(&str, &[&str], i64)] = &[
    (
        "shirts",
        &["Logo Tee", "Pocket Tee", "Long Sleeve Tee", "Ringer Tee"],
        3000,
    ),
    ("hoodies", &["Zip Hoodie", "Pullover Hoodie"], 5500),
    ("mugs", &["Classic Mug", "Travel Mug", "Enamel Mug"], 1600),
    ("posters", &["A3 Poster", "A2 Poster"], 2200),
];

fn rate(code: &str, pct: f64, shipping: bool) -> CountryTaxRate {
    CountryTaxRate {
        country_code: code.to_string(),
        rate_percent: pct,
        applies_to_shipping: shipping,
        priority: 0,
    }
}

fn demo_coupons() -> Vec<Coupon> {
    let valid_from = Utc::now() - Duration::days(1);
    let base = Coupon {
        id: String::new(),
        code: String::new(),
        discount_type: DiscountType::Percentage,
        discount_value: 0.0,
        min_order_amount: None,
        max_discount_amount: None,
        usage_limit: None,
        used_count: 0,
        is_single_use: false,
        valid_from,
        valid_until: None,
        applicable_to: ApplicableTo::AllProducts,
        categories: vec![],
        products: vec![],
        is_active: true,
    };

    vec![
        Coupon {
            id: "coupon-save10".to_string(),
            code: "SAVE10".to_string(),
            discount_value: 10.0,
            max_discount_amount: Some(Money::from_cents(2500)),
            usage_limit: Some(1000),
            ..base.clone()
        },
        Coupon {
            id: "coupon-welcome5".to_string(),
            code: "WELCOME5".to_string(),
            discount_type: DiscountType::FixedAmount,
            discount_value: 500.0,
            min_order_amount: Some(Money::from_cents(2000)),
            is_single_use: true,
            ..base.clone()
        },
        Coupon {
            id: "coupon-mugs20".to_string(),
            code: "MUGS20".to_string(),
            discount_value: 20.0,
            applicable_to: ApplicableTo::CategorySpecific,
            categories: vec!["mugs".to_string()],
            valid_until: Some(Utc::now() + Duration::days(90)),
            ..base
        },
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./checkout_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Checkout Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./checkout_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Checkout Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Products
    let mut generated = 0;
    for (category, names, price) in CATALOGUE {
        for name in names.iter() {
            generated += 1;
            let product = Product {
                id: generated.to_string(),
                name: name.to_string(),
                category: category.to_string(),
                carrier_product_ref: format!("pod-{generated}"),
                base_price: Money::from_cents(*price),
                is_active: true,
            };

            if let Err(e) = db.products().insert(&product).await {
                eprintln!("Failed to insert {}: {}", product.name, e);
            }
        }
    }
    println!("✓ Inserted {} products", generated);

    // Tax configuration
    let tax = TaxConfiguration {
        id: "tax-default".to_string(),
        name: "Default storefront rates".to_string(),
        is_active: true,
        default_rate_percent: 0.0,
        country_rates: vec![
            rate("US", 8.25, false),
            rate("CA", 13.0, true),
            rate("GB", 20.0, true),
            rate("DE", 19.0, true),
            rate("FR", 20.0, true),
        ],
    };
    db.tax_configs().insert(&tax).await?;
    println!("✓ Inserted tax configuration ({} rates)", tax.country_rates.len());

    // Coupons
    for coupon in demo_coupons() {
        db.coupons().insert(&coupon).await?;
        println!("✓ Inserted coupon {}", coupon.code);
    }

    println!();
    println!("Done.");
    Ok(())
}
