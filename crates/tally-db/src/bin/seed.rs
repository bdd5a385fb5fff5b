//! # Seed Data Generator
//!
//! Populates a ledger with demo products, purchases, sales and expenses,
//! then prints this month's report.
//!
//! ## Usage
//! ```bash
//! # Seed the configured database (tally.toml / TALLY_DB_PATH)
//! cargo run -p tally-db --bin seed
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//!
//! # Use a specific config file
//! cargo run -p tally-db --bin seed -- --config ./tally.toml
//! ```
//!
//! ## Generated Ledger
//! - One product per catalog entry, opening stock from the catalog
//! - A restock purchase for each product
//! - A few sales per product, one of them edited afterwards
//! - Monthly operating expenses

use std::env;
use std::path::PathBuf;

use tally_core::{ExpenseInput, NewProduct};
use tally_db::{Database, LedgerConfig};
use tracing::info;

/// (name, brand, opening stock, buying cents, selling cents)
const CATALOG: &[(&str, &str, i64, i64, i64)] = &[
    ("Basmati Rice 5kg", "Tilda", 40, 1_250, 1_690),
    ("Sunflower Oil 1L", "Flora", 60, 320, 450),
    ("Black Tea 100ct", "Tapal", 25, 540, 720),
    ("Whole Milk 1L", "Nurpur", 80, 180, 240),
    ("Lentils 1kg", "Mitchell's", 35, 290, 410),
    ("Sugar 1kg", "Al-Noor", 50, 150, 195),
    ("Chickpeas 1kg", "Mitchell's", 20, 310, 430),
    ("Dish Soap 500ml", "Lemon Max", 15, 210, 330),
];

/// (title, amount cents)
const EXPENSES: &[(&str, i64)] = &[
    ("Shop rent", 45_000),
    ("Electricity", 8_750),
    ("Delivery van fuel", 6_200),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (overrides config)");
                println!("  -c, --config <PATH>   Config file path (default: platform config dir)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = LedgerConfig::load_or_default(config_path);
    if let Some(path) = db_path {
        config.database.path = path;
    }
    config.init_tracing();

    println!("🌱 Tally Seed Data Generator");
    println!("============================");
    println!("Database: {}", config.database.path.display());
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let engine = db.stock();

    println!();
    println!("Generating ledger...");

    for (idx, (name, brand, stock, buying, selling)) in CATALOG.iter().enumerate() {
        let product = db
            .products()
            .create(NewProduct {
                name: (*name).to_string(),
                brand: (*brand).to_string(),
                stock: *stock,
                buying_price_cents: *buying,
                selling_price_cents: *selling,
            })
            .await?;

        let restock = 10 + (idx as i64 * 7) % 30;
        engine.commit_purchase(&product.id, restock, None, None).await?;

        for round in 1..=3 {
            let quantity = 1 + (idx as i64 + round) % 5;
            let sale = engine.commit_sale(&product.id, quantity, None).await?;

            // Corrected till entry
            if round == 3 {
                engine.commit_sale(&product.id, quantity + 1, Some(sale.id.as_str())).await?;
            }
        }

        info!(product = %product.name, restock = restock, "Seeded product");
    }

    for (title, amount_cents) in EXPENSES {
        db.expenses()
            .create(ExpenseInput {
                title: (*title).to_string(),
                amount_cents: *amount_cents,
            })
            .await?;
    }

    let mismatches = db.products().reconcile_stock().await?;
    if !mismatches.is_empty() {
        return Err(format!("{} products disagree with their ledger", mismatches.len()).into());
    }

    println!();
    println!(
        "✓ Seeded {} products, {} sales, {} purchases, {} expenses in {:?}",
        db.products().count().await?,
        db.sales().count().await?,
        db.purchases().count().await?,
        EXPENSES.len(),
        start.elapsed()
    );

    let report = db.reports().build_report("monthly", None, None, None).await?;
    println!();
    println!(
        "This month ({} .. {}):",
        report.period.start_date, report.period.end_date
    );
    println!("  Revenue:      {}", report.revenue.total_revenue);
    println!("  Purchases:    {}", report.costs.total_purchases);
    println!("  Expenses:     {}", report.costs.operating_expenses);
    println!(
        "  Net profit:   {} ({:.1}%)",
        report.profitability.net_profit, report.profitability.net_profit_margin
    );

    let summary = db
        .products()
        .stock_summary(config.reporting.low_stock_threshold)
        .await?;
    println!();
    println!(
        "Stock: {} units, {} at cost, {} at retail",
        summary.total_units, summary.value_at_cost, summary.value_at_retail
    );
    for product in &summary.low_stock {
        println!("  ⚠ Low stock: {} ({} left)", product.name, product.stock);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
