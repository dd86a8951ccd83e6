//! # Seed Data Generator
//!
//! Populates a development database with items and a few documents so the
//! stock report has something to show.
//!
//! ## Usage
//! ```bash
//! # 40 items, 10 purchases, 25 sales (defaults)
//! cargo run -p tally-db --bin seed
//!
//! # Custom amounts and database
//! cargo run -p tally-db --bin seed -- --items 200 --sales 100 --db ./data/tally.db
//! ```
//!
//! Items get a random-looking but deterministic opening stock and reorder
//! point, so some of them end up below their reorder point after the sales.

use chrono::Utc;
use std::env;
use tally_core::{LineInput, NewItem, NewPurchase, NewSale};
use tally_db::{Database, DbConfig};

const MATERIALS: &[&str] = &["Steel", "Brass", "Zinc", "Nylon", "Stainless"];

const PARTS: &[(&str, i64)] = &[
    ("BLT", 35),
    ("NUT", 12),
    ("WSH", 5),
    ("SCR", 18),
    ("RVT", 9),
    ("ANC", 60),
    ("PIN", 22),
    ("SPR", 75),
];

const PART_NAMES: &[&str] = &[
    "Hex bolt",
    "Hex nut",
    "Flat washer",
    "Wood screw",
    "Pop rivet",
    "Wall anchor",
    "Dowel pin",
    "Compression spring",
];

/// Cheap deterministic mixing so reruns give the same data.
fn mix(n: usize) -> i64 {
    let x = (n as u64).wrapping_mul(2_654_435_761) % 1_000;
    x as i64
}

fn generate_item(index: usize) -> NewItem {
    let (part_code, base_price) = PARTS[index % PARTS.len()];
    let material = MATERIALS[(index / PARTS.len()) % MATERIALS.len()];
    let part_name = PART_NAMES[index % PART_NAMES.len()];

    NewItem {
        code: format!("{}-{:04}", part_code, index + 1),
        name: format!("{} {} #{}", material, part_name, index + 1),
        price_cents: base_price + mix(index) % 50,
        qty: mix(index + 7) % 120,
        rop: 10 + mix(index + 13) % 40,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut items: usize = 40;
    let mut purchases: usize = 10;
    let mut sales: usize = 25;
    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--items" | "-i" if i + 1 < args.len() => {
                items = args[i + 1].parse().unwrap_or(items);
                i += 1;
            }
            "--purchases" | "-p" if i + 1 < args.len() => {
                purchases = args[i + 1].parse().unwrap_or(purchases);
                i += 1;
            }
            "--sales" | "-s" if i + 1 < args.len() => {
                sales = args[i + 1].parse().unwrap_or(sales);
                i += 1;
            }
            "--db" | "-d" if i + 1 < args.len() => {
                db_path = args[i + 1].clone();
                i += 1;
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -i, --items <N>      Items to create (default: 40)");
                println!("  -p, --purchases <N>  Purchases to record (default: 10)");
                println!("  -s, --sales <N>      Sales to record (default: 25)");
                println!("  -d, --db <PATH>      Database file path (default: ./tally_dev.db)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Tally Seed Data Generator");
    println!("=========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.items().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} items", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    let mut created = Vec::with_capacity(items);
    for index in 0..items {
        created.push(db.items().create(generate_item(index)).await?);
    }
    println!("✓ {} items", created.len());

    if created.is_empty() {
        return Ok(());
    }

    let today = Utc::now().date_naive();

    for n in 0..purchases {
        let lines = (0..3)
            .map(|k| {
                let item = &created[(n * 3 + k) % created.len()];
                LineInput::new(&item.id, 10 + mix(n + k) % 40, item.price_cents * 6 / 10)
            })
            .collect();

        let purchase = db
            .purchases()
            .create(NewPurchase {
                supplier: format!("Supplier {}", n % 4 + 1),
                date: today,
                description: None,
                lines,
            })
            .await?;
        println!("  {} ({} cents)", purchase.code, purchase.total_cents);
    }

    for n in 0..sales {
        let item = &created[(n * 7) % created.len()];
        let sale = db
            .sales()
            .create(NewSale {
                customer: None,
                date: today,
                description: None,
                lines: vec![LineInput::new(&item.id, 1 + mix(n) % 15, item.price_cents)],
            })
            .await?;
        println!("  {} ({} cents)", sale.code, sale.total_cents);
    }

    let low = db.ledger().low_stock_items().await?;

    println!();
    println!("✓ Seed complete in {:.2}s", start.elapsed().as_secs_f64());
    println!("  {} items below their reorder point", low.len());

    db.close().await;
    Ok(())
}
