//! # Seed Data Generator
//!
//! Populates a development database with one store and its staff, catalog,
//! settings and a completed sale.
//!
//! ## Usage
//! ```bash
//! # Seed the database from kasir.toml / KASIR_DB_PATH (or the data dir default)
//! cargo run -p kasir-db --bin seed
//!
//! # Specify database path
//! cargo run -p kasir-db --bin seed -- --db ./data/kasir.db
//!
//! # More log output
//! RUST_LOG=debug cargo run -p kasir-db --bin seed
//! ```
//!
//! ## Generated Data
//! - Store "Toko Maju Jaya" (IDR, 11% tax)
//! - Users: owner, admin, two cashiers, each a member of the store
//! - Categories: Minuman, Makanan Ringan, Sembako
//! - Products with stock
//! - Global and per-store settings
//! - One COMPLETED cash sale (stock decremented)

use std::env;
use std::path::PathBuf;

use kasir_core::{
    CreateCategory, CreateProduct, CreateStore, CreateTransaction, CreateTransactionWithItems, CreateUser,
    CreateUserStore, NewTransactionLine, PaymentMethod, Product, Role, Store,
};
use kasir_core::query::FindArgs;
use kasir_db::{Database, DatabaseSettings};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Placeholder credential; the data layer stores whatever hash it is given.
const SEED_PASSWORD_HASH: &str = "$dev$not-a-real-hash";

const USERS: &[(&str, &str, Role)] = &[
    ("Pemilik Toko", "owner", Role::Owner),
    ("Admin Toko", "admin", Role::Admin),
    ("Kasir Pagi", "kasir1", Role::Kasir),
    ("Kasir Sore", "kasir2", Role::Kasir),
];

/// (category, [(product, price in rupiah, stock)])
const CATALOG: &[(&str, &[(&str, i64, i64)])] = &[
    (
        "Minuman",
        &[
            ("Air Mineral 600ml", 4_000, 120),
            ("Teh Botol 350ml", 5_000, 80),
            ("Kopi Susu Kaleng", 9_500, 40),
            ("Jus Jeruk 1L", 18_000, 15),
        ],
    ),
    (
        "Makanan Ringan",
        &[
            ("Keripik Singkong", 12_000, 30),
            ("Kacang Atom", 8_000, 45),
            ("Biskuit Kelapa", 10_500, 25),
        ],
    ),
    (
        "Sembako",
        &[
            ("Beras 5kg", 72_000, 20),
            ("Minyak Goreng 2L", 36_000, 18),
            ("Gula Pasir 1kg", 17_500, 35),
            ("Telur 1kg", 29_000, 12),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,kasir=debug,sqlx=warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut db_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kasir POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: from kasir.toml / KASIR_DB_PATH)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut settings = DatabaseSettings::load(None)?;
    if db_path.is_some() {
        settings.path = db_path;
    }
    let path = settings.database_path();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    println!("🌱 Kasir POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", path.display());
    println!();

    let db = Database::new(settings.into_db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.stores().count(&FindArgs::<Store>::new()).await?;
    if existing > 0 {
        println!("⚠ Database already has {} stores", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    // Store
    let mut store_input = CreateStore::new("Toko Maju Jaya");
    store_input.address = Some("Jl. Merdeka No. 17, Bandung".into());
    store_input.phone = Some("022-555-0123".into());
    store_input.tax_rate = Some(11.0);
    let store = db.stores().create(store_input).await?;
    println!("✓ Store {}", store.name);

    // Users and memberships
    let mut cashier_id = None;
    for (name, username, role) in USERS {
        let mut input = CreateUser::new(*name, *username, SEED_PASSWORD_HASH);
        input.role = Some(*role);
        input.default_store_id = Some(store.id.clone());
        let user = db.users().create(input).await?;
        db.user_stores()
            .create(CreateUserStore::new(&user.id, &store.id, *role))
            .await?;
        if *role == Role::Kasir && cashier_id.is_none() {
            cashier_id = Some(user.id);
        }
    }
    println!("✓ {} users", USERS.len());

    // Catalog
    let mut products: Vec<Product> = Vec::new();
    for (category_name, items) in CATALOG {
        let category = db
            .categories()
            .create(CreateCategory::new(*category_name, &store.id))
            .await?;
        for (name, price, stock) in items.iter() {
            let product = db
                .products()
                .create(CreateProduct::new(*name, *price, &category.id, &store.id).with_stock(*stock))
                .await?;
            products.push(product);
        }
    }
    println!("✓ {} categories, {} products", CATALOG.len(), products.len());

    // Settings
    db.settings().set_value("app.locale", "id-ID").await?;
    db.settings().set_value("receipt.footer", "Terima kasih atas kunjungan Anda").await?;
    db.store_settings()
        .set_value(&store.id, "receipt.footer", "Terima kasih, sampai jumpa lagi!")
        .await?;
    db.store_settings().set_value(&store.id, "printer.width", "58").await?;
    println!("✓ Settings");

    // A completed sale: 2 × first product, 1 × last product.
    let Some(cashier_id) = cashier_id else {
        return Err("no cashier seeded".into());
    };
    let (first, last) = match (products.first(), products.last()) {
        (Some(first), Some(last)) => (first.clone(), last.clone()),
        _ => return Err("no products seeded".into()),
    };
    let total = first.price * 2 + last.price;
    let input = CreateTransactionWithItems {
        transaction: CreateTransaction::new(total, PaymentMethod::Cash, cashier_id, &store.id),
        items: vec![
            NewTransactionLine::new(&first.id, 2, first.price),
            NewTransactionLine::new(&last.id, 1, last.price),
        ],
    };
    let paid = (total / 10_000 + 1) * 10_000;

    let sale = db
        .transaction(move |tx| {
            Box::pin(async move {
                let created = tx.transactions().create_with_items(input).await?;
                for item in &created.items {
                    tx.products().adjust_stock(&item.product_id, -item.quantity).await?;
                }
                tx.transactions().complete(&created.transaction.id, paid).await
            })
        })
        .await?;
    println!(
        "✓ Sale {} total {} paid {} change {}",
        sale.id, sale.total_amount, sale.amount_paid, sale.change_amount
    );

    let elapsed = start.elapsed();
    info!(?elapsed, "Seed complete");
    println!();
    println!("✓ Seed complete in {:?}", elapsed);

    Ok(())
}
