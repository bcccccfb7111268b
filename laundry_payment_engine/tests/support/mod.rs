#![allow(dead_code)]

use chrono::{Duration, Utc};
use laundry_payment_engine::{
    db_types::{LaundryItem, LaundryItemKind, NewOrder, OrderId},
    SqliteDatabase,
};
use lps_common::Naira;
use sqlx::{migrate::MigrateDatabase, Sqlite};

/// A unique file database under the system temp dir, so tests can run in parallel without
/// tripping over each other.
pub fn random_db_url() -> String {
    let path = std::env::temp_dir().join(format!("lpe_test_{}.db", rand::random::<u64>()));
    format!("sqlite://{}", path.display())
}

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        Sqlite::drop_database(url).await.expect("Could not drop the old test database");
    }
    Sqlite::create_database(url).await.expect("Could not create the test database");
}

/// A fresh, migrated database at `url`.
pub async fn new_db(url: &str) -> SqliteDatabase {
    prepare_test_env(url).await;
    SqliteDatabase::new_with_url(url, 5).await.expect("Could not connect to the test database")
}

pub async fn cleanup(url: &str) {
    let _ = Sqlite::drop_database(url).await;
}

/// A well-formed order: one line of shirts, pickup in four hours, dropoff two days later.
pub fn new_order(order_id: &str, customer_id: &str, amount: i64) -> NewOrder {
    let pickup = Utc::now() + Duration::hours(4);
    NewOrder::new(
        OrderId::from(order_id),
        customer_id.to_string(),
        format!("{customer_id}@example.com"),
        Naira::from(amount),
    )
    .with_addresses("12 Marina Road, Lagos", "4 Glover Court, Ikoyi")
    .with_schedule(pickup, pickup + Duration::days(2))
    .with_items(vec![LaundryItem::new(LaundryItemKind::Shirt, 10, Naira::from(amount / 10))])
}
