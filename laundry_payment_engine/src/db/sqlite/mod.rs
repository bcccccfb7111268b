mod orders;
mod reconciliation;
mod sqlite_impl;

pub use sqlite_impl::SqliteDatabase;

use log::*;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

/// Reads the database URL from `LPS_DATABASE_URL`, falling back to a local file database.
pub fn db_url() -> String {
    std::env::var("LPS_DATABASE_URL").unwrap_or_else(|_| {
        let url = "sqlite://data/laundry_payments.db".to_string();
        info!("🪛️ LPS_DATABASE_URL is not set. Using the default, {url}");
        url
    })
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    debug!("🗃️ Connected to database {url}, with {max_connections} max connections");
    Ok(pool)
}
