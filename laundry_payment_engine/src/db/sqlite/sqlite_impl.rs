use chrono::Duration;
use log::*;
use sqlx::SqlitePool;

use crate::{
    db::sqlite::{db_url, new_pool, orders, reconciliation},
    db_types::{NewOrder, Order, OrderId, PaymentEvent, PaymentEventRecord},
    order_objects::OrderQueryFilter,
    traits::{
        InsertOrderResult, MarkFailedOutcome, MarkPaidOutcome, OrderApiError, OrderManagement,
        ReconciliationDatabase, ReconciliationError,
    },
};

/// The SQLite storage backend. Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Connects to `url` and brings the schema up to date. Migrations are embedded in the binary,
    /// so a fresh file database is ready to serve when this returns.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, ReconciliationError> {
        let pool = new_pool(url, max_connections).await?;
        sqlx::migrate!("./src/db/sqlite/migrations")
            .run(&pool)
            .await
            .map_err(|e| ReconciliationError::MigrationError(e.to_string()))?;
        debug!("🗃️ Database migrations are up to date");
        Ok(Self { url: url.to_string(), pool })
    }

    /// Connects using the URL from the environment. See [`db_url`].
    pub async fn new_default() -> Result<Self, ReconciliationError> {
        Self::new_with_url(&db_url(), 25).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl ReconciliationDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        &self.url
    }

    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        orders::idempotent_insert(order, &mut conn).await
    }

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn conditional_mark_paid(
        &self,
        order_id: &OrderId,
        reference: &str,
    ) -> Result<MarkPaidOutcome, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        reconciliation::conditional_mark_paid(order_id, reference, &mut conn).await
    }

    async fn conditional_mark_failed(&self, order_id: &OrderId) -> Result<MarkFailedOutcome, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        reconciliation::conditional_mark_failed(order_id, &mut conn).await
    }

    async fn reconcile_charge(
        &self,
        order_id: &OrderId,
        event: &PaymentEvent,
    ) -> Result<(MarkPaidOutcome, bool), ReconciliationError> {
        let mut tx = self.pool.begin().await?;
        let outcome = reconciliation::conditional_mark_paid(order_id, &event.reference, &mut tx).await?;
        // The ledger only links the event to an order when an order row actually exists for it.
        let matched = match &outcome {
            MarkPaidOutcome::Applied(o) | MarkPaidOutcome::AlreadyPaid(o) => Some(&o.order_id),
            MarkPaidOutcome::NotFound => None,
        };
        let fresh = reconciliation::insert_payment_event(event, matched, &mut tx).await?;
        tx.commit().await?;
        Ok((outcome, fresh))
    }

    async fn record_unmatched_event(&self, event: &PaymentEvent) -> Result<bool, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        reconciliation::insert_payment_event(event, None, &mut conn).await
    }

    async fn fetch_stale_pending_orders(&self, older_than: Duration) -> Result<Vec<Order>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::fetch_stale_pending_orders(older_than, &mut conn).await?;
        Ok(result)
    }

    async fn close(&mut self) -> Result<(), ReconciliationError> {
        info!("🗃️ Closing connection to database {}", self.url);
        self.pool.close().await;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::fetch_orders_for_customer(customer_id, &mut conn).await?;
        Ok(result)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::search_orders(query, &mut conn).await?;
        Ok(result)
    }

    async fn fetch_unmatched_events(&self) -> Result<Vec<PaymentEventRecord>, OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        let result = reconciliation::fetch_unmatched_events(&mut conn).await?;
        Ok(result)
    }
}
