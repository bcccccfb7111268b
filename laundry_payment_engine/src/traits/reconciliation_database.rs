use chrono::Duration;
use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderValidationError, PaymentEvent},
    traits::{InsertOrderResult, MarkFailedOutcome, MarkPaidOutcome},
};

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("Could not run database migrations. {0}")]
    MigrationError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Cannot reconcile a '{0}' event. Only charge successes settle orders")]
    UnsupportedEventKind(String),
    #[error("Order failed validation. {0}")]
    InvalidOrder(#[from] OrderValidationError),
}

impl From<sqlx::Error> for ReconciliationError {
    fn from(e: sqlx::Error) -> Self {
        ReconciliationError::DatabaseError(e.to_string())
    }
}

/// The write side of a storage backend.
///
/// Implementations must make [`reconcile_charge`](Self::reconcile_charge) atomic: the ledger
/// insert and the status compare-and-swap happen in one transaction, and the compare-and-swap is
/// conditional on the current status so that racing callers cannot both apply the transition.
#[allow(async_fn_in_trait)]
pub trait ReconciliationDatabase {
    /// The database URL this backend is connected to.
    fn url(&self) -> &str;

    /// Inserts a new order in `Pending` status, or returns the existing row when the order id is
    /// already taken.
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, ReconciliationError>;

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, ReconciliationError>;

    /// Atomically flips the order to `Paid` if and only if it is still `Pending`, stamping the
    /// payment reference on first application. Never touches `Paid` or `Failed` rows.
    async fn conditional_mark_paid(
        &self,
        order_id: &OrderId,
        reference: &str,
    ) -> Result<MarkPaidOutcome, ReconciliationError>;

    /// Atomically flips the order to `Failed` if and only if it is still `Pending`.
    async fn conditional_mark_failed(&self, order_id: &OrderId) -> Result<MarkFailedOutcome, ReconciliationError>;

    /// Applies one charge-success signal against the order it resolved to: one transaction that
    /// records the event in the ledger and runs the paid compare-and-swap.
    ///
    /// The returned flag is `true` when the ledger had not seen this `(reference, kind)` pair
    /// before, `false` for a duplicate delivery.
    async fn reconcile_charge(
        &self,
        order_id: &OrderId,
        event: &PaymentEvent,
    ) -> Result<(MarkPaidOutcome, bool), ReconciliationError>;

    /// Records a signal that could not be resolved to any order. Ledger row with a `NULL`
    /// order id. Returns `false` when the signal was already on file.
    async fn record_unmatched_event(&self, event: &PaymentEvent) -> Result<bool, ReconciliationError>;

    /// Pending orders that have sat untouched for longer than `older_than`. The settlement worker
    /// uses this to find orders whose confirmations may have gone missing.
    async fn fetch_stale_pending_orders(&self, older_than: Duration) -> Result<Vec<Order>, ReconciliationError>;

    /// Closes the connection pool gracefully.
    async fn close(&mut self) -> Result<(), ReconciliationError>;
}
