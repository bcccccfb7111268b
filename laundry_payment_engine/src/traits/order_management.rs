use thiserror::Error;

use crate::{
    db_types::{Order, OrderId, PaymentEventRecord},
    order_objects::OrderQueryFilter,
};

#[derive(Debug, Clone, Error)]
pub enum OrderApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
}

impl From<sqlx::Error> for OrderApiError {
    fn from(e: sqlx::Error) -> Self {
        OrderApiError::DatabaseError(e.to_string())
    }
}

/// The read side of a storage backend. Nothing here mutates anything.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderApiError>;

    /// All orders placed by one customer, newest first.
    async fn fetch_orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, OrderApiError>;

    /// Orders matching every clause of the filter, oldest first.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderApiError>;

    /// Ledger entries that never matched an order. The money-chasing report.
    async fn fetch_unmatched_events(&self) -> Result<Vec<PaymentEventRecord>, OrderApiError>;
}
