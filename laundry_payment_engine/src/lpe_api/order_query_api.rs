use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Order, OrderId, PaymentEventRecord},
    order_objects::{OrderQueryFilter, OrderResult},
    traits::{OrderApiError, OrderManagement},
};

/// The read side of the engine. Everything here is a plain query; nothing mutates.
#[derive(Clone)]
pub struct OrderQueryApi<B> {
    db: B,
}

impl<B> Debug for OrderQueryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderQueryApi")
    }
}

impl<B> OrderQueryApi<B>
where B: OrderManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderApiError> {
        trace!("📦️ Fetching order {order_id}");
        self.db.fetch_order_by_order_id(order_id).await
    }

    /// A customer's order history, newest first, with their order count and lifetime total.
    pub async fn customer_orders(&self, customer_id: &str) -> Result<OrderResult, OrderApiError> {
        let orders = self.db.fetch_orders_for_customer(customer_id).await?;
        let total_amount = orders.iter().map(|o| o.total_amount).sum();
        Ok(OrderResult { customer_id: customer_id.to_string(), total_orders: orders.len(), total_amount, orders })
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderApiError> {
        trace!("📦️ Searching orders");
        self.db.search_orders(query).await
    }

    /// Payment signals that never matched an order, newest first. Money that needs chasing.
    pub async fn unmatched_events(&self) -> Result<Vec<PaymentEventRecord>, OrderApiError> {
        self.db.fetch_unmatched_events().await
    }
}
