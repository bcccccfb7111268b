use chrono::{DateTime, Utc};
use lps_common::Naira;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderId, OrderStatusType};

/// Search clauses for order queries. Empty fields do not constrain the search, and all present
/// clauses must match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderQueryFilter {
    pub order_id: Option<OrderId>,
    pub customer_id: Option<String>,
    /// Matches the stored payment reference, i.e. only orders that have been settled.
    pub reference: Option<String>,
    pub status: Option<Vec<OrderStatusType>>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn is_empty(&self) -> bool {
        self.order_id.is_none()
            && self.customer_id.is_none()
            && self.reference.is_none()
            && self.status.is_none()
            && self.since.is_none()
            && self.until.is_none()
    }

    pub fn with_order_id<T: Into<OrderId>>(mut self, order_id: T) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn with_customer_id<T: Into<String>>(mut self, customer_id: T) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_reference<T: Into<String>>(mut self, reference: T) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }
}

/// A customer's order history plus the headline numbers support staff want first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResult {
    pub customer_id: String,
    pub total_orders: usize,
    pub total_amount: Naira,
    pub orders: Vec<Order>,
}
