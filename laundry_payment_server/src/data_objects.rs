//! Request and response payloads for the REST API. Everything here serializes in camelCase to
//! match the storefront's JSON conventions.

use chrono::{DateTime, Utc};
use laundry_payment_engine::{
    db_types::{LaundryItem, NewOrder, OrderId, OrderStatusType, PaymentEventRecord},
    order_objects::OrderQueryFilter,
};
use lps_common::Naira;
use paystack_tools::{TransactionStatus, VerifiedTransaction};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Into<String>>(message: S) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn failure<S: Into<String>>(message: S) -> Self {
        Self { success: false, message: message.into() }
    }
}

/// The webhook acknowledgement body. The gateway only checks the status code, but we return the
/// body its docs describe so that replaying a delivery by hand shows something sensible.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn ok() -> Self {
        Self { received: true }
    }
}

/// Payload for booking a new order. The paying customer is never part of the payload; identity
/// comes from the access token so that a customer cannot book orders onto someone else's account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRequest {
    /// Client-supplied id, e.g. from the storefront's booking flow. Minted server-side if absent.
    #[serde(default)]
    pub order_id: Option<OrderId>,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub pickup_date: DateTime<Utc>,
    pub dropoff_date: DateTime<Utc>,
    pub items: Vec<LaundryItem>,
    pub total_amount: Naira,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl NewOrderRequest {
    pub fn into_new_order(self, customer_id: &str, customer_email: &str) -> NewOrder {
        let order_id = self.order_id.unwrap_or_else(OrderId::random);
        let order =
            NewOrder::new(order_id, customer_id.to_string(), customer_email.to_string(), self.total_amount)
                .with_addresses(self.pickup_address, self.dropoff_address)
                .with_schedule(self.pickup_date, self.dropoff_date)
                .with_items(self.items);
        match self.metadata {
            Some(metadata) => order.with_metadata(metadata),
            None => order,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializePaymentResponse {
    pub authorization_url: String,
    /// The gateway's reference for the checkout session. Under the reference-as-id strategy this
    /// equals `order_id`.
    pub reference: String,
    pub order_id: OrderId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyQuery {
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub status: TransactionStatus,
    pub reference: String,
    /// The order this reference settles, when one was matched.
    pub order_id: Option<OrderId>,
    /// Major units, converted from the gateway's minor-unit report.
    pub amount: Naira,
    pub email: Option<String>,
    pub metadata: Option<Value>,
}

impl VerifyPaymentResponse {
    pub fn new(tx: &VerifiedTransaction, order_id: Option<OrderId>) -> Self {
        Self {
            status: tx.status,
            reference: tx.reference.clone(),
            order_id,
            amount: tx.amount_naira(),
            email: tx.customer_email().map(String::from),
            metadata: tx.metadata.clone(),
        }
    }
}

/// Query-string form of [`OrderQueryFilter`]. Query strings cannot carry the filter's repeated
/// status clause, so this accepts at most one status and widens into the full filter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderSearchQuery {
    pub order_id: Option<OrderId>,
    pub customer_id: Option<String>,
    pub reference: Option<String>,
    pub status: Option<OrderStatusType>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl From<OrderSearchQuery> for OrderQueryFilter {
    fn from(q: OrderSearchQuery) -> Self {
        OrderQueryFilter {
            order_id: q.order_id,
            customer_id: q.customer_id,
            reference: q.reference,
            status: q.status.map(|s| vec![s]),
            since: q.since,
            until: q.until,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedEventList {
    pub total: usize,
    pub events: Vec<PaymentEventRecord>,
}

impl From<Vec<PaymentEventRecord>> for UnmatchedEventList {
    fn from(events: Vec<PaymentEventRecord>) -> Self {
        Self { total: events.len(), events }
    }
}
