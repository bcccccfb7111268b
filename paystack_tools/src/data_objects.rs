use std::fmt::Display;

use chrono::{DateTime, Utc};
use lps_common::Naira;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    helpers::{kobo_to_naira, naira_to_kobo},
    PaystackApiError,
};

/// The only webhook event type that triggers reconciliation.
pub const CHARGE_SUCCESS_EVENT: &str = "charge.success";

/// Every provider response wraps its payload in this envelope. `status: false` means the
/// request was understood but declined, with the reason in `message`.
#[derive(Debug, Clone, Deserialize)]
pub struct PaystackResponse<T> {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// Request payload for opening a hosted checkout session.
#[derive(Debug, Clone, Serialize)]
pub struct NewTransaction {
    pub email: String,
    pub amount: Naira,
    pub reference: Option<String>,
    pub metadata: Option<Value>,
    pub currency: Option<String>,
}

impl NewTransaction {
    pub fn new<S: Into<String>>(email: S, amount: Naira) -> Self {
        Self { email: email.into(), amount, reference: None, metadata: None, currency: None }
    }

    pub fn with_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Builds the JSON body for the initialize call. The amount leaves here in kobo; this is
    /// one of the two ends of the unit conversion boundary.
    pub fn to_payload(&self) -> Result<Value, PaystackApiError> {
        let mut payload = json!({
            "email": self.email,
            "amount": naira_to_kobo(self.amount)?,
        });
        if let Some(reference) = &self.reference {
            payload["reference"] = json!(reference);
        }
        if let Some(metadata) = &self.metadata {
            payload["metadata"] = metadata.clone();
        }
        if let Some(currency) = &self.currency {
            payload["currency"] = json!(currency);
        }
        Ok(payload)
    }
}

/// Successful initialize response: where to send the customer, and the reference the
/// provider will report the payment under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Success,
    Failed,
    Abandoned,
    Pending,
    Ongoing,
    Processing,
    Queued,
    Reversed,
    #[serde(other)]
    Unknown,
}

impl TransactionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, TransactionStatus::Success)
    }

    /// Terminal failure statuses. Everything else is "not settled yet".
    pub fn is_failure(&self) -> bool {
        matches!(self, TransactionStatus::Failed | TransactionStatus::Abandoned)
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Abandoned => "abandoned",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Ongoing => "ongoing",
            TransactionStatus::Processing => "processing",
            TransactionStatus::Queued => "queued",
            TransactionStatus::Reversed => "reversed",
            TransactionStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub email: Option<String>,
}

/// Normalized result of a direct `/transaction/verify` query. `amount` is in kobo, exactly as
/// the provider reports it; use [`VerifiedTransaction::amount_naira`] everywhere else.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifiedTransaction {
    pub status: TransactionStatus,
    pub reference: String,
    pub amount: i64,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub channel: Option<String>,
}

impl VerifiedTransaction {
    pub fn amount_naira(&self) -> Naira {
        kobo_to_naira(self.amount)
    }

    pub fn customer_email(&self) -> Option<&str> {
        self.customer.as_ref().and_then(|c| c.email.as_deref())
    }
}

/// Raw webhook envelope. `data` stays untyped until the event kind has been inspected, since
/// the webhook channel is shared across many event types with different payload shapes.
#[derive(Debug, Clone, Deserialize)]
pub struct PaystackEvent {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl PaystackEvent {
    pub fn is_charge_success(&self) -> bool {
        self.event == CHARGE_SUCCESS_EVENT
    }

    pub fn charge_data(&self) -> Result<ChargeEventData, PaystackApiError> {
        serde_json::from_value(self.data.clone()).map_err(|e| PaystackApiError::JsonError(e.to_string()))
    }
}

/// The `data` object of a `charge.success` webhook. Field-for-field compatible with the
/// verify payload, minus the envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ChargeEventData {
    pub reference: String,
    pub amount: i64,
    #[serde(default)]
    pub status: Option<TransactionStatus>,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub channel: Option<String>,
}

impl ChargeEventData {
    pub fn customer_email(&self) -> Option<&str> {
        self.customer.as_ref().and_then(|c| c.email.as_deref())
    }
}
