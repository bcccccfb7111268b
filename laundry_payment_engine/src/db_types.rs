use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use chrono::{DateTime, Utc};
use log::*;
use lps_common::Naira;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Could not convert '{0}' into a {1}")]
pub struct ConversionError(pub String, pub &'static str);

//--------------------------------------     OrderStatusType  ---------------------------------------------------------

/// The lifecycle state of an order.
///
/// `Pending` is the only state an order is ever created in, and the only state it can leave.
/// `Paid` and `Failed` are terminal; the store refuses to transition out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// Created and awaiting a payment signal.
    Pending,
    /// A successful charge has been reconciled against this order. Terminal.
    Paid,
    /// The gateway reported an explicit, final failure for this order's charge. Terminal.
    Failed,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Paid | OrderStatusType::Failed)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Paid => write!(f, "Paid"),
            OrderStatusType::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(OrderStatusType::Pending),
            "paid" => Ok(OrderStatusType::Paid),
            "failed" => Ok(OrderStatusType::Failed),
            _ => Err(ConversionError(s.to_string(), "OrderStatusType")),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|e| {
            error!("🚨️ {e}. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------        OrderId       ---------------------------------------------------------

/// The customer-facing order identifier. Also doubles as the payment reference when the server
/// runs the default matching strategy, which is why it is minted as a UUID rather than a counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl FromStr for OrderId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

//--------------------------------------      LaundryItem     ---------------------------------------------------------

/// The garment categories the storefront offers. Unknown categories are rejected at the API edge
/// rather than silently coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaundryItemKind {
    Shirt,
    Trouser,
    Tshirt,
    Dress,
    Suit,
    Jacket,
    Bedsheet,
    Towel,
    Curtains,
}

impl Display for LaundryItemKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LaundryItemKind::Shirt => "shirt",
            LaundryItemKind::Trouser => "trouser",
            LaundryItemKind::Tshirt => "tshirt",
            LaundryItemKind::Dress => "dress",
            LaundryItemKind::Suit => "suit",
            LaundryItemKind::Jacket => "jacket",
            LaundryItemKind::Bedsheet => "bedsheet",
            LaundryItemKind::Towel => "towel",
            LaundryItemKind::Curtains => "curtains",
        };
        write!(f, "{s}")
    }
}

/// One line of an order. Prices are per unit, in naira.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaundryItem {
    #[serde(rename = "type")]
    pub kind: LaundryItemKind,
    pub quantity: u32,
    pub price_per_unit: Naira,
}

impl LaundryItem {
    pub fn new(kind: LaundryItemKind, quantity: u32, price_per_unit: Naira) -> Self {
        Self { kind, quantity, price_per_unit }
    }

    pub fn line_total(&self) -> Naira {
        self.price_per_unit * i64::from(self.quantity)
    }
}

//--------------------------------------         Order        ---------------------------------------------------------

/// A stored order, as returned by every storage call. Field names serialize in camelCase to match
/// the storefront's JSON conventions.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Internal row id. Not exposed to customers anywhere, but handy in logs.
    pub id: i64,
    pub order_id: OrderId,
    pub customer_id: String,
    pub customer_email: String,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub pickup_date: DateTime<Utc>,
    pub dropoff_date: DateTime<Utc>,
    pub items: Json<Vec<LaundryItem>>,
    pub total_amount: Naira,
    /// The gateway reference of the charge that settled this order. Set exactly once, by the
    /// first successful reconciliation, and never overwritten.
    pub payment_reference: Option<String>,
    pub metadata: Option<Json<Value>>,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_pending(&self) -> bool {
        self.status == OrderStatusType::Pending
    }

    pub fn is_settled(&self) -> bool {
        self.status.is_terminal()
    }
}

impl Display for Order {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Order {} ({}): {} for {}", self.order_id, self.status, self.total_amount, self.customer_id)
    }
}

//--------------------------------------       NewOrder       ---------------------------------------------------------

/// The information needed to create an order. Everything else on [`Order`] is filled in by the
/// store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    /// Client-supplied or freshly minted identifier. Inserting the same id twice is a no-op.
    pub order_id: OrderId,
    pub customer_id: String,
    pub customer_email: String,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub pickup_date: DateTime<Utc>,
    pub dropoff_date: DateTime<Utc>,
    pub items: Vec<LaundryItem>,
    pub total_amount: Naira,
    pub metadata: Option<Value>,
}

impl NewOrder {
    /// A minimal new order. Addresses, schedule and items start empty and can be filled in with
    /// the `with_*` builders; [`NewOrder::validate`] will insist on them before storage.
    pub fn new(order_id: OrderId, customer_id: String, customer_email: String, total_amount: Naira) -> Self {
        let now = Utc::now();
        Self {
            order_id,
            customer_id,
            customer_email,
            pickup_address: String::new(),
            dropoff_address: String::new(),
            pickup_date: now,
            dropoff_date: now,
            items: Vec::new(),
            total_amount,
            metadata: None,
        }
    }

    pub fn with_addresses<S: Into<String>>(mut self, pickup: S, dropoff: S) -> Self {
        self.pickup_address = pickup.into();
        self.dropoff_address = dropoff.into();
        self
    }

    pub fn with_schedule(mut self, pickup_date: DateTime<Utc>, dropoff_date: DateTime<Utc>) -> Self {
        self.pickup_date = pickup_date;
        self.dropoff_date = dropoff_date;
        self
    }

    pub fn with_items(mut self, items: Vec<LaundryItem>) -> Self {
        self.items = items;
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Checks the order for the problems we refuse to store. Run by the API layer before any
    /// insert, so the store only ever sees well-formed orders.
    pub fn validate(&self) -> Result<(), OrderValidationError> {
        if self.customer_id.trim().is_empty() {
            return Err(OrderValidationError::MissingField("customerId"));
        }
        if !self.customer_email.contains('@') {
            return Err(OrderValidationError::InvalidEmail(self.customer_email.clone()));
        }
        if self.pickup_address.trim().is_empty() {
            return Err(OrderValidationError::MissingField("pickupAddress"));
        }
        if self.dropoff_address.trim().is_empty() {
            return Err(OrderValidationError::MissingField("dropoffAddress"));
        }
        if self.dropoff_date < self.pickup_date {
            return Err(OrderValidationError::InvalidSchedule);
        }
        if self.items.is_empty() {
            return Err(OrderValidationError::NoItems);
        }
        if !self.total_amount.is_positive() {
            return Err(OrderValidationError::NonPositiveAmount(self.total_amount));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderValidationError {
    #[error("Required field is missing or empty: {0}")]
    MissingField(&'static str),
    #[error("Order amount must be positive, got {0}")]
    NonPositiveAmount(Naira),
    #[error("Order must contain at least one item")]
    NoItems,
    #[error("'{0}' is not a usable email address")]
    InvalidEmail(String),
    #[error("Dropoff cannot be scheduled before pickup")]
    InvalidSchedule,
}

//--------------------------------------     PaymentEvent     ---------------------------------------------------------

/// Where a payment signal entered the system. Purely informational; reconciliation treats all
/// sources identically, which is what makes racing delivery channels safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    /// Pushed to us by the gateway over the webhook endpoint.
    Webhook,
    /// Pulled by us from the gateway's verify endpoint.
    DirectVerify,
}

impl Display for EventSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EventSource::Webhook => write!(f, "webhook"),
            EventSource::DirectVerify => write!(f, "direct-verify"),
        }
    }
}

/// The signal type carried by a [`PaymentEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A charge completed successfully. The only kind reconciliation acts on.
    ChargeSucceeded,
    /// Anything else the gateway emits. Logged and ignored.
    Other(String),
}

impl Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::ChargeSucceeded => write!(f, "charge.success"),
            EventKind::Other(kind) => write!(f, "{kind}"),
        }
    }
}

/// A normalized payment signal, stripped of gateway-specific framing. Both the webhook handler
/// and the direct-verify path produce these, so the engine never has to know which channel a
/// confirmation travelled over.
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    /// The gateway's transaction reference. The deduplication key, together with `kind`.
    pub reference: String,
    pub kind: EventKind,
    /// The charged amount in the gateway's minor unit (kobo). Kept verbatim for audit and
    /// mismatch checks; the engine itself never does arithmetic with it.
    pub amount_minor: i64,
    pub customer_email: Option<String>,
    pub metadata: Option<Value>,
    pub source: EventSource,
}

impl PaymentEvent {
    pub fn charge_succeeded<S: Into<String>>(reference: S, amount_minor: i64, source: EventSource) -> Self {
        Self {
            reference: reference.into(),
            kind: EventKind::ChargeSucceeded,
            amount_minor,
            customer_email: None,
            metadata: None,
            source,
        }
    }

    pub fn with_email<S: Into<String>>(mut self, email: S) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn is_charge_success(&self) -> bool {
        self.kind == EventKind::ChargeSucceeded
    }
}

//--------------------------------------  PaymentEventRecord  ---------------------------------------------------------

/// A row of the payment event ledger. Every signal that reaches reconciliation lands here exactly
/// once; `order_id` is `NULL` when no order could be matched, which is what the unmatched-payments
/// report keys on.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEventRecord {
    pub id: i64,
    pub reference: String,
    pub kind: String,
    pub source: String,
    pub amount_minor: i64,
    pub customer_email: Option<String>,
    pub metadata: Option<Json<Value>>,
    pub order_id: Option<OrderId>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   OrderIdStrategy    ---------------------------------------------------------

/// How a payment signal is matched to an order. See [`crate::helpers::resolve_order_id`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderIdStrategy {
    /// The gateway reference *is* the order id. The default, because the server initializes
    /// charges with the order id as the reference.
    #[default]
    Reference,
    /// The order id is carried in the signal's metadata under an `order_id` key. For storefronts
    /// that let the gateway mint its own references.
    Metadata,
}

impl Display for OrderIdStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderIdStrategy::Reference => write!(f, "reference"),
            OrderIdStrategy::Metadata => write!(f, "metadata"),
        }
    }
}

impl FromStr for OrderIdStrategy {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reference" | "ref" => Ok(OrderIdStrategy::Reference),
            "metadata" | "meta" => Ok(OrderIdStrategy::Metadata),
            _ => Err(ConversionError(s.to_string(), "OrderIdStrategy")),
        }
    }
}

//--------------------------------------         Role         ---------------------------------------------------------

/// Access roles carried in API tokens. `User` can see their own orders, `ReadAll` can see
/// everyone's (support staff), `Write` can create orders and initialize charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    ReadAll,
    Write,
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::ReadAll => write!(f, "read_all"),
            Role::Write => write!(f, "write"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "read_all" | "readall" => Ok(Role::ReadAll),
            "write" => Ok(Role::Write),
            _ => Err(ConversionError(s.to_string(), "Role")),
        }
    }
}
