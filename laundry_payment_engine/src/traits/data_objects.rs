use crate::db_types::Order;

/// Outcome of an order insert. Inserting an order id that already exists is not an error, it is
/// how retried creation calls stay idempotent.
#[derive(Debug, Clone)]
pub enum InsertOrderResult {
    /// The order was created by this call.
    Inserted(Order),
    /// An order with this id already existed. The stored row is returned untouched.
    AlreadyExists(Order),
}

impl InsertOrderResult {
    pub fn order(&self) -> &Order {
        match self {
            InsertOrderResult::Inserted(o) | InsertOrderResult::AlreadyExists(o) => o,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, InsertOrderResult::Inserted(_))
    }
}

/// Outcome of the conditional `Pending -> Paid` transition.
///
/// The transition is a single compare-and-swap in the store, so when several confirmations of the
/// same charge race each other, exactly one caller sees [`MarkPaidOutcome::Applied`] and every
/// other caller sees [`MarkPaidOutcome::AlreadyPaid`]. Losing that race is a result, never an
/// error.
#[derive(Debug, Clone)]
pub enum MarkPaidOutcome {
    /// This call performed the transition. Fire the paid hooks.
    Applied(Order),
    /// The order was already out of `Pending`. Check the returned row's status before assuming it
    /// is actually paid; a failed order that later receives a success signal also lands here.
    AlreadyPaid(Order),
    /// No order with that id exists.
    NotFound,
}

/// Outcome of the conditional `Pending -> Failed` transition. Same compare-and-swap scheme as
/// [`MarkPaidOutcome`].
#[derive(Debug, Clone)]
pub enum MarkFailedOutcome {
    Applied(Order),
    /// The order had already reached a terminal state, so the failure signal changed nothing.
    AlreadyTerminal(Order),
    NotFound,
}

/// What reconciling one payment signal did. All three variants are successes from the caller's
/// point of view; a webhook handler acks the gateway identically for each of them.
#[derive(Debug, Clone)]
pub enum ReconcileResult {
    /// The signal settled its order. This happens exactly once per order.
    Applied(Order),
    /// The order was already settled. Duplicate deliveries and race losers land here.
    AlreadyReconciled(Order),
    /// No local order matches the signal. The signal is kept in the ledger (unmatched) and the
    /// carried string is the gateway reference, for logging.
    OrderNotFound(String),
}

impl ReconcileResult {
    pub fn is_applied(&self) -> bool {
        matches!(self, ReconcileResult::Applied(_))
    }

    pub fn order(&self) -> Option<&Order> {
        match self {
            ReconcileResult::Applied(o) | ReconcileResult::AlreadyReconciled(o) => Some(o),
            ReconcileResult::OrderNotFound(_) => None,
        }
    }
}
