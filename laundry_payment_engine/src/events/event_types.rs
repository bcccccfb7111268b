use crate::db_types::{Order, PaymentEvent};

/// Fired exactly once per order, by the reconcile call that wins the `Pending -> Paid`
/// transition. Duplicate and racing confirmations never re-fire it.
#[derive(Debug, Clone)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Fired when a payment signal cannot be matched to any order. The gateway has (most likely)
/// taken a customer's money and nothing in the store accounts for it yet, so someone should look.
#[derive(Debug, Clone)]
pub struct UnmatchedPaymentEvent {
    pub payment: PaymentEvent,
}

impl UnmatchedPaymentEvent {
    pub fn new(payment: PaymentEvent) -> Self {
        Self { payment }
    }
}
