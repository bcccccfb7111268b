use crate::db_types::{OrderId, OrderIdStrategy, PaymentEvent};

/// Works out which order a payment signal belongs to.
///
/// Under the `Reference` strategy the gateway reference *is* the order id, because the server
/// initializes every charge that way. Under `Metadata` the order id rides in the signal's
/// metadata; both `order_id` and `orderId` key spellings appear in the wild, so both are
/// accepted.
///
/// `None` means the signal carries nothing usable, and the caller should record it as unmatched.
pub fn resolve_order_id(event: &PaymentEvent, strategy: OrderIdStrategy) -> Option<OrderId> {
    match strategy {
        OrderIdStrategy::Reference => {
            let reference = event.reference.trim();
            if reference.is_empty() {
                None
            } else {
                Some(OrderId::from(reference))
            }
        },
        OrderIdStrategy::Metadata => event
            .metadata
            .as_ref()
            .and_then(|m| m.get("order_id").or_else(|| m.get("orderId")))
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(OrderId::from),
    }
}
