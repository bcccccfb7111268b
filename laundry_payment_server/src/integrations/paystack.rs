//! Glue between the gateway's wire types and the engine's reconciliation types, plus the event
//! hooks the server installs at startup.

use laundry_payment_engine::{
    db_types::{EventSource, PaymentEvent},
    events::EventHooks,
};
use log::*;
use paystack_tools::{ChargeEventData, VerifiedTransaction};

/// Turns a verified `charge.success` webhook payload into the engine's reconciliation input.
/// The amount stays in kobo; the engine stores what the gateway reported.
pub fn payment_event_from_charge(data: &ChargeEventData) -> PaymentEvent {
    let mut event = PaymentEvent::charge_succeeded(data.reference.as_str(), data.amount, EventSource::Webhook);
    if let Some(email) = data.customer_email() {
        event = event.with_email(email);
    }
    if let Some(metadata) = &data.metadata {
        event = event.with_metadata(metadata.clone());
    }
    event
}

/// Same conversion for a direct verify-by-reference result, e.g. from the public verify endpoint
/// or the settlement sweep. Only call this for transactions whose status is success.
pub fn payment_event_from_verification(tx: &VerifiedTransaction) -> PaymentEvent {
    let mut event = PaymentEvent::charge_succeeded(tx.reference.as_str(), tx.amount, EventSource::DirectVerify);
    if let Some(email) = tx.customer_email() {
        event = event.with_email(email);
    }
    if let Some(metadata) = &tx.metadata {
        event = event.with_metadata(metadata.clone());
    }
    event
}

/// The hooks the server runs outside the reconcile path. Kept to logging for now; this is the
/// place to plug in customer receipts or an operator pager.
pub fn build_event_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(|ev| {
        Box::pin(async move {
            info!("🎉️ Payment confirmed. {}. Time to get washing!", ev.order);
        })
    });
    hooks.on_unmatched_payment(|ev| {
        Box::pin(async move {
            let payment = &ev.payment;
            let email = payment.customer_email.as_deref().unwrap_or("<no email>");
            warn!(
                "🚨️ A {} payment of {} kobo (reference {}, from {email}) matches no order. The gateway has taken \
                 money that nothing in the store accounts for. It is recorded in the ledger and will appear in the \
                 unmatched report until an order claims it.",
                payment.source, payment.amount_minor, payment.reference
            );
        })
    });
    hooks
}
