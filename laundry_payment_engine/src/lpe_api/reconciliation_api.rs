use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{EventKind, NewOrder, Order, OrderId, OrderIdStrategy, OrderStatusType, PaymentEvent},
    events::{EventProducers, OrderPaidEvent, UnmatchedPaymentEvent},
    helpers::resolve_order_id,
    traits::{
        InsertOrderResult, MarkFailedOutcome, MarkPaidOutcome, ReconcileResult, ReconciliationDatabase,
        ReconciliationError,
    },
};

/// The write-side API of the engine: order creation, and the reconciliation of payment signals
/// against orders.
///
/// `reconcile` is safe to call any number of times with the same signal, from any number of tasks
/// at once. The store's conditional update decides the winner; this layer only interprets the
/// outcome, keeps the ledger honest and fires hooks.
#[derive(Clone)]
pub struct ReconciliationApi<B> {
    db: B,
    id_strategy: OrderIdStrategy,
    producers: EventProducers,
}

impl<B> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B> ReconciliationApi<B>
where B: ReconciliationDatabase
{
    pub fn new(db: B, id_strategy: OrderIdStrategy, producers: EventProducers) -> Self {
        Self { db, id_strategy, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    pub fn id_strategy(&self) -> OrderIdStrategy {
        self.id_strategy
    }

    /// Validates and stores a new order in `Pending` status. Re-submitting an existing order id
    /// returns the stored order unchanged.
    pub async fn process_new_order(&self, order: NewOrder) -> Result<InsertOrderResult, ReconciliationError> {
        order.validate()?;
        trace!("🔄️📦️ Storing new order {}", order.order_id);
        let result = self.db.insert_order(order).await?;
        match &result {
            InsertOrderResult::Inserted(o) => {
                info!("🔄️📦️ Order {} created. {} awaiting payment", o.order_id, o.total_amount)
            },
            InsertOrderResult::AlreadyExists(o) => {
                debug!("🔄️📦️ Order {} already exists. Returning the stored order", o.order_id)
            },
        }
        Ok(result)
    }

    /// Feeds one charge-success signal through reconciliation.
    ///
    /// Whatever happens inside (first delivery, duplicate, race, unknown reference), the caller
    /// gets an `Ok` describing it; an `Err` means the signal was not a charge success at all, or
    /// the store itself failed and the caller should make the gateway retry.
    pub async fn reconcile(&self, event: PaymentEvent) -> Result<ReconcileResult, ReconciliationError> {
        if let EventKind::Other(kind) = &event.kind {
            return Err(ReconciliationError::UnsupportedEventKind(kind.clone()));
        }
        trace!("🔄️💰️ {} signal received for reference {}", event.source, event.reference);
        let Some(order_id) = resolve_order_id(&event, self.id_strategy) else {
            warn!(
                "🔄️🚨️ No order id in the {} signal for reference {} using the {} strategy. Recording it as \
                 unmatched",
                event.source, event.reference, self.id_strategy
            );
            return self.handle_unmatched(event).await;
        };
        let (outcome, fresh) = self.db.reconcile_charge(&order_id, &event).await?;
        if !fresh {
            debug!(
                "🔄️💰️ Reference {} ({}) has been delivered before. The ledger keeps the first delivery only",
                event.reference, event.kind
            );
        }
        match outcome {
            MarkPaidOutcome::Applied(order) => {
                info!(
                    "🔄️✅️ Order {} is paid. {} confirmed via {}",
                    order.order_id, order.total_amount, event.source
                );
                self.call_order_paid_hook(&order).await;
                Ok(ReconcileResult::Applied(order))
            },
            MarkPaidOutcome::AlreadyPaid(order) => {
                if order.status == OrderStatusType::Failed {
                    warn!(
                        "🔄️🚨️ Reference {} reports success, but order {} is marked Failed. Leaving the order \
                         alone. This needs a human",
                        event.reference, order.order_id
                    );
                } else {
                    debug!("🔄️✅️ Order {} is already settled. Nothing to do", order.order_id);
                }
                Ok(ReconcileResult::AlreadyReconciled(order))
            },
            MarkPaidOutcome::NotFound => {
                warn!(
                    "🔄️🚨️ Reference {} resolved to order {order_id}, but no such order exists",
                    event.reference
                );
                if fresh {
                    self.call_unmatched_hook(&event).await;
                }
                Ok(ReconcileResult::OrderNotFound(event.reference))
            },
        }
    }

    /// Marks an order as failed in response to an explicit, final failure signal from the
    /// gateway. Settled orders are never touched.
    pub async fn record_failure(
        &self,
        order_id: &OrderId,
        reference: &str,
    ) -> Result<MarkFailedOutcome, ReconciliationError> {
        let outcome = self.db.conditional_mark_failed(order_id).await?;
        match &outcome {
            MarkFailedOutcome::Applied(o) => {
                info!("🔄️❌️ Order {} marked as Failed. Reference {reference} did not complete", o.order_id)
            },
            MarkFailedOutcome::AlreadyTerminal(o) => {
                debug!(
                    "🔄️❌️ Order {} is already {}. Ignoring the failure signal for {reference}",
                    o.order_id, o.status
                )
            },
            MarkFailedOutcome::NotFound => {
                warn!("🔄️🚨️ Failure signal for reference {reference} matches no order {order_id}")
            },
        }
        Ok(outcome)
    }

    async fn handle_unmatched(&self, event: PaymentEvent) -> Result<ReconcileResult, ReconciliationError> {
        let fresh = self.db.record_unmatched_event(&event).await?;
        if fresh {
            self.call_unmatched_hook(&event).await;
        } else {
            debug!("🔄️💰️ Unmatched reference {} was already on file", event.reference);
        }
        Ok(ReconcileResult::OrderNotFound(event.reference))
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producers {
            let event = OrderPaidEvent::new(order.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_unmatched_hook(&self, payment: &PaymentEvent) {
        for emitter in &self.producers.unmatched_payment_producers {
            let event = UnmatchedPaymentEvent::new(payment.clone());
            emitter.publish_event(event).await;
        }
    }
}
