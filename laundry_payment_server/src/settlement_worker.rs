//! The settlement sweep: a background job that re-verifies stale pending orders directly with
//! the gateway, for the day a webhook delivery goes missing. Everything it finds goes through
//! the same reconcile path as a webhook, so running it concurrently with live deliveries is safe.

use chrono::Duration;
use laundry_payment_engine::{
    db_types::{Order, OrderIdStrategy},
    events::EventProducers,
    traits::{ReconciliationDatabase, ReconciliationError},
    ReconciliationApi,
    SqliteDatabase,
};
use log::*;
use paystack_tools::{PaystackApi, PaystackApiError};
use tokio::task::JoinHandle;

use crate::{config::SettlementConfig, integrations::paystack::payment_event_from_verification};

#[derive(Debug, Default, Clone, Copy)]
struct SweepSummary {
    checked: usize,
    settled: usize,
    failed: usize,
}

/// Starts the settlement worker. Do not await the returned JoinHandle, as it will run
/// indefinitely.
pub fn start_settlement_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    paystack: PaystackApi,
    strategy: OrderIdStrategy,
    config: SettlementConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(config.interval());
        let api = ReconciliationApi::new(db, strategy, producers);
        info!(
            "🕰️ Settlement worker started. Orders pending for more than {}s are re-verified with the gateway every \
             {}s",
            config.max_age_secs, config.interval_secs
        );
        loop {
            timer.tick().await;
            debug!("🕰️ Running the settlement sweep");
            match run_sweep(&api, &paystack, config.max_age()).await {
                Ok(s) if s.checked > 0 => {
                    info!(
                        "🕰️ Settlement sweep done. {} stale orders checked, {} settled, {} marked failed",
                        s.checked, s.settled, s.failed
                    );
                },
                Ok(_) => trace!("🕰️ No stale pending orders to check"),
                Err(e) => error!("🕰️ Error running the settlement sweep: {e}"),
            }
        }
    })
}

async fn run_sweep<B: ReconciliationDatabase>(
    api: &ReconciliationApi<B>,
    paystack: &PaystackApi,
    max_age: Duration,
) -> Result<SweepSummary, ReconciliationError> {
    let stale = api.db().fetch_stale_pending_orders(max_age).await?;
    let mut summary = SweepSummary { checked: stale.len(), ..Default::default() };
    for order in &stale {
        settle_order(api, paystack, order, &mut summary).await?;
    }
    Ok(summary)
}

/// Checks one stale order against the gateway. The order id doubles as the lookup reference,
/// which is exact under the reference-as-id strategy; under the metadata strategy the gateway
/// simply reports the reference as unknown and the order waits for its webhook.
async fn settle_order<B: ReconciliationDatabase>(
    api: &ReconciliationApi<B>,
    paystack: &PaystackApi,
    order: &Order,
    summary: &mut SweepSummary,
) -> Result<(), ReconciliationError> {
    match paystack.verify_transaction(order.order_id.as_str()).await {
        Ok(tx) if tx.status.is_success() => {
            info!("🕰️ Order {} has a confirmed charge the webhook never told us about", order.order_id);
            let outcome = api.reconcile(payment_event_from_verification(&tx)).await?;
            if outcome.is_applied() {
                summary.settled += 1;
            }
        },
        Ok(tx) if tx.status.is_failure() => {
            debug!("🕰️ The gateway reports {} for order {}", tx.status, order.order_id);
            api.record_failure(&order.order_id, &tx.reference).await?;
            summary.failed += 1;
        },
        Ok(tx) => {
            debug!("🕰️ Order {} is still {} at the gateway. Leaving it pending", order.order_id, tx.status);
        },
        Err(PaystackApiError::QueryError { status: 404, .. }) => {
            debug!(
                "🕰️ The gateway has no transaction under reference {}. Checkout was probably never started",
                order.order_id
            );
        },
        Err(e) => {
            warn!("🕰️ Could not verify order {} with the gateway. Will retry next sweep. {e}", order.order_id);
        },
    }
    Ok(())
}
