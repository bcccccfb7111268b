mod support;

use chrono::Duration;
use laundry_payment_engine::{
    db_types::{EventKind, EventSource, OrderId, OrderIdStrategy, OrderStatusType, PaymentEvent},
    events::EventProducers,
    order_objects::OrderQueryFilter,
    traits::{MarkFailedOutcome, ReconcileResult, ReconciliationDatabase, ReconciliationError},
    OrderQueryApi, ReconciliationApi, SqliteDatabase,
};
use lps_common::Naira;
use serde_json::json;

async fn setup(strategy: OrderIdStrategy) -> (ReconciliationApi<SqliteDatabase>, OrderQueryApi<SqliteDatabase>, String) {
    let url = support::random_db_url();
    let db = support::new_db(&url).await;
    let queries = OrderQueryApi::new(db.clone());
    let api = ReconciliationApi::new(db, strategy, EventProducers::default());
    (api, queries, url)
}

fn charge(reference: &str, amount_minor: i64) -> PaymentEvent {
    PaymentEvent::charge_succeeded(reference, amount_minor, EventSource::Webhook)
}

#[tokio::test]
async fn new_orders_start_pending() {
    let (api, queries, url) = setup(OrderIdStrategy::Reference).await;
    let result = api.process_new_order(support::new_order("ord-100", "cust-1", 5000)).await.unwrap();
    assert!(result.is_new());
    let order = result.order();
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.total_amount, Naira::from(5000));
    assert!(order.payment_reference.is_none());
    let fetched = queries.fetch_order(&OrderId::from("ord-100")).await.unwrap().unwrap();
    assert_eq!(fetched.customer_id, "cust-1");
    support::cleanup(&url).await;
}

#[tokio::test]
async fn order_creation_is_idempotent() {
    let (api, _, url) = setup(OrderIdStrategy::Reference).await;
    let first = api.process_new_order(support::new_order("ord-101", "cust-1", 5000)).await.unwrap();
    assert!(first.is_new());
    // A retried creation call, even one carrying different values, returns the stored row.
    let second = api.process_new_order(support::new_order("ord-101", "cust-1", 9999)).await.unwrap();
    assert!(!second.is_new());
    assert_eq!(second.order().total_amount, Naira::from(5000));
    support::cleanup(&url).await;
}

#[tokio::test]
async fn invalid_orders_are_rejected() {
    let (api, _, url) = setup(OrderIdStrategy::Reference).await;
    let mut order = support::new_order("ord-102", "cust-1", 5000);
    order.total_amount = Naira::from(0);
    let err = api.process_new_order(order).await.unwrap_err();
    assert!(matches!(err, ReconciliationError::InvalidOrder(_)));
    support::cleanup(&url).await;
}

#[tokio::test]
async fn a_confirmation_settles_its_order() {
    let (api, _, url) = setup(OrderIdStrategy::Reference).await;
    api.process_new_order(support::new_order("ord-200", "cust-1", 5000)).await.unwrap();
    let result = api.reconcile(charge("ord-200", 500_000).with_email("cust-1@example.com")).await.unwrap();
    let order = match result {
        ReconcileResult::Applied(order) => order,
        other => panic!("Expected the confirmation to apply, got {other:?}"),
    };
    assert_eq!(order.status, OrderStatusType::Paid);
    assert_eq!(order.payment_reference.as_deref(), Some("ord-200"));
    support::cleanup(&url).await;
}

#[tokio::test]
async fn duplicate_confirmations_settle_exactly_once() {
    let (api, queries, url) = setup(OrderIdStrategy::Reference).await;
    api.process_new_order(support::new_order("ord-201", "cust-1", 5000)).await.unwrap();
    let mut applied = 0;
    let mut already = 0;
    for _ in 0..4 {
        match api.reconcile(charge("ord-201", 500_000)).await.unwrap() {
            ReconcileResult::Applied(_) => applied += 1,
            ReconcileResult::AlreadyReconciled(_) => already += 1,
            other => panic!("Unexpected outcome {other:?}"),
        }
    }
    assert_eq!(applied, 1);
    assert_eq!(already, 3);
    let order = queries.fetch_order(&OrderId::from("ord-201")).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Paid);
    support::cleanup(&url).await;
}

#[tokio::test]
async fn unknown_references_are_kept_not_dropped() {
    let (api, queries, url) = setup(OrderIdStrategy::Reference).await;
    let result = api.reconcile(charge("PSK-77301", 120_000).with_email("ghost@example.com")).await.unwrap();
    assert!(matches!(result, ReconcileResult::OrderNotFound(ref r) if r == "PSK-77301"));
    let unmatched = queries.unmatched_events().await.unwrap();
    assert_eq!(unmatched.len(), 1);
    assert_eq!(unmatched[0].reference, "PSK-77301");
    assert_eq!(unmatched[0].amount_minor, 120_000);
    assert!(unmatched[0].order_id.is_none());
    // Redelivery does not add a second row.
    api.reconcile(charge("PSK-77301", 120_000)).await.unwrap();
    assert_eq!(queries.unmatched_events().await.unwrap().len(), 1);
    support::cleanup(&url).await;
}

#[tokio::test]
async fn a_late_order_is_recovered_by_the_next_signal() {
    let (api, queries, url) = setup(OrderIdStrategy::Reference).await;
    // The webhook outruns the order-creation call.
    let result = api.reconcile(charge("ord-300", 500_000)).await.unwrap();
    assert!(matches!(result, ReconcileResult::OrderNotFound(_)));
    assert_eq!(queries.unmatched_events().await.unwrap().len(), 1);
    // The order turns up, and a later signal for the same charge settles it. The ledger keeps a
    // single row for the reference and back-links it to the order.
    api.process_new_order(support::new_order("ord-300", "cust-1", 5000)).await.unwrap();
    let event = PaymentEvent::charge_succeeded("ord-300", 500_000, EventSource::DirectVerify);
    let result = api.reconcile(event).await.unwrap();
    assert!(result.is_applied());
    assert!(queries.unmatched_events().await.unwrap().is_empty());
    support::cleanup(&url).await;
}

#[tokio::test]
async fn metadata_strategy_matches_on_the_metadata_key() {
    let (api, queries, url) = setup(OrderIdStrategy::Metadata).await;
    api.process_new_order(support::new_order("ord-400", "cust-1", 7500)).await.unwrap();
    let event = charge("PSK-400", 750_000).with_metadata(json!({"order_id": "ord-400", "user_id": "cust-1"}));
    let result = api.reconcile(event).await.unwrap();
    assert!(result.is_applied());
    let order = queries.fetch_order(&OrderId::from("ord-400")).await.unwrap().unwrap();
    assert_eq!(order.payment_reference.as_deref(), Some("PSK-400"));
    // Without metadata there is nothing to match on; the reference alone is not used.
    let result = api.reconcile(charge("PSK-401", 100)).await.unwrap();
    assert!(matches!(result, ReconcileResult::OrderNotFound(_)));
    support::cleanup(&url).await;
}

#[tokio::test]
async fn the_payment_reference_is_written_once() {
    let (api, queries, url) = setup(OrderIdStrategy::Metadata).await;
    api.process_new_order(support::new_order("ord-500", "cust-1", 5000)).await.unwrap();
    let meta = json!({"order_id": "ord-500"});
    api.reconcile(charge("PSK-1", 500_000).with_metadata(meta.clone())).await.unwrap();
    let result = api.reconcile(charge("PSK-2", 500_000).with_metadata(meta)).await.unwrap();
    assert!(matches!(result, ReconcileResult::AlreadyReconciled(_)));
    let order = queries.fetch_order(&OrderId::from("ord-500")).await.unwrap().unwrap();
    assert_eq!(order.payment_reference.as_deref(), Some("PSK-1"));
    support::cleanup(&url).await;
}

#[tokio::test]
async fn failed_orders_never_revive() {
    let (api, queries, url) = setup(OrderIdStrategy::Reference).await;
    api.process_new_order(support::new_order("ord-600", "cust-1", 5000)).await.unwrap();
    let outcome = api.record_failure(&OrderId::from("ord-600"), "ord-600").await.unwrap();
    assert!(matches!(outcome, MarkFailedOutcome::Applied(_)));
    // A success signal for a failed order is flagged, not applied.
    let result = api.reconcile(charge("ord-600", 500_000)).await.unwrap();
    let order = match result {
        ReconcileResult::AlreadyReconciled(order) => order,
        other => panic!("Expected AlreadyReconciled, got {other:?}"),
    };
    assert_eq!(order.status, OrderStatusType::Failed);
    let stored = queries.fetch_order(&OrderId::from("ord-600")).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatusType::Failed);
    assert!(stored.payment_reference.is_none());
    support::cleanup(&url).await;
}

#[tokio::test]
async fn failure_signals_never_touch_settled_orders() {
    let (api, queries, url) = setup(OrderIdStrategy::Reference).await;
    api.process_new_order(support::new_order("ord-601", "cust-1", 5000)).await.unwrap();
    api.reconcile(charge("ord-601", 500_000)).await.unwrap();
    let outcome = api.record_failure(&OrderId::from("ord-601"), "ord-601").await.unwrap();
    assert!(matches!(outcome, MarkFailedOutcome::AlreadyTerminal(_)));
    let order = queries.fetch_order(&OrderId::from("ord-601")).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Paid);
    support::cleanup(&url).await;
}

#[tokio::test]
async fn non_charge_events_are_refused() {
    let (api, _, url) = setup(OrderIdStrategy::Reference).await;
    let mut event = charge("ord-700", 100);
    event.kind = EventKind::Other("transfer.success".into());
    match api.reconcile(event).await {
        Err(ReconciliationError::UnsupportedEventKind(kind)) => assert_eq!(kind, "transfer.success"),
        other => panic!("Expected UnsupportedEventKind, got {other:?}"),
    }
    support::cleanup(&url).await;
}

#[tokio::test]
async fn the_stale_sweep_only_sees_pending_orders() {
    let (api, _, url) = setup(OrderIdStrategy::Reference).await;
    api.process_new_order(support::new_order("ord-800", "cust-1", 5000)).await.unwrap();
    api.process_new_order(support::new_order("ord-801", "cust-1", 5000)).await.unwrap();
    api.reconcile(charge("ord-801", 500_000)).await.unwrap();
    let stale = api.db().fetch_stale_pending_orders(Duration::zero()).await.unwrap();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].order_id.as_str(), "ord-800");
    let stale = api.db().fetch_stale_pending_orders(Duration::hours(1)).await.unwrap();
    assert!(stale.is_empty());
    support::cleanup(&url).await;
}

#[tokio::test]
async fn customer_history_sums_the_totals() {
    let (api, queries, url) = setup(OrderIdStrategy::Reference).await;
    api.process_new_order(support::new_order("ord-810", "cust-9", 5000)).await.unwrap();
    api.process_new_order(support::new_order("ord-811", "cust-9", 7500)).await.unwrap();
    api.process_new_order(support::new_order("ord-812", "cust-other", 100)).await.unwrap();
    let history = queries.customer_orders("cust-9").await.unwrap();
    assert_eq!(history.total_orders, 2);
    assert_eq!(history.total_amount, Naira::from(12_500));
    // Newest first.
    assert_eq!(history.orders[0].order_id.as_str(), "ord-811");
    support::cleanup(&url).await;
}

#[tokio::test]
async fn search_clauses_compose() {
    let (api, queries, url) = setup(OrderIdStrategy::Reference).await;
    api.process_new_order(support::new_order("ord-820", "cust-1", 5000)).await.unwrap();
    api.process_new_order(support::new_order("ord-821", "cust-1", 6000)).await.unwrap();
    api.process_new_order(support::new_order("ord-822", "cust-2", 7000)).await.unwrap();
    api.reconcile(charge("ord-821", 600_000)).await.unwrap();

    let query = OrderQueryFilter::default().with_customer_id("cust-1").with_status(OrderStatusType::Paid);
    let found = queries.search_orders(query).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].order_id.as_str(), "ord-821");

    let query = OrderQueryFilter::default().with_status(OrderStatusType::Pending);
    let found = queries.search_orders(query).await.unwrap();
    assert_eq!(found.len(), 2);

    let query = OrderQueryFilter::default().with_reference("ord-821");
    let found = queries.search_orders(query).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].customer_id, "cust-1");
    support::cleanup(&url).await;
}
