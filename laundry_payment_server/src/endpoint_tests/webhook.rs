use actix_web::{
    body::MessageBody,
    dev::HttpServiceFactory,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    App,
};
use chrono::{TimeZone, Utc};
use laundry_payment_engine::{
    db_types::{LaundryItem, LaundryItemKind, Order, OrderId, OrderIdStrategy, OrderStatusType},
    events::EventProducers,
    traits::{MarkPaidOutcome, ReconciliationError},
    ReconciliationApi,
};
use lps_common::{Naira, Secret};
use paystack_tools::sign_payload;
use serde_json::json;

use super::mocks::MockReconciliationStore;
use crate::{
    middleware::{HmacMiddlewareFactory, SIGNATURE_HEADER},
    paystack_routes::PaystackWebhookRoute,
};

// DO NOT re-use this secret anywhere.
const WEBHOOK_SECRET: &str = "sk_test_endpoint_webhook_secret";
const REFERENCE: &str = "1e7c9f5a-63ce-48c4-9b58-7f28c1d04a9e";

#[actix_web::test]
async fn valid_delivery_settles_the_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockReconciliationStore::new();
    store
        .expect_reconcile_charge()
        .withf(|order_id, event| {
            order_id.as_str() == REFERENCE && event.reference == REFERENCE && event.amount_minor == 500_000
        })
        .times(1)
        .returning(|_, _| Ok((MarkPaidOutcome::Applied(paid_order()), true)));
    let payload = charge_success_body(REFERENCE, 500_000).to_string();
    let signature = sign_payload(WEBHOOK_SECRET, payload.as_bytes());
    let (status, body) = deliver(store, payload, Some(signature)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"received":true}"#);
}

#[actix_web::test]
async fn redelivery_is_absorbed_by_the_ledger() {
    let _ = env_logger::try_init().ok();
    let mut store = MockReconciliationStore::new();
    let mut seq = mockall::Sequence::new();
    store
        .expect_reconcile_charge()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok((MarkPaidOutcome::Applied(paid_order()), true)));
    store
        .expect_reconcile_charge()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok((MarkPaidOutcome::AlreadyPaid(paid_order()), false)));
    let api = ReconciliationApi::new(store, OrderIdStrategy::Reference, EventProducers::default());
    let app = App::new().app_data(web::Data::new(api)).service(webhook_scope());
    let service = test::init_service(app).await;
    let payload = charge_success_body(REFERENCE, 500_000).to_string();
    let signature = sign_payload(WEBHOOK_SECRET, payload.as_bytes());
    // The gateway may deliver the same event any number of times. Both deliveries get the same
    // acknowledgement, and the second one must not settle anything.
    for _ in 0..2 {
        let req = TestRequest::post()
            .uri("/paystack/webhook")
            .insert_header((SIGNATURE_HEADER, signature.clone()))
            .set_payload(payload.clone())
            .to_request();
        let res = test::call_service(&service, req).await;
        assert_eq!(res.status(), StatusCode::OK);
    }
}

#[actix_web::test]
async fn unknown_references_are_recorded_not_bounced() {
    let _ = env_logger::try_init().ok();
    let mut store = MockReconciliationStore::new();
    store.expect_reconcile_charge().times(1).returning(|_, _| Ok((MarkPaidOutcome::NotFound, true)));
    let payload = charge_success_body("no-such-order", 120_000).to_string();
    let signature = sign_payload(WEBHOOK_SECRET, payload.as_bytes());
    let (status, body) = deliver(store, payload, Some(signature)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"received":true}"#);
}

#[actix_web::test]
async fn other_event_kinds_are_acknowledged_and_ignored() {
    let _ = env_logger::try_init().ok();
    // No expectations: any storage call fails the test.
    let store = MockReconciliationStore::new();
    let payload = json!({
        "event": "transfer.success",
        "data": { "reference": "tr-998", "amount": 40_000 }
    })
    .to_string();
    let signature = sign_payload(WEBHOOK_SECRET, payload.as_bytes());
    let (status, body) = deliver(store, payload, Some(signature)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"received":true}"#);
}

#[actix_web::test]
async fn malformed_bodies_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let store = MockReconciliationStore::new();
    // Signed correctly, but not an event envelope. Bouncing it would only trigger a resend of
    // the same bytes.
    let payload = "this is not json".to_string();
    let signature = sign_payload(WEBHOOK_SECRET, payload.as_bytes());
    let (status, body) = deliver(store, payload, Some(signature)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"received":true}"#);
}

#[actix_web::test]
async fn missing_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let store = MockReconciliationStore::new();
    let payload = charge_success_body(REFERENCE, 500_000).to_string();
    let err = deliver(store, payload, None).await.expect_err("Expected error");
    assert_eq!(err, "Authentication Error. Webhook signature is invalid.");
}

#[actix_web::test]
async fn tampered_bodies_are_rejected() {
    let _ = env_logger::try_init().ok();
    let store = MockReconciliationStore::new();
    let payload = charge_success_body(REFERENCE, 500_000).to_string();
    let signature = sign_payload(WEBHOOK_SECRET, payload.as_bytes());
    let tampered = payload.replace("500000", "1");
    let err = deliver(store, tampered, Some(signature)).await.expect_err("Expected error");
    assert_eq!(err, "Authentication Error. Webhook signature is invalid.");
}

#[actix_web::test]
async fn wrong_secret_is_rejected() {
    let _ = env_logger::try_init().ok();
    let store = MockReconciliationStore::new();
    let payload = charge_success_body(REFERENCE, 500_000).to_string();
    let signature = sign_payload("sk_test_some_other_secret", payload.as_bytes());
    let err = deliver(store, payload, Some(signature)).await.expect_err("Expected error");
    assert_eq!(err, "Authentication Error. Webhook signature is invalid.");
}

#[actix_web::test]
async fn storage_failures_ask_the_gateway_to_retry() {
    let _ = env_logger::try_init().ok();
    let mut store = MockReconciliationStore::new();
    store
        .expect_reconcile_charge()
        .times(1)
        .returning(|_, _| Err(ReconciliationError::DatabaseError("the pool is gone".to_string())));
    let payload = charge_success_body(REFERENCE, 500_000).to_string();
    let signature = sign_payload(WEBHOOK_SECRET, payload.as_bytes());
    let (status, body) = deliver(store, payload, Some(signature)).await.expect("Request failed");
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, r#"{"error":"An error occurred on the backend of the server. Database error: the pool is gone"}"#);
}

fn webhook_scope() -> impl HttpServiceFactory {
    web::scope("/paystack")
        .wrap(HmacMiddlewareFactory::new(Secret::new(WEBHOOK_SECRET.to_string())))
        .service(PaystackWebhookRoute::<MockReconciliationStore>::new())
}

async fn deliver(
    store: MockReconciliationStore,
    payload: String,
    signature: Option<String>,
) -> Result<(StatusCode, String), String> {
    let api = ReconciliationApi::new(store, OrderIdStrategy::Reference, EventProducers::default());
    let app = App::new().app_data(web::Data::new(api)).service(webhook_scope());
    let service = test::init_service(app).await;
    let mut req = TestRequest::post().uri("/paystack/webhook").set_payload(payload);
    if let Some(signature) = signature {
        req = req.insert_header((SIGNATURE_HEADER, signature));
    }
    let (_, res) = test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

fn charge_success_body(reference: &str, amount_kobo: i64) -> serde_json::Value {
    json!({
        "event": "charge.success",
        "data": {
            "reference": reference,
            "amount": amount_kobo,
            "status": "success",
            "customer": { "email": "deji@example.com" },
            "metadata": { "order_id": reference },
            "channel": "card"
        }
    })
}

fn paid_order() -> Order {
    Order {
        id: 11,
        order_id: OrderId(REFERENCE.into()),
        customer_id: "cust-1".to_string(),
        customer_email: "deji@example.com".to_string(),
        pickup_address: "12 Allen Avenue, Ikeja".to_string(),
        dropoff_address: "12 Allen Avenue, Ikeja".to_string(),
        pickup_date: Utc.with_ymd_and_hms(2024, 4, 2, 9, 0, 0).unwrap(),
        dropoff_date: Utc.with_ymd_and_hms(2024, 4, 4, 17, 0, 0).unwrap(),
        items: sqlx::types::Json(vec![LaundryItem::new(LaundryItemKind::Suit, 1, Naira::from(5000))]),
        total_amount: Naira::from(5000),
        payment_reference: Some(REFERENCE.to_string()),
        metadata: None,
        status: OrderStatusType::Paid,
        created_at: Utc.with_ymd_and_hms(2024, 4, 1, 12, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 4, 1, 12, 30, 0).unwrap(),
    }
}
