use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use laundry_payment_engine::{
    db_types::{
        LaundryItem,
        LaundryItemKind,
        Order,
        OrderId,
        OrderIdStrategy,
        OrderStatusType,
        PaymentEventRecord,
        Role,
    },
    events::EventProducers,
    traits::InsertOrderResult,
    OrderQueryApi,
    ReconciliationApi,
};
use log::debug;
use lps_common::Naira;
use serde_json::json;
use sqlx::types::Json;

use super::{
    helpers::{get_request, issue_token, post_request},
    mocks::{MockOrderStore, MockReconciliationStore},
};
use crate::{
    auth::JwtClaims,
    routes::{MyOrdersRoute, NewOrderRoute, OrderByIdRoute, OrderSearchRoute, UnmatchedPaymentsRoute},
};

const PAID_ORDER_ID: &str = "8ab6d0dc-0446-4f22-b8d9-6e312d38fe1b";
const PENDING_ORDER_ID: &str = "4823a98d-3c2a-4268-96a4-df0717c71e1c";

#[actix_web::test]
async fn fetch_my_orders_no_token() {
    let _ = env_logger::try_init().ok();
    let err = get_request("", "/orders", configure).await.expect_err("Expected error");
    assert_eq!(err, "Access token invalid or not provided");
}

#[actix_web::test]
async fn fetch_my_orders() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("cust-1", vec![Role::User]);
    let (status, body) = get_request(&token, "/orders", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ORDERS_JSON);
}

#[actix_web::test]
async fn fetch_my_orders_invalid_sig() {
    let _ = env_logger::try_init().ok();
    let mut token = valid_token("cust-1", vec![Role::User]);
    token.replace_range(token.len() - 10..token.len() - 5, "00000");
    debug!("Calling /orders with invalid token {token}");
    let err = get_request(&token, "/orders", configure).await.expect_err("Expected error");
    assert!(err.contains("Access token signature is invalid."), "was: {err}");
}

#[actix_web::test]
async fn search_needs_the_read_all_role() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("cust-1", vec![Role::User, Role::Write]);
    let err = get_request(&token, "/orders/search?customerId=cust-1", configure).await.expect_err("Expected error");
    assert_eq!(err, "Insufficient Permissions. This route requires [read_all]");
}

#[actix_web::test]
async fn search_orders_as_support_staff() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("staff-1", vec![Role::ReadAll]);
    let (status, body) =
        get_request(&token, "/orders/search?customerId=cust-1&status=PAID", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, format!("[{ORDER_1_JSON},{ORDER_2_JSON}]"));
}

#[actix_web::test]
async fn fetch_order_by_id_as_owner() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("cust-1", vec![Role::User]);
    let (status, body) =
        get_request(&token, &format!("/orders/{PAID_ORDER_ID}"), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ORDER_1_JSON);
}

#[actix_web::test]
async fn other_customers_orders_look_absent() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("cust-2", vec![Role::User]);
    let (status, body) =
        get_request(&token, &format!("/orders/{PAID_ORDER_ID}"), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, format!(r#"{{"error":"The data was not found. Order #{PAID_ORDER_ID}"}}"#));
}

#[actix_web::test]
async fn support_staff_see_any_order() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("staff-1", vec![Role::User, Role::ReadAll]);
    let (status, body) =
        get_request(&token, &format!("/orders/{PAID_ORDER_ID}"), configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ORDER_1_JSON);
}

#[actix_web::test]
async fn unmatched_report_needs_the_read_all_role() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("cust-1", vec![Role::User, Role::Write]);
    let err = get_request(&token, "/unmatched", configure).await.expect_err("Expected error");
    assert_eq!(err, "Insufficient Permissions. This route requires [read_all]");
}

#[actix_web::test]
async fn unmatched_report_lists_orphaned_payments() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("staff-1", vec![Role::ReadAll]);
    let (status, body) = get_request(&token, "/unmatched", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, UNMATCHED_JSON);
}

#[actix_web::test]
async fn book_an_order() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("cust-1", vec![Role::User, Role::Write]);
    let (status, body) =
        post_request(&token, "/orders", booking_payload(), configure_booking).await.expect("Request failed");
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, ORDER_2_JSON);
}

#[actix_web::test]
async fn booking_needs_the_write_role() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("cust-1", vec![Role::User]);
    let err = post_request(&token, "/orders", booking_payload(), configure_booking).await.expect_err("Expected error");
    assert_eq!(err, "Insufficient Permissions. This route requires [write]");
}

#[actix_web::test]
async fn rebooking_the_same_order_id_is_idempotent() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("cust-1", vec![Role::Write]);
    let (status, body) =
        post_request(&token, "/orders", booking_payload(), configure_rebooking).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ORDER_2_JSON);
}

#[actix_web::test]
async fn bookings_are_validated_before_storage() {
    let _ = env_logger::try_init().ok();
    let token = valid_token("cust-1", vec![Role::Write]);
    let mut payload = booking_payload();
    payload["items"] = json!([]);
    // configure_empty_store sets no expectations, so any storage call would fail the test.
    let (status, body) =
        post_request(&token, "/orders", payload, configure_empty_store).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"The order could not be accepted. Order must contain at least one item"}"#);
}

fn valid_token(sub: &str, roles: Vec<Role>) -> String {
    issue_token(JwtClaims::new(sub, "deji@example.com", roles))
}

fn configure(cfg: &mut ServiceConfig) {
    let mut store = MockOrderStore::new();
    store.expect_fetch_orders_for_customer().returning(|_| Ok(orders_response()));
    store.expect_search_orders().returning(|_| Ok(orders_response()));
    store.expect_fetch_order_by_order_id().returning(|id| Ok(orders_response().into_iter().find(|o| &o.order_id == id)));
    store.expect_fetch_unmatched_events().returning(|| Ok(vec![unmatched_event()]));
    let query_api = OrderQueryApi::new(store);
    cfg.service(MyOrdersRoute::<MockOrderStore>::new())
        // Search registers first, exactly as in the server, or `{order_id}` swallows it.
        .service(OrderSearchRoute::<MockOrderStore>::new())
        .service(OrderByIdRoute::<MockOrderStore>::new())
        .service(UnmatchedPaymentsRoute::<MockOrderStore>::new())
        .app_data(web::Data::new(query_api));
}

fn configure_booking(cfg: &mut ServiceConfig) {
    let mut store = MockReconciliationStore::new();
    store.expect_insert_order().returning(|_| Ok(InsertOrderResult::Inserted(orders_response().remove(1))));
    register_booking(cfg, store);
}

fn configure_rebooking(cfg: &mut ServiceConfig) {
    let mut store = MockReconciliationStore::new();
    store.expect_insert_order().returning(|_| Ok(InsertOrderResult::AlreadyExists(orders_response().remove(1))));
    register_booking(cfg, store);
}

fn configure_empty_store(cfg: &mut ServiceConfig) {
    register_booking(cfg, MockReconciliationStore::new());
}

fn register_booking(cfg: &mut ServiceConfig, store: MockReconciliationStore) {
    let api = ReconciliationApi::new(store, OrderIdStrategy::Reference, EventProducers::default());
    cfg.service(NewOrderRoute::<MockReconciliationStore>::new()).app_data(web::Data::new(api));
}

fn booking_payload() -> serde_json::Value {
    json!({
        "orderId": PENDING_ORDER_ID,
        "pickupAddress": "3 Marina Road, Lagos Island",
        "dropoffAddress": "12 Allen Avenue, Ikeja",
        "pickupDate": "2024-03-15T09:00:00Z",
        "dropoffDate": "2024-03-16T17:00:00Z",
        "items": [{"type": "bedsheet", "quantity": 2, "pricePerUnit": 2500}],
        "totalAmount": 5000
    })
}

// Mock response to `fetch_orders_for_customer` and friends
fn orders_response() -> Vec<Order> {
    vec![
        Order {
            id: 1,
            order_id: OrderId(PAID_ORDER_ID.into()),
            customer_id: "cust-1".to_string(),
            customer_email: "deji@example.com".to_string(),
            pickup_address: "12 Allen Avenue, Ikeja".to_string(),
            dropoff_address: "12 Allen Avenue, Ikeja".to_string(),
            pickup_date: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            dropoff_date: Utc.with_ymd_and_hms(2024, 3, 3, 17, 0, 0).unwrap(),
            items: Json(vec![LaundryItem::new(LaundryItemKind::Shirt, 3, Naira::from(1500))]),
            total_amount: Naira::from(4500),
            payment_reference: Some(PAID_ORDER_ID.to_string()),
            metadata: None,
            status: OrderStatusType::Paid,
            created_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 45, 0).unwrap(),
        },
        Order {
            id: 2,
            order_id: OrderId(PENDING_ORDER_ID.into()),
            customer_id: "cust-1".to_string(),
            customer_email: "deji@example.com".to_string(),
            pickup_address: "3 Marina Road, Lagos Island".to_string(),
            dropoff_address: "12 Allen Avenue, Ikeja".to_string(),
            pickup_date: Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap(),
            dropoff_date: Utc.with_ymd_and_hms(2024, 3, 16, 17, 0, 0).unwrap(),
            items: Json(vec![LaundryItem::new(LaundryItemKind::Bedsheet, 2, Naira::from(2500))]),
            total_amount: Naira::from(5000),
            payment_reference: None,
            metadata: None,
            status: OrderStatusType::Pending,
            created_at: Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap(),
        },
    ]
}

fn unmatched_event() -> PaymentEventRecord {
    PaymentEventRecord {
        id: 7,
        reference: "ref-lost-1".to_string(),
        kind: "charge.success".to_string(),
        source: "webhook".to_string(),
        amount_minor: 250_000,
        customer_email: Some("uche@example.com".to_string()),
        metadata: None,
        order_id: None,
        created_at: Utc.with_ymd_and_hms(2024, 3, 20, 10, 15, 0).unwrap(),
    }
}

const ORDER_1_JSON: &str = r#"{"id":1,"orderId":"8ab6d0dc-0446-4f22-b8d9-6e312d38fe1b","customerId":"cust-1","customerEmail":"deji@example.com","pickupAddress":"12 Allen Avenue, Ikeja","dropoffAddress":"12 Allen Avenue, Ikeja","pickupDate":"2024-03-01T09:00:00Z","dropoffDate":"2024-03-03T17:00:00Z","items":[{"type":"shirt","quantity":3,"pricePerUnit":1500}],"totalAmount":4500,"paymentReference":"8ab6d0dc-0446-4f22-b8d9-6e312d38fe1b","metadata":null,"status":"PAID","createdAt":"2024-02-29T13:30:00Z","updatedAt":"2024-02-29T13:45:00Z"}"#;

const ORDER_2_JSON: &str = r#"{"id":2,"orderId":"4823a98d-3c2a-4268-96a4-df0717c71e1c","customerId":"cust-1","customerEmail":"deji@example.com","pickupAddress":"3 Marina Road, Lagos Island","dropoffAddress":"12 Allen Avenue, Ikeja","pickupDate":"2024-03-15T09:00:00Z","dropoffDate":"2024-03-16T17:00:00Z","items":[{"type":"bedsheet","quantity":2,"pricePerUnit":2500}],"totalAmount":5000,"paymentReference":null,"metadata":null,"status":"PENDING","createdAt":"2024-03-15T08:00:00Z","updatedAt":"2024-03-15T08:00:00Z"}"#;

const ORDERS_JSON: &str = r#"{"customerId":"cust-1","totalOrders":2,"totalAmount":9500,"orders":[{"id":1,"orderId":"8ab6d0dc-0446-4f22-b8d9-6e312d38fe1b","customerId":"cust-1","customerEmail":"deji@example.com","pickupAddress":"12 Allen Avenue, Ikeja","dropoffAddress":"12 Allen Avenue, Ikeja","pickupDate":"2024-03-01T09:00:00Z","dropoffDate":"2024-03-03T17:00:00Z","items":[{"type":"shirt","quantity":3,"pricePerUnit":1500}],"totalAmount":4500,"paymentReference":"8ab6d0dc-0446-4f22-b8d9-6e312d38fe1b","metadata":null,"status":"PAID","createdAt":"2024-02-29T13:30:00Z","updatedAt":"2024-02-29T13:45:00Z"},{"id":2,"orderId":"4823a98d-3c2a-4268-96a4-df0717c71e1c","customerId":"cust-1","customerEmail":"deji@example.com","pickupAddress":"3 Marina Road, Lagos Island","dropoffAddress":"12 Allen Avenue, Ikeja","pickupDate":"2024-03-15T09:00:00Z","dropoffDate":"2024-03-16T17:00:00Z","items":[{"type":"bedsheet","quantity":2,"pricePerUnit":2500}],"totalAmount":5000,"paymentReference":null,"metadata":null,"status":"PENDING","createdAt":"2024-03-15T08:00:00Z","updatedAt":"2024-03-15T08:00:00Z"}]}"#;

const UNMATCHED_JSON: &str = r#"{"total":1,"events":[{"id":7,"reference":"ref-lost-1","kind":"charge.success","source":"webhook","amountMinor":250000,"customerEmail":"uche@example.com","metadata":null,"orderId":null,"createdAt":"2024-03-20T10:15:00Z"}]}"#;
