//! Request handler definitions.
//!
//! Each route is declared with the `route!` macro right above its handler. The macro exists
//! because actix cannot register generic handlers directly, and every handler here is generic
//! over the storage backend so that the endpoint tests can run against mocks.
//!
//! Handlers must stay async and non-blocking. Anything that waits (database, gateway) is awaited,
//! never blocked on, or the worker thread stops serving requests.

use actix_web::{get, http::StatusCode, web, HttpResponse, Responder};
use laundry_payment_engine::{
    db_types::{OrderId, OrderIdStrategy, Role},
    helpers::resolve_order_id,
    order_objects::OrderQueryFilter,
    traits::{OrderManagement, ReconciliationDatabase},
    OrderQueryApi,
    ReconciliationApi,
};
use log::*;
use paystack_tools::{NewTransaction, PaystackApi};
use serde_json::json;

use crate::{
    auth::JwtClaims,
    data_objects::{
        InitializePaymentResponse,
        NewOrderRequest,
        OrderSearchQuery,
        UnmatchedEventList,
        VerifyPaymentResponse,
        VerifyQuery,
    },
    errors::ServerError,
    integrations::paystack::payment_event_from_verification,
};

// Actix cannot handle generics in handlers, so registration is implemented manually using the
// `route!` macro.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:ty),+])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  -----------------------------------------------------------

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ----------------------------------------------   Orders  -----------------------------------------------------------

route!(my_orders => Get "/orders" impl OrderManagement);
/// Authenticated customers fetch their own order history here, newest first. The customer id is
/// taken from the access token, never from the request, so there is nothing to get wrong.
pub async fn my_orders<B: OrderManagement>(
    claims: JwtClaims,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_orders for {}", claims.sub);
    let orders = api.customer_orders(&claims.sub).await.map_err(|e| {
        debug!("💻️ Could not fetch orders. {e}");
        ServerError::BackendError(e.to_string())
    })?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(new_order => Post "/orders" impl ReconciliationDatabase where requires [Role::Write]);
/// Books a new order. Orders are always created `Pending`; payment happens separately, either
/// via `/payments/initialize` or out-of-band. Replaying a booking with the same order id returns
/// the stored order with a 200 instead of a 201.
pub async fn new_order<A: ReconciliationDatabase>(
    claims: JwtClaims,
    body: web::Json<NewOrderRequest>,
    api: web::Data<ReconciliationApi<A>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST new_order for {}", claims.sub);
    let order = body.into_inner().into_new_order(&claims.sub, &claims.email);
    let result = api.process_new_order(order).await?;
    let status = if result.is_new() { StatusCode::CREATED } else { StatusCode::OK };
    Ok(HttpResponse::build(status).json(result.order()))
}

route!(order_search => Get "/orders/search" impl OrderManagement where requires [Role::ReadAll]);
/// Support staff search across all customers' orders. Must be registered before
/// `/orders/{order_id}` or that route swallows the path.
pub async fn order_search<A: OrderManagement>(
    query: web::Query<OrderSearchQuery>,
    api: web::Data<OrderQueryApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let filter = OrderQueryFilter::from(query.into_inner());
    debug!("💻️ GET order_search");
    let orders = api.search_orders(filter).await.map_err(|e| {
        debug!("💻️ Could not search orders. {e}");
        ServerError::BackendError(e.to_string())
    })?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{order_id}" impl OrderManagement where requires [Role::User]);
/// Fetch a single order. Customers only ever learn about their own orders; one that exists but
/// belongs to someone else looks exactly like one that does not exist. `ReadAll` sees everything.
pub async fn order_by_id<A: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    api: web::Data<OrderQueryApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET order_by_id({order_id})");
    let order = api.fetch_order(&order_id).await.map_err(|e| {
        debug!("💻️ Could not fetch order. {e}");
        ServerError::BackendError(e.to_string())
    })?;
    let visible = order.filter(|o| o.customer_id == claims.sub || claims.has_role(&Role::ReadAll));
    match visible {
        Some(order) => Ok(HttpResponse::Ok().json(order)),
        None => Err(ServerError::NoRecordFound(format!("Order {order_id}"))),
    }
}

route!(unmatched_payments => Get "/unmatched" impl OrderManagement where requires [Role::ReadAll]);
/// Payment signals that never matched an order. This is the first place to look when a customer
/// says they paid and their order still shows pending.
pub async fn unmatched_payments<A: OrderManagement>(
    api: web::Data<OrderQueryApi<A>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET unmatched_payments");
    let events = api.unmatched_events().await.map_err(|e| {
        debug!("💻️ Could not fetch unmatched payment events. {e}");
        ServerError::BackendError(e.to_string())
    })?;
    Ok(HttpResponse::Ok().json(UnmatchedEventList::from(events)))
}

// ----------------------------------------------  Payments  ----------------------------------------------------------

route!(initialize_payment => Post "/payments/initialize" impl ReconciliationDatabase where requires [Role::Write]);
/// Books the order and opens a hosted checkout session in one call.
///
/// Under the reference-as-id strategy the session is initialized with the order's own id as the
/// gateway reference, which is what lets reconciliation later match the confirmation without any
/// metadata digging. The metadata carries the order and user ids regardless, so the alternative
/// strategy and human operators both have something to work with.
pub async fn initialize_payment<A: ReconciliationDatabase>(
    claims: JwtClaims,
    body: web::Json<NewOrderRequest>,
    api: web::Data<ReconciliationApi<A>>,
    paystack: web::Data<PaystackApi>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST initialize_payment for {}", claims.sub);
    let new_order = body.into_inner().into_new_order(&claims.sub, &claims.email);
    let result = api.process_new_order(new_order).await?;
    let order = result.order().clone();
    if !order.is_pending() {
        return Err(ServerError::InvalidOrder(format!("Order {} is already {}", order.order_id, order.status)));
    }
    let mut tx = NewTransaction::new(order.customer_email.as_str(), order.total_amount)
        .with_metadata(json!({ "order_id": order.order_id, "user_id": order.customer_id }));
    if api.id_strategy() == OrderIdStrategy::Reference {
        tx = tx.with_reference(order.order_id.as_str());
    }
    let session = paystack.initialize_transaction(tx).await?;
    info!("💻️💰️ Checkout session opened for order {} under reference {}", order.order_id, session.reference);
    let response = InitializePaymentResponse {
        authorization_url: session.authorization_url,
        reference: session.reference,
        order_id: order.order_id,
    };
    Ok(HttpResponse::Ok().json(response))
}

route!(verify_payment => Get "/api/payments/verify" impl ReconciliationDatabase);
/// Public fallback for when the webhook never arrives: queries the gateway for the state of a
/// reference and reports it in major units.
///
/// When the gateway reports success, the result is fed straight into reconciliation rather than
/// waiting for a webhook that may never come. Reconciliation is idempotent, so this is safe to
/// call any number of times, concurrently with webhook deliveries.
pub async fn verify_payment<A: ReconciliationDatabase>(
    query: web::Query<VerifyQuery>,
    api: web::Data<ReconciliationApi<A>>,
    paystack: web::Data<PaystackApi>,
) -> Result<HttpResponse, ServerError> {
    let Some(reference) = query.into_inner().reference.filter(|r| !r.trim().is_empty()) else {
        return Err(ServerError::InvalidRequestPath("The 'reference' query parameter is required".to_string()));
    };
    debug!("💻️ GET verify_payment for reference {reference}");
    let tx = paystack.verify_transaction(&reference).await?;
    let event = payment_event_from_verification(&tx);
    let order_id = if tx.status.is_success() {
        let outcome = api.reconcile(event).await?;
        outcome.order().map(|o| o.order_id.clone())
    } else {
        resolve_order_id(&event, api.id_strategy())
    };
    Ok(HttpResponse::Ok().json(VerifyPaymentResponse::new(&tx, order_id)))
}
