//! Server assembly.
//!
//! [`run_server`] owns the process-level wiring: the database pool, the reconciliation event
//! channels, the optional settlement sweep, and the actix server itself.
//! [`create_server_instance`] builds the actix [`Server`] without starting it, so callers can
//! decide when (and on which runtime) to await it.
//!
//! Route layout notes, since ordering matters in actix:
//! * `/api/payments/verify` is registered as a bare resource ahead of the `/api` scope. It is the
//!   one `/api` endpoint a customer hits from a redirect page without a token, so it must not be
//!   caught by the JWT middleware that wraps the rest of the scope.
//! * The webhook lives in its own `/paystack` scope behind the IP whitelist (outermost) and the
//!   signature check, so an unsigned request never reaches a handler.

use std::time::Duration;

use actix_web::{
    dev::{Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpResponse,
    HttpServer,
};
use futures::{future::ok, FutureExt};
use laundry_payment_engine::{
    events::{EventHandlers, EventProducers},
    OrderQueryApi,
    ReconciliationApi,
    SqliteDatabase,
};
use log::*;
use paystack_tools::PaystackApi;

use crate::{
    auth::TokenIssuer,
    config::ServerConfig,
    data_objects::JsonResponse,
    errors::{AuthError, ServerError},
    helpers::get_remote_ip,
    integrations::paystack::build_event_hooks,
    middleware::{HmacMiddlewareFactory, JwtMiddlewareFactory},
    paystack_routes::PaystackWebhookRoute,
    routes::{
        health,
        InitializePaymentRoute,
        MyOrdersRoute,
        NewOrderRoute,
        OrderByIdRoute,
        OrderSearchRoute,
        UnmatchedPaymentsRoute,
        VerifyPaymentRoute,
    },
    settlement_worker::start_settlement_worker,
};

/// Capacity of each reconciliation event channel. The hooks are cheap, so the buffer only fills
/// if a handler stalls outright.
const EVENT_BUFFER_SIZE: usize = 50;

/// Connects to the database, starts the event handlers and the settlement worker, and runs the
/// server until it is shut down.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(format!("Could not connect to the database. {e}")))?;
    debug!("🚀️ Connected to database {}", config.database_url);
    let paystack = PaystackApi::new(config.paystack.clone())
        .map_err(|e| ServerError::InitializeError(format!("Could not build the Paystack client. {e}")))?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, build_event_hooks());
    let producers = handlers.producers();
    // The join handles are dropped on purpose. The handlers run for the life of the process and
    // their channels close when the last producer is dropped.
    let _handles = handlers.start_handlers();
    if config.settlement.enabled {
        start_settlement_worker(
            db.clone(),
            producers.clone(),
            paystack.clone(),
            config.order_id_strategy,
            config.settlement,
        );
    } else {
        info!("🚀️ The settlement worker is disabled. Stale pending orders will not be swept.");
    }
    let srv = create_server_instance(config, db, producers, paystack)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Builds the actix server instance. Each worker gets its own API handles; they all share the
/// connection pool and the event channels.
pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
    paystack: PaystackApi,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let reconciliation_api =
            ReconciliationApi::new(db.clone(), config.order_id_strategy, producers.clone());
        let query_api = OrderQueryApi::new(db.clone());
        let issuer = TokenIssuer::new(&config.auth);
        let use_x_forwarded_for = config.use_x_forwarded_for;
        let use_forwarded = config.use_forwarded;
        let whitelist = config.paystack_whitelist.clone();
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("lps::access_log"))
            .app_data(web::Data::new(reconciliation_api))
            .app_data(web::Data::new(query_api))
            .app_data(web::Data::new(paystack.clone()));
        let api_scope = web::scope("/api")
            .wrap(JwtMiddlewareFactory::new(issuer))
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(NewOrderRoute::<SqliteDatabase>::new())
            // The search route must be registered before the `{order_id}` catch-all.
            .service(OrderSearchRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(UnmatchedPaymentsRoute::<SqliteDatabase>::new())
            .service(InitializePaymentRoute::<SqliteDatabase>::new());
        let webhook_scope = web::scope("/paystack")
            .wrap(HmacMiddlewareFactory::new(config.paystack.secret_key.clone()))
            .wrap_fn(move |req, srv| {
                let remote_ip = get_remote_ip(req.request(), use_x_forwarded_for, use_forwarded);
                let allow = match (&whitelist, remote_ip) {
                    (None, _) => true,
                    (Some(ips), Some(ip)) => {
                        let hit = ips.contains(&ip);
                        if !hit {
                            warn!("🚪️ Rejecting a webhook delivery from {ip}. It is not in the IP whitelist.");
                        }
                        hit
                    },
                    (Some(_), None) => {
                        warn!(
                            "🚪️ Rejecting a webhook delivery. A whitelist is configured but the remote address \
                             could not be determined."
                        );
                        false
                    },
                };
                if allow {
                    srv.call(req).boxed_local()
                } else {
                    ok(req.error_response(ServerError::AuthenticationError(AuthError::ForbiddenPeer))).boxed_local()
                }
            })
            .service(PaystackWebhookRoute::<SqliteDatabase>::new());
        app.service(health)
            .service(VerifyPaymentRoute::<SqliteDatabase>::new())
            .service(api_scope)
            .service(webhook_scope)
            .default_service(web::route().to(not_found))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(JsonResponse::failure("That endpoint does not exist"))
}
