//! The gateway-facing webhook endpoint.
//!
//! Everything under the `/paystack` scope sits behind the HMAC signature middleware (and the IP
//! whitelist when one is configured), so by the time a handler here runs the body is
//! authenticated. What the handlers must guarantee in return is a 2xx acknowledgement for every
//! classified delivery, because the gateway retries on any non-2xx and a retry storm helps
//! nobody. The one exception is a storage failure, where a 500 is exactly right: the gateway
//! redelivers later and the ledger's dedupe absorbs the replay.

use actix_web::{web, HttpRequest, HttpResponse};
use bytes::Bytes;
use laundry_payment_engine::{
    traits::{ReconcileResult, ReconciliationDatabase},
    ReconciliationApi,
};
use log::*;
use paystack_tools::PaystackEvent;

use crate::{data_objects::WebhookAck, errors::ServerError, integrations::paystack::payment_event_from_charge, route};

route!(paystack_webhook => Post "/webhook" impl ReconciliationDatabase);
pub async fn paystack_webhook<B: ReconciliationDatabase>(
    req: HttpRequest,
    body: Bytes,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("🧺️ Received webhook delivery: {}", req.uri());
    match serde_json::from_slice::<PaystackEvent>(&body) {
        Err(e) => {
            // A signed body that does not parse is an anomaly worth a human's attention, but
            // bouncing it would only make the gateway resend the same bytes.
            warn!("🧺️ Acknowledging a webhook body that does not parse as an event envelope. {e}");
        },
        Ok(event) if !event.is_charge_success() => {
            debug!("🧺️ Ignoring a '{}' event. Only charge.success drives reconciliation", event.event);
        },
        Ok(event) => match event.charge_data() {
            Err(e) => {
                warn!("🧺️ A charge.success event arrived without a usable charge payload. {e}");
            },
            Ok(data) => {
                let payment = payment_event_from_charge(&data);
                let result = api.reconcile(payment).await.map_err(|e| {
                    warn!("🧺️ Could not reconcile the delivery for reference {}. The gateway will retry. {e}", data.reference);
                    ServerError::BackendError(e.to_string())
                })?;
                match result {
                    ReconcileResult::Applied(order) => {
                        info!("🧺️ Order {} was settled by the webhook delivery for reference {}", order.order_id, data.reference);
                    },
                    ReconcileResult::AlreadyReconciled(order) => {
                        debug!("🧺️ Duplicate delivery for reference {}. Order {} was already settled", data.reference, order.order_id);
                    },
                    ReconcileResult::OrderNotFound(reference) => {
                        warn!("🧺️ The delivery for reference {reference} matches no order. It is recorded as unmatched");
                    },
                }
            },
        },
    }
    Ok(HttpResponse::Ok().json(WebhookAck::ok()))
}
