use std::rc::Rc;

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use log::*;
use lps_common::Secret;
use paystack_tools::verify_signature;

use crate::errors::{AuthError, ServerError};

pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Checks the gateway's HMAC-SHA512 signature over the raw request body before the payload ever
/// reaches a webhook handler. Deliveries with a missing or mismatched signature are rejected with
/// a 401 and the handler never runs, so handlers may treat their payloads as authenticated.
pub struct HmacMiddlewareFactory {
    secret: Secret<String>,
}

impl HmacMiddlewareFactory {
    /// The signing secret is the gateway account's secret key.
    pub fn new(secret: Secret<String>) -> Self {
        Self { secret }
    }
}

impl<S, B> Transform<S, ServiceRequest> for HmacMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = HmacMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(HmacMiddlewareService { service: Rc::new(service), secret: self.secret.clone() })
    }
}

pub struct HmacMiddlewareService<S> {
    service: Rc<S>,
    secret: Secret<String>,
}

impl<S, B> Service<ServiceRequest> for HmacMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.secret.clone();
        Box::pin(async move {
            let signature = req.headers().get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()).map(str::to_string);
            let body = req.extract::<web::Bytes>().await?;
            // The comparison is constant-time, and neither digest is ever logged.
            let valid = signature.as_deref().map(|sig| verify_signature(secret.reveal(), &body, sig)).unwrap_or(false);
            if !valid {
                debug!("🔐️ Rejecting webhook delivery. The signature header is missing or does not match the body.");
                return Err(ServerError::from(AuthError::InvalidSignature).into());
            }
            trace!("🔐️ Webhook signature verified.");
            // The body was consumed to compute the digest, so hand the handler a fresh payload.
            req.set_payload(bytes_to_payload(body));
            service.call(req).await
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
