use std::rc::Rc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
    HttpMessage,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use log::*;

use crate::{
    auth::TokenIssuer,
    errors::{AuthError, ServerError},
};

/// Validates the `Authorization: Bearer` header on every request passing through it and stores
/// the verified [`crate::auth::JwtClaims`] in the request extensions for handlers and the ACL
/// middleware to pick up. Wrapped around the whole `/api` scope.
pub struct JwtMiddlewareFactory {
    issuer: TokenIssuer,
}

impl JwtMiddlewareFactory {
    pub fn new(issuer: TokenIssuer) -> Self {
        Self { issuer }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = JwtMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(JwtMiddlewareService { service: Rc::new(service), issuer: self.issuer.clone() })
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    issuer: TokenIssuer,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let issuer = self.issuer.clone();
        Box::pin(async move {
            let header = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_string);
            let token = match header {
                Some(h) => match h.strip_prefix("Bearer ") {
                    Some(t) => t.trim().to_string(),
                    None => {
                        debug!("🔒️ The Authorization header is not a bearer token.");
                        let err = AuthError::PoorlyFormattedToken("Expected a bearer token".to_string());
                        return Err(ServerError::from(err).into());
                    },
                },
                None => {
                    debug!("🔒️ No access token was provided.");
                    return Err(ServerError::CouldNotDeserializeAccessToken.into());
                },
            };
            match issuer.validate_token(&token) {
                Ok(claims) => {
                    let roles = claims.roles.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ");
                    trace!("🔒️ Verified access token for {} with roles [{roles}]", claims.sub);
                    req.extensions_mut().insert(claims);
                    service.call(req).await
                },
                Err(e) => {
                    debug!("🔒️ Token validation failed. {e}");
                    Err(ServerError::from(e).into())
                },
            }
        })
    }
}
