use std::rc::Rc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use laundry_payment_engine::db_types::Role;
use log::*;

use crate::{auth::JwtClaims, errors::ServerError};

/// Per-route access control. The route is only reachable if the claims stored by the JWT
/// middleware carry every role in `required_roles`, so it must sit inside a scope wrapped with
/// [`crate::middleware::JwtMiddlewareFactory`].
pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        Self { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { service: Rc::new(service), required_roles: self.required_roles.clone() })
    }
}

pub struct AclMiddlewareService<S> {
    service: Rc<S>,
    required_roles: Vec<Role>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
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
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let claims = req.extensions().get::<JwtClaims>().cloned();
            match claims {
                Some(claims) => {
                    let authorized = required_roles.iter().all(|role| claims.roles.contains(role));
                    if authorized {
                        trace!("🔑️ {} holds the required roles for {}", claims.sub, req.path());
                        service.call(req).await
                    } else {
                        debug!("🔑️ {} lacks the roles required for {}", claims.sub, req.path());
                        let roles = required_roles.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ");
                        Err(ServerError::InsufficientPermissions(format!("This route requires [{roles}]")).into())
                    }
                },
                None => {
                    debug!("🔑️ No claims are attached to the request. Is the route behind the JWT middleware?");
                    Err(ServerError::CouldNotDeserializeAccessToken.into())
                },
            }
        })
    }
}
