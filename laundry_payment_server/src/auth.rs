//! Access token handling.
//!
//! The server does not have a login endpoint. Tokens are minted out-of-band (with `lptools token`
//! or by the operator's provisioning scripts) and presented as `Authorization: Bearer <token>`
//! headers. [`crate::middleware::JwtMiddlewareService`] validates the signature and expiry on
//! every `/api` request and stores the [`JwtClaims`] in the request extensions, from where
//! handlers extract them via the [`FromRequest`] impl below.

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use laundry_payment_engine::db_types::Role;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

/// Tokens issued without an explicit validity period expire after this many hours.
pub const DEFAULT_TOKEN_VALIDITY_HOURS: i64 = 24;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The customer id the token acts for. Orders booked with this token belong to this id.
    pub sub: String,
    pub email: String,
    pub roles: Vec<Role>,
    /// Expiry, as seconds since the epoch.
    pub exp: i64,
    /// Issued-at, as seconds since the epoch.
    pub iat: i64,
}

impl JwtClaims {
    pub fn new(sub: &str, email: &str, roles: Vec<Role>) -> Self {
        Self::with_validity(sub, email, roles, Duration::hours(DEFAULT_TOKEN_VALIDITY_HOURS))
    }

    pub fn with_validity(sub: &str, email: &str, roles: Vec<Role>, validity: Duration) -> Self {
        let iat = Utc::now();
        let exp = iat + validity;
        Self { sub: sub.to_string(), email: email.to_string(), roles, exp: exp.timestamp(), iat: iat.timestamp() }
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }
}

/// Extracts the claims that [`crate::middleware::JwtMiddlewareService`] placed in the request
/// extensions. Fails with a 401 if the middleware never ran (i.e. the route is not behind it).
impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = futures::future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<JwtClaims>() {
            Some(claims) => futures::future::ok(claims.clone()),
            None => futures::future::err(ServerError::CouldNotDeserializeAccessToken),
        }
    }
}

/// Signs and validates access tokens with the server's HS256 secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.reveal().as_bytes();
        // Validation::new enables expiry checking (with the default 60s leeway) and requires the
        // exp claim to be present.
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn issue_token(&self, claims: &JwtClaims) -> Result<String, ServerError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| ServerError::Unspecified(format!("Could not issue access token. {e}")))
    }

    pub fn validate_token(&self, token: &str) -> Result<JwtClaims, AuthError> {
        decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::ValidationError(e.to_string()))
    }
}
