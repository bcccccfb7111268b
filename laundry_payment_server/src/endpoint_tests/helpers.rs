use actix_web::{
    body::MessageBody,
    http::{header::AUTHORIZATION, StatusCode},
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use log::debug;
use lps_common::Secret;

use crate::{
    auth::{JwtClaims, TokenIssuer},
    config::AuthConfig,
    middleware::JwtMiddlewareFactory,
};

// Creates a test `AuthConfig` for issuing tokens. DO NOT re-use this secret anywhere.
pub fn get_auth_config() -> AuthConfig {
    AuthConfig { jwt_secret: Secret::new("endpoint-test-secret-0123456789abcdef0123456789".to_string()) }
}

pub fn issue_token(claims: JwtClaims) -> String {
    let issuer = TokenIssuer::new(&get_auth_config());
    issuer.issue_token(&claims).expect("Failed to sign token")
}

pub async fn get_request(
    auth_header: &str,
    path: &str,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let req = TestRequest::get().uri(path);
    send_request(req, auth_header, configure).await
}

pub async fn post_request(
    auth_header: &str,
    path: &str,
    body: serde_json::Value,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let req = TestRequest::post().uri(path).set_json(body);
    send_request(req, auth_header, configure).await
}

// Requests go through the same JWT middleware the `/api` scope wears in production; a rejection
// there surfaces as the `Err` arm, a handler response as `Ok((status, body))`.
async fn send_request(
    mut req: TestRequest,
    auth_header: &str,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    if !auth_header.is_empty() {
        req = req.insert_header((AUTHORIZATION, format!("Bearer {auth_header}")));
    }
    let req = req.to_request();
    let issuer = TokenIssuer::new(&get_auth_config());
    let app = App::new().wrap(JwtMiddlewareFactory::new(issuer)).configure(configure);

    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::try_call_service(&service, req).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}
