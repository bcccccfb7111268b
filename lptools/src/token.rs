use chrono::{DateTime, Duration, Utc};
use laundry_payment_server::{
    auth::{JwtClaims, TokenIssuer},
    config::AuthConfig,
};
use lps_common::Secret;

use crate::TokenParams;

/// Mints an access token with the server's signing secret. There is no login endpoint; this is
/// how tokens come into existence.
pub fn print_access_token(params: TokenParams) {
    let Some(secret) = params.secret.or_else(|| std::env::var("LPS_JWT_SECRET").ok()) else {
        println!("No signing secret. Pass --secret or set LPS_JWT_SECRET");
        return;
    };
    if secret.len() < 32 {
        println!("The signing secret must be at least 32 characters long. The server will not accept shorter ones.");
        return;
    }
    let issuer = TokenIssuer::new(&AuthConfig { jwt_secret: Secret::new(secret) });
    let claims =
        JwtClaims::with_validity(&params.customer_id, &params.email, params.roles, Duration::hours(params.expiry));
    let expires = DateTime::<Utc>::from_timestamp(claims.exp, 0).map(|t| t.to_string()).unwrap_or_default();
    match issuer.issue_token(&claims) {
        Ok(token) => {
            println!("----------------------------- Access Token -----------------------------");
            println!("customer id: {}", claims.sub);
            println!("email: {}", claims.email);
            println!("roles: {}", claims.roles.iter().map(|r| r.to_string()).collect::<Vec<String>>().join(","));
            println!("expires: {expires}");
            println!("token:\n{token}");
            println!("------------------------------------------------------------------------");
        },
        Err(e) => eprintln!("Could not issue the token. {e}"),
    }
}
