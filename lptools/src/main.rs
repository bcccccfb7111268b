use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use laundry_payment_engine::db_types::{OrderId, OrderStatusType, Role};
use url::Url;

mod client;
mod formatting;
mod orders;
mod payments;
mod profile_manager;
mod signing;
mod token;

use orders::list_orders;
use payments::{check_server_health, verify_reference, watch_reference};
use signing::print_webhook_signature;
use token::print_access_token;

use crate::profile_manager::Profile;

#[derive(Parser, Debug)]
#[command(version, about = "Operator tools for the laundry payment server")]
pub struct Arguments {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[clap(name = "token", about = "Issue an access token signed with the server's secret")]
    AccessToken(TokenParams),
    #[clap(name = "sign", about = "Compute the webhook signature header for a payload, for replaying deliveries")]
    Sign(SignParams),
    #[clap(name = "health", about = "Ping a payment server")]
    Health(ServerParams),
    #[clap(name = "verify", about = "Verify a payment reference through a payment server")]
    Verify(VerifyParams),
    #[clap(name = "watch", about = "Poll a reference until the charge confirms or the attempts run out")]
    Watch(WatchParams),
    #[clap(name = "orders", about = "List orders from a payment server")]
    Orders(OrdersParams),
}

#[derive(Debug, Args)]
pub struct TokenParams {
    /// The HS256 signing secret shared with the server. Falls back to the LPS_JWT_SECRET envar.
    #[arg(short = 's', long = "secret")]
    secret: Option<String>,
    /// The customer id the token acts for
    #[arg(short = 'c', long = "customer")]
    customer_id: String,
    /// The customer's email address
    #[arg(short = 'e', long = "email")]
    email: String,
    /// Roles the token grants (user, read_all, write). Repeat the flag to grant several.
    #[arg(short = 'r', long = "roles", default_value = "user")]
    roles: Vec<Role>,
    /// Token validity, in hours
    #[arg(short = 'x', long = "expiry", default_value = "24")]
    expiry: i64,
}

#[derive(Debug, Args)]
pub struct SignParams {
    /// The webhook signing secret. Falls back to the LPS_PAYSTACK_SECRET_KEY envar.
    #[arg(short = 's', long = "secret")]
    secret: Option<String>,
    /// Sign this literal string
    #[arg(short = 'p', long = "payload", conflicts_with = "file")]
    payload: Option<String>,
    /// Sign the contents of this file
    #[arg(short = 'f', long = "file")]
    file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ServerParams {
    /// Profile name from ~/.lptools/config.toml
    #[arg(short = 'p', long = "profile", default_value = "default")]
    profile: String,
    /// Server URL. Overrides the profile's
    #[arg(short = 's', long = "server")]
    server: Option<Url>,
    /// Bearer token. Overrides the profile's
    #[arg(short = 't', long = "token")]
    access_token: Option<String>,
}

impl ServerParams {
    /// Resolves the profile to talk to. Flags beat the config file, and `--server` alone is
    /// enough to work without a config file at all.
    pub fn resolve(&self) -> Result<Profile> {
        let mut profile = match (profile_manager::load_profile(&self.profile), &self.server) {
            (Ok(profile), _) => profile,
            (Err(_), Some(_)) => Profile { name: self.profile.clone(), ..Profile::default() },
            (Err(e), None) => return Err(e),
        };
        if let Some(server) = &self.server {
            profile.server = server.clone();
        }
        if let Some(token) = &self.access_token {
            profile.access_token = Some(token.clone());
        }
        Ok(profile)
    }
}

#[derive(Debug, Args)]
pub struct VerifyParams {
    #[command(flatten)]
    server: ServerParams,
    /// The payment reference to verify
    #[arg(required = true, index = 1)]
    reference: String,
}

#[derive(Debug, Args)]
pub struct WatchParams {
    #[command(flatten)]
    server: ServerParams,
    /// The payment reference to watch
    #[arg(required = true, index = 1)]
    reference: String,
    /// Number of verify attempts before giving up
    #[arg(short = 'a', long = "attempts", default_value = "5")]
    attempts: u32,
    /// Seconds between attempts
    #[arg(short = 'i', long = "interval", default_value = "3")]
    interval: u64,
}

#[derive(Debug, Args)]
pub struct OrdersParams {
    #[command(flatten)]
    server: ServerParams,
    /// Fetch a single order by its id
    #[arg(long = "id")]
    id: Option<OrderId>,
    /// Admin search: only orders for this customer id
    #[arg(short = 'c', long = "customer")]
    customer_id: Option<String>,
    /// Admin search: only orders in this status (pending, paid, failed)
    #[arg(long = "status")]
    status: Option<OrderStatusType>,
    /// Admin search: only orders settled by this payment reference
    #[arg(short = 'r', long = "reference")]
    reference: Option<String>,
}

impl OrdersParams {
    pub fn has_filters(&self) -> bool {
        self.customer_id.is_some() || self.status.is_some() || self.reference.is_some()
    }

    /// Query pairs for the admin search route. Statuses go over the wire in the API's
    /// SCREAMING_SNAKE form.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(customer_id) = &self.customer_id {
            query.push(("customerId", customer_id.clone()));
        }
        if let Some(status) = self.status {
            query.push(("status", status.to_string().to_uppercase()));
        }
        if let Some(reference) = &self.reference {
            query.push(("reference", reference.clone()));
        }
        query
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();
    let cli = Arguments::parse();
    match cli.command {
        Command::AccessToken(params) => print_access_token(params),
        Command::Sign(params) => print_webhook_signature(params),
        Command::Health(params) => check_server_health(params).await,
        Command::Verify(params) => verify_reference(params).await,
        Command::Watch(params) => watch_reference(params).await,
        Command::Orders(params) => list_orders(params).await,
    }
}
