use std::{env, io::Write, net::IpAddr};

use chrono::Duration;
use laundry_payment_engine::db_types::OrderIdStrategy;
use log::*;
use lps_common::{parse_boolean_flag, Secret};
use paystack_tools::PaystackConfig;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde_json::json;
use tempfile::NamedTempFile;

use crate::errors::ServerError;

const DEFAULT_LPS_HOST: &str = "127.0.0.1";
const DEFAULT_LPS_PORT: u16 = 4460;
/// How often the settlement worker sweeps for stale pending orders.
const DEFAULT_SETTLEMENT_INTERVAL_SECS: u64 = 300;
/// How long an order may sit in `Pending` before the sweep re-verifies it with the gateway.
const DEFAULT_SETTLEMENT_MAX_AGE_SECS: i64 = 900;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address,
    /// rather than the connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather
    /// than the connection's remote address.
    pub use_forwarded: bool,
    /// How payment signals are matched to orders. Must not change for the lifetime of a
    /// deployment; switching it strands any in-flight checkout sessions.
    pub order_id_strategy: OrderIdStrategy,
    /// Gateway REST credentials and endpoint. The secret key doubles as the webhook signing key.
    pub paystack: PaystackConfig,
    /// If supplied, requests against /paystack endpoints will be checked against a whitelist of
    /// gateway IP addresses. To explicitly disable the whitelist, set it to "false", "none",
    /// or "0".
    pub paystack_whitelist: Option<Vec<IpAddr>>,
    pub settlement: SettlementConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_LPS_HOST.to_string(),
            port: DEFAULT_LPS_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            order_id_strategy: OrderIdStrategy::default(),
            paystack: PaystackConfig::default(),
            paystack_whitelist: None,
            settlement: SettlementConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("LPS_HOST").ok().unwrap_or_else(|| DEFAULT_LPS_HOST.into());
        let port = env::var("LPS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for LPS_PORT. {e} Using the default, {DEFAULT_LPS_PORT}, instead."
                    );
                    DEFAULT_LPS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_LPS_PORT);
        let database_url = env::var("LPS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ LPS_DATABASE_URL is not set. Please set it to the URL for the orders database.");
            String::default()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let order_id_strategy = configure_order_id_strategy();
        let paystack = PaystackConfig::new_from_env_or_default();
        let paystack_whitelist = configure_paystack_whitelist();
        let use_x_forwarded_for = parse_boolean_flag(env::var("LPS_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("LPS_USE_FORWARDED").ok(), false);
        let settlement = SettlementConfig::from_env_or_default();
        Self {
            host,
            port,
            database_url,
            auth,
            use_x_forwarded_for,
            use_forwarded,
            order_id_strategy,
            paystack,
            paystack_whitelist,
            settlement,
        }
    }
}

fn configure_order_id_strategy() -> OrderIdStrategy {
    match env::var("LPS_ORDER_ID_STRATEGY") {
        Ok(s) => s.parse::<OrderIdStrategy>().unwrap_or_else(|e| {
            let default = OrderIdStrategy::default();
            error!("🪛️ {e}. Falling back to the '{default}' strategy.");
            default
        }),
        Err(_) => {
            let default = OrderIdStrategy::default();
            info!("🪛️ LPS_ORDER_ID_STRATEGY is not set. Using the '{default}' strategy.");
            default
        },
    }
}

fn configure_paystack_whitelist() -> Option<Vec<IpAddr>> {
    let whitelist = env::var("LPS_PAYSTACK_IP_WHITELIST").ok().and_then(|s| {
        if ["none", "false", "0"].contains(&s.to_lowercase().as_str()) {
            info!(
                "🪛️ The gateway IP whitelist is disabled. If this is not what you want, set \
                 LPS_PAYSTACK_IP_WHITELIST to a comma-separated list of IP addresses to enable it."
            );
            return None;
        }
        let ip_addrs = s
            .split(',')
            .filter_map(|s| {
                let s = s.trim();
                s.parse()
                    .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({s}) in LPS_PAYSTACK_IP_WHITELIST: {e}"))
                    .ok()
            })
            .collect::<Vec<IpAddr>>();
        Some(ip_addrs)
    });
    match &whitelist {
        Some(whitelist) if whitelist.is_empty() => {
            warn!(
                "🚨️ The gateway IP whitelist was configured, but is empty. The server will run, but won't authorise \
                 any incoming webhook requests."
            );
        },
        None => {
            info!("🪛️ No gateway IP whitelist is set. Only signature validation will be used.");
        },
        Some(v) => {
            let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
            info!("🪛️ Gateway IP whitelist: {addrs}");
        },
    }
    whitelist
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------

#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 secret used to sign and verify access tokens.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut tmpfile = NamedTempFile::new().ok().and_then(|f| f.keep().ok());
        warn!(
            "🚨️🚨️🚨️ The JWT signing secret has not been set. I'm using a random value for this session. DO NOT \
             operate on production like this since every issued token dies with the process. 🚨️🚨️🚨️"
        );
        let secret: String = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect();
        match &mut tmpfile {
            Some((f, p)) => {
                let key_data = json!({ "jwt_secret": secret }).to_string();
                match writeln!(f, "{key_data}") {
                    Ok(()) => warn!(
                        "🚨️🚨️🚨️ The JWT secret for this session was written to {}. If this is a production \
                         instance, you are doing it wrong! Set the LPS_JWT_SECRET environment variable instead. \
                         🚨️🚨️🚨️",
                        p.to_str().unwrap_or("???")
                    ),
                    Err(e) => warn!("🪛️ Could not write the JWT secret to the temporary file. {e}"),
                }
            },
            None => {
                warn!("🪛️ Could not create a temporary file to store the JWT secret.");
            },
        }
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("LPS_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [LPS_JWT_SECRET]")))?;
        if secret.len() < 32 {
            return Err(ServerError::ConfigurationError(
                "LPS_JWT_SECRET must be at least 32 characters long.".to_string(),
            ));
        }
        Ok(Self { jwt_secret: Secret::new(secret) })
    }
}

//----------------------------------------------  SettlementConfig  ----------------------------------------------------

/// Settings for the background sweep that re-verifies stale pending orders directly with the
/// gateway. The sweep is belt-and-braces for lost webhooks; disabling it never loses data, it
/// only means missed confirmations wait for a manual verify.
#[derive(Clone, Copy, Debug)]
pub struct SettlementConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub max_age_secs: i64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: DEFAULT_SETTLEMENT_INTERVAL_SECS,
            max_age_secs: DEFAULT_SETTLEMENT_MAX_AGE_SECS,
        }
    }
}

impl SettlementConfig {
    pub fn from_env_or_default() -> Self {
        let enabled = parse_boolean_flag(env::var("LPS_SETTLEMENT_ENABLED").ok(), true);
        if !enabled {
            info!("🪛️ The settlement worker is disabled. Stale pending orders will not be re-verified.");
        }
        let interval_secs = env::var("LPS_SETTLEMENT_INTERVAL")
            .map_err(|_| {
                info!(
                    "🪛️ LPS_SETTLEMENT_INTERVAL is not set. Using the default value of \
                     {DEFAULT_SETTLEMENT_INTERVAL_SECS} seconds."
                )
            })
            .and_then(|s| {
                s.parse::<u64>().map_err(|e| warn!("🪛️ Invalid configuration value for LPS_SETTLEMENT_INTERVAL. {e}"))
            })
            .ok()
            .unwrap_or(DEFAULT_SETTLEMENT_INTERVAL_SECS);
        let max_age_secs = env::var("LPS_SETTLEMENT_MAX_AGE")
            .map_err(|_| {
                info!(
                    "🪛️ LPS_SETTLEMENT_MAX_AGE is not set. Using the default value of \
                     {DEFAULT_SETTLEMENT_MAX_AGE_SECS} seconds."
                )
            })
            .and_then(|s| {
                s.parse::<i64>().map_err(|e| warn!("🪛️ Invalid configuration value for LPS_SETTLEMENT_MAX_AGE. {e}"))
            })
            .ok()
            .unwrap_or(DEFAULT_SETTLEMENT_MAX_AGE_SECS);
        Self { enabled, interval_secs, max_age_secs }
    }

    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn max_age(&self) -> Duration {
        Duration::seconds(self.max_age_secs)
    }
}
