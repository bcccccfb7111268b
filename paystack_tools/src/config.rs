use log::*;
use lps_common::Secret;

pub const DEFAULT_PAYSTACK_API_URL: &str = "https://api.paystack.co";

#[derive(Debug, Clone)]
pub struct PaystackConfig {
    /// Base URL for the provider REST API. Overridable so tests can point at a local stub.
    pub api_url: String,
    /// The account secret key. Doubles as the webhook signing secret, which is how the
    /// provider operates: webhook bodies are signed with the same key that authorizes API calls.
    pub secret_key: Secret<String>,
}

impl Default for PaystackConfig {
    fn default() -> Self {
        Self { api_url: DEFAULT_PAYSTACK_API_URL.to_string(), secret_key: Secret::new(String::default()) }
    }
}

impl PaystackConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("LPS_PAYSTACK_URL").unwrap_or_else(|_| {
            info!("🪛️ LPS_PAYSTACK_URL not set, using {DEFAULT_PAYSTACK_API_URL}");
            DEFAULT_PAYSTACK_API_URL.to_string()
        });
        let secret_key = Secret::new(std::env::var("LPS_PAYSTACK_SECRET_KEY").unwrap_or_else(|_| {
            warn!("🪛️ LPS_PAYSTACK_SECRET_KEY not set, using a useless default. Gateway calls will be rejected.");
            "sk_test_00000000000000000000".to_string()
        }));
        Self { api_url, secret_key }
    }
}
