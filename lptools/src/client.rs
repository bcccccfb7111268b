use anyhow::{anyhow, Result};
use laundry_payment_engine::{
    db_types::{Order, OrderId},
    order_objects::OrderResult,
};
use laundry_payment_server::data_objects::VerifyPaymentResponse;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    StatusCode,
};
use serde::de::DeserializeOwned;
use url::Url;

use crate::profile_manager::Profile;

pub struct PaymentServerClient {
    client: Client,
    profile: Profile,
    access_token: String,
}

impl PaymentServerClient {
    pub fn new(profile: Profile) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent("Laundry Payment Server Client")
            .default_headers(headers)
            .build()
            .expect("Failed to create reqwest client");
        let access_token = profile.access_token().unwrap_or_default();
        PaymentServerClient { client, profile, access_token }
    }

    pub fn server(&self) -> &str {
        self.profile.server.as_str()
    }

    pub fn profile_name(&self) -> &str {
        &self.profile.name
    }

    pub fn url(&self, path: &str) -> Result<Url> {
        self.profile.server.join(path).map_err(|e| anyhow!("Failed to join URL: {}", e))
    }

    pub async fn health(&self) -> Result<String> {
        let url = self.url("/health")?;
        let res = self.client.get(url).send().await?;
        let response = res.text().await?;
        Ok(response)
    }

    /// Ask the server to verify `reference` against the gateway. This route is public, so no
    /// token is attached; a successful charge is reconciled as a side effect on the server.
    pub async fn verify_payment(&self, reference: &str) -> Result<VerifyPaymentResponse> {
        let url = self.url("/api/payments/verify")?;
        let res = self.client.get(url).query(&[("reference", reference)]).send().await?;
        match res.status() {
            StatusCode::OK => Ok(res.json().await?),
            StatusCode::NOT_FOUND => Err(anyhow!("The gateway has no transaction with reference {reference}")),
            code => {
                let msg = res.text().await?;
                Err(anyhow!("Error verifying {reference}: {code}, {msg}."))
            },
        }
    }

    pub async fn my_orders(&self) -> Result<OrderResult> {
        self.auth_get_request("/api/orders").await
    }

    pub async fn order_by_id(&self, order_id: &OrderId) -> Result<Order> {
        let id = urlencoding::encode(order_id.as_str());
        self.auth_get_request(&format!("/api/orders/{id}")).await
    }

    /// Admin search. Requires a token carrying the `read_all` role.
    pub async fn search_orders(&self, query: &[(&str, String)]) -> Result<Vec<Order>> {
        let url = self.url("/api/orders/search")?;
        let res = self.client.get(url).query(query).bearer_auth(&self.access_token).send().await?;
        match res.status() {
            StatusCode::OK => Ok(res.json().await?),
            code => {
                let msg = res.text().await?;
                Err(anyhow!("Error searching orders: {code}, {msg}."))
            },
        }
    }

    async fn auth_get_request<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        let res = self.client.get(url).bearer_auth(&self.access_token).send().await?;
        match res.status() {
            StatusCode::OK => Ok(res.json().await?),
            code => {
                let msg = res.text().await?;
                Err(anyhow!("Error fetching {path}: {code}, {msg}."))
            },
        }
    }
}
