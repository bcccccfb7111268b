use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    config::PaystackConfig,
    data_objects::{CheckoutSession, NewTransaction, PaystackResponse, VerifiedTransaction},
    ConfirmationPoller,
    PaystackApiError,
    PollOutcome,
    PollingPolicy,
};

/// Outbound calls to the provider must not hold a webhook handler open while the provider
/// itself is timing out and scheduling a retry.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct PaystackApi {
    config: PaystackConfig,
    client: Arc<Client>,
}

impl PaystackApi {
    pub fn new(config: PaystackConfig) -> Result<Self, PaystackApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let mut val = HeaderValue::from_str(&format!("Bearer {}", config.secret_key.reveal()))
            .map_err(|e| PaystackApiError::Initialization(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert(AUTHORIZATION, val);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PaystackApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<T, PaystackApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {url}");
        let mut req = self.client.request(method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| PaystackApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            let envelope =
                response.json::<PaystackResponse<T>>().await.map_err(|e| PaystackApiError::JsonError(e.to_string()))?;
            if !envelope.status {
                return Err(PaystackApiError::ProviderError(envelope.message));
            }
            envelope.data.ok_or_else(|| PaystackApiError::JsonError("Response envelope carries no data".to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| PaystackApiError::RestResponseError(e.to_string()))?;
            Err(PaystackApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url)
    }

    /// Opens a hosted checkout session. The naira→kobo conversion happens inside
    /// [`NewTransaction::to_payload`]; nothing upstream of this call deals in kobo.
    pub async fn initialize_transaction(&self, tx: NewTransaction) -> Result<CheckoutSession, PaystackApiError> {
        let payload = tx.to_payload()?;
        debug!("💳️ Opening checkout session for {} (reference {:?})", tx.amount, tx.reference);
        let session = self
            .rest_query::<CheckoutSession, Value>(Method::POST, "/transaction/initialize", &[], Some(payload))
            .await?;
        info!("💳️ Checkout session open. Reference: {}", session.reference);
        Ok(session)
    }

    /// Pull-based status query, independent of the webhook channel. Returns amounts in kobo.
    pub async fn verify_transaction(&self, reference: &str) -> Result<VerifiedTransaction, PaystackApiError> {
        let path = format!("/transaction/verify/{}", urlencoding::encode(reference));
        debug!("💳️ Verifying transaction {reference}");
        let tx = self.rest_query::<VerifiedTransaction, ()>(Method::GET, &path, &[], None).await?;
        debug!("💳️ Transaction {} reports status '{}'", tx.reference, tx.status);
        Ok(tx)
    }

    /// Runs the bounded confirmation poll against the provider directly.
    pub async fn poll_confirmation(&self, reference: &str, policy: PollingPolicy) -> PollOutcome {
        let poller = ConfirmationPoller::new(policy);
        poller.poll_with(reference, |r| async move { self.verify_transaction(&r).await }).await
    }
}
