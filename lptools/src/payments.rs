//! The server-facing payment commands: `health`, `verify` and `watch`.

use std::time::Duration;

use laundry_payment_server::data_objects::VerifyPaymentResponse;
use paystack_tools::{
    helpers::naira_to_kobo,
    ConfirmationPoller,
    Customer,
    PaystackApiError,
    PollOutcome,
    PollingPolicy,
    VerifiedTransaction,
};

use crate::{client::PaymentServerClient, ServerParams, VerifyParams, WatchParams};

pub async fn check_server_health(params: ServerParams) {
    let client = connect(params);
    match client.health().await {
        Ok(response) => print!("{} says: {response}", client.server()),
        Err(e) => eprintln!("The server did not answer the health check. {e}"),
    }
}

pub async fn verify_reference(params: VerifyParams) {
    let client = connect(params.server);
    match client.verify_payment(&params.reference).await {
        Ok(response) => print_verification(&response),
        Err(e) => eprintln!("Verification failed. {e}"),
    }
}

/// Polls the server's verify endpoint until the charge confirms or the attempt budget runs out.
/// Exhaustion is not a failure; the webhook usually lands first and this loop just reports it.
pub async fn watch_reference(params: WatchParams) {
    let client = connect(params.server);
    let policy = PollingPolicy { attempts: params.attempts, interval: Duration::from_secs(params.interval) };
    println!(
        "Watching {reference} on {server} ({attempts} attempts, {interval}s apart)",
        reference = params.reference,
        server = client.server(),
        attempts = policy.attempts,
        interval = params.interval
    );
    let poller = ConfirmationPoller::new(policy);
    let client_ref = &client;
    let outcome = poller.poll_with(&params.reference, |reference| probe(client_ref, reference)).await;
    match outcome {
        PollOutcome::Confirmed(tx) => {
            println!("Payment {} is confirmed.", tx.reference);
        },
        PollOutcome::Pending => {
            println!(
                "Confirmation is still pending. The webhook may simply not have landed yet; the settlement sweep \
                 will pick the order up if it never does."
            );
        },
    }
}

async fn probe(client: &PaymentServerClient, reference: String) -> Result<VerifiedTransaction, PaystackApiError> {
    let response = client
        .verify_payment(&reference)
        .await
        .map_err(|e| PaystackApiError::RestResponseError(e.to_string()))?;
    transaction_from_response(response)
}

/// Rebuilds the poller's transaction view from the server's verify response. The server reports
/// amounts in naira, so this is one of the two ends of the kobo conversion.
fn transaction_from_response(response: VerifyPaymentResponse) -> Result<VerifiedTransaction, PaystackApiError> {
    let amount = naira_to_kobo(response.amount)?;
    Ok(VerifiedTransaction {
        status: response.status,
        reference: response.reference,
        amount,
        customer: response.email.map(|email| Customer { email: Some(email) }),
        metadata: response.metadata,
        currency: None,
        paid_at: None,
        channel: None,
    })
}

fn print_verification(response: &VerifyPaymentResponse) {
    let order = match &response.order_id {
        Some(order_id) => order_id.to_string(),
        None => "no matching order".to_string(),
    };
    println!("--------------------------- Payment Verification ---------------------------");
    println!("reference: {}", response.reference);
    println!("status: {}", response.status);
    println!("amount: {}", response.amount);
    println!("order: {order}");
    println!("email: {}", response.email.as_deref().unwrap_or("not reported"));
    if let Some(metadata) = &response.metadata {
        let json = serde_json::to_string_pretty(metadata)
            .unwrap_or_else(|e| format!("Could not represent metadata as JSON. {e}"));
        println!("metadata: {json}");
    }
    println!("-----------------------------------------------------------------------------");
}

fn connect(params: ServerParams) -> PaymentServerClient {
    match params.resolve() {
        Ok(profile) => PaymentServerClient::new(profile),
        Err(e) => {
            eprintln!("Could not resolve a server profile: {e}");
            std::process::exit(1);
        },
    }
}
