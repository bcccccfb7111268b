use std::fs;

use paystack_tools::sign_payload;

use crate::SignParams;

/// Computes the webhook signature header for a payload, for replaying deliveries by hand.
pub fn print_webhook_signature(params: SignParams) {
    let Some(secret) = params.secret.or_else(|| std::env::var("LPS_PAYSTACK_SECRET_KEY").ok()) else {
        println!("No signing secret. Pass --secret or set LPS_PAYSTACK_SECRET_KEY");
        return;
    };
    let payload = match (params.payload, params.file) {
        (Some(payload), _) => payload.into_bytes(),
        (None, Some(path)) => match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("Could not read {}: {e}", path.display());
                return;
            },
        },
        (None, None) => {
            println!("Nothing to sign. Pass --payload or --file");
            return;
        },
    };
    let signature = sign_payload(&secret, &payload);
    println!("--------------------------- Webhook Signature ---------------------------");
    println!("payload: {} bytes", payload.len());
    println!("x-paystack-signature: {signature}");
    println!("-------------------------------------------------------------------------");
}
