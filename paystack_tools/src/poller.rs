use std::{future::Future, time::Duration};

use log::*;

use crate::{data_objects::VerifiedTransaction, PaystackApiError};

/// Bounded retry schedule for post-checkout confirmation.
#[derive(Debug, Clone, Copy)]
pub struct PollingPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self { attempts: 5, interval: Duration::from_secs(3) }
    }
}

#[derive(Debug)]
pub enum PollOutcome {
    Confirmed(VerifiedTransaction),
    /// Attempts exhausted without observing success. Not a failure: the webhook may simply
    /// not have landed yet, and reconciliation will settle the order when it does.
    Pending,
}

impl PollOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, PollOutcome::Confirmed(_))
    }
}

/// Polls a verify function until it reports success, or the attempt budget runs out.
/// The loop only observes; it never mutates order state.
pub struct ConfirmationPoller {
    policy: PollingPolicy,
}

impl Default for ConfirmationPoller {
    fn default() -> Self {
        Self::new(PollingPolicy::default())
    }
}

impl ConfirmationPoller {
    pub fn new(policy: PollingPolicy) -> Self {
        Self { policy }
    }

    /// Generic over the verify call so the same loop serves direct provider queries and
    /// server-proxied ones. A failed poll round is indistinguishable from "not confirmed
    /// yet" and is treated the same way.
    pub async fn poll_with<F, Fut>(&self, reference: &str, mut verify: F) -> PollOutcome
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<VerifiedTransaction, PaystackApiError>>,
    {
        let attempts = self.policy.attempts.max(1);
        for attempt in 1..=attempts {
            match verify(reference.to_string()).await {
                Ok(tx) if tx.status.is_success() => {
                    info!("🕰️ Payment {reference} confirmed on attempt {attempt}");
                    return PollOutcome::Confirmed(tx);
                },
                Ok(tx) => {
                    debug!("🕰️ Attempt {attempt}/{attempts}: {reference} still reports '{}'", tx.status);
                },
                Err(e) => {
                    warn!("🕰️ Attempt {attempt}/{attempts}: verify call for {reference} failed: {e}");
                },
            }
            if attempt < attempts {
                tokio::time::sleep(self.policy.interval).await;
            }
        }
        info!("🕰️ Payment {reference} unconfirmed after {attempts} attempts. Confirmation is still pending.");
        PollOutcome::Pending
    }
}
