mod api;
mod config;
mod error;
mod poller;
mod signature;

mod data_objects;

pub mod helpers;

pub use api::PaystackApi;
pub use config::PaystackConfig;
pub use data_objects::{
    ChargeEventData,
    CheckoutSession,
    Customer,
    NewTransaction,
    PaystackEvent,
    PaystackResponse,
    TransactionStatus,
    VerifiedTransaction,
    CHARGE_SUCCESS_EVENT,
};
pub use error::PaystackApiError;
pub use poller::{ConfirmationPoller, PollOutcome, PollingPolicy};
pub use signature::{sign_payload, verify_signature};
