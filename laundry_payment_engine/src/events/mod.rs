//! Reconciliation event plumbing.
//!
//! The engine announces notable reconciliation outcomes over in-process channels so that the
//! server can react (notify a customer, page an operator) without the reconcile path waiting on
//! any of it. Wire-up order: build [`EventHooks`] with your closures, hand them to
//! [`EventHandlers::new`], take [`EventHandlers::producers`] for the API, then call
//! [`EventHandlers::start_handlers`].

pub mod channel;
mod event_types;
mod hooks;

pub use event_types::{OrderPaidEvent, UnmatchedPaymentEvent};
pub use hooks::{EventHandlers, EventHooks, EventProducers};
