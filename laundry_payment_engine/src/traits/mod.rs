//! The traits that storage backends implement.
//!
//! [`ReconciliationDatabase`] is the write side: order creation and the atomic status
//! transitions. [`OrderManagement`] is the read side: lookups, searches and the unmatched-payment
//! report. The SQLite backend implements both on the same pool; a backend is free to split them.

mod data_objects;
mod order_management;
mod reconciliation_database;

pub use data_objects::{InsertOrderResult, MarkFailedOutcome, MarkPaidOutcome, ReconcileResult};
pub use order_management::{OrderApiError, OrderManagement};
pub use reconciliation_database::{ReconciliationDatabase, ReconciliationError};
