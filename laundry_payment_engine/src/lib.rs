//! # Laundry payment engine
//!
//! The engine owns order storage and the reconciliation state machine that turns payment signals
//! from the gateway into order status transitions. The rules it enforces:
//!
//! * An order is created as `Pending` and moves to `Paid` exactly once, no matter how many
//!   confirmations of the same charge arrive, or how concurrently they arrive.
//! * `Paid` and `Failed` are terminal. Nothing moves an order out of them.
//! * Payment signals that cannot be matched to an order are kept, not dropped, so that operators
//!   can chase the money later.
//!
//! The interesting part is that none of this relies on application-level locking. The
//! `Pending -> Paid` transition is a single conditional `UPDATE` in the store, so the database
//! itself arbitrates racing confirmations and every loser of the race is told, cheaply, that the
//! work is already done.
//!
//! [`ReconciliationApi`] is the write-side entry point, [`OrderQueryApi`] the read side. Both are
//! generic over the storage backend via the traits in [`traits`]; [`SqliteDatabase`] is the
//! backend shipped here.

pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;

mod db;
mod lpe_api;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use lpe_api::{order_objects, OrderQueryApi, ReconciliationApi};
