pub mod order_objects;
mod order_query_api;
mod reconciliation_api;

pub use order_query_api::OrderQueryApi;
pub use reconciliation_api::ReconciliationApi;
