//! # Laundry payment server
//! This crate hosts the HTTP surface of the laundry payment system. It is responsible for:
//! * Listening for incoming payment webhooks from the gateway and feeding them into reconciliation.
//! * Creating orders and opening hosted checkout sessions for them.
//! * Serving order reads (own orders, admin search, unmatched payments) to authenticated callers.
//! * Running the background settlement sweep that re-verifies stale pending orders.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: a health check route that returns a 200 OK response.
//! * `/paystack/webhook`: the gateway webhook endpoint, guarded by an HMAC signature check over
//!   the raw request body.
//! * `/api/...`: authenticated order and payment routes. Access tokens go in the
//!   `Authorization: Bearer` header.
//! * `/api/payments/verify`: the one public `/api` route; customers poll it after checkout.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod paystack_routes;
pub mod routes;
pub mod server;
pub mod settlement_worker;

#[cfg(test)]
mod endpoint_tests;
