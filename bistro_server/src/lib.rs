//! # Bistro server
//!
//! The HTTP face of the Bistro ordering backend. It is responsible for:
//! * order placement and status queries for authenticated customers,
//! * the kitchen's fulfillment transitions,
//! * payment initiation against the configured gateways, and
//! * the gateway return/callback endpoints, which must acknowledge everything they receive and let the
//!   reconciliation engine decide what (if anything) changes.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
pub mod auth;
pub mod config;
pub mod data_objects;
pub mod errors;

pub mod payment_routes;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
