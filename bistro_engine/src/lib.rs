//! Bistro order engine
//!
//! The core of the Bistro ordering backend: orders with two independent status axes (fulfillment and payment), the
//! role-checked fulfillment state machine, and the payment reconciliation engine that applies asynchronous gateway
//! outcomes to authoritative local state under idempotency, reference-matching and amount-matching rules.
//!
//! The crate is split into:
//! 1. Database management ([`mod@db`]). SQLite is the supported backend. You should never need to touch the
//!    database directly; use the public APIs. The exception is the data types, which live in [`db_types`] and are
//!    public.
//! 2. The public APIs: [`LifecycleApi`] for the fulfillment axis and [`PaymentFlowApi`] for the payment axis. Both
//!    are generic over the [`traits::OrderStore`] backend contract.
//!
//! The engine also emits events (currently only "order ready") through a small hook system in [`events`], so the
//! serving layer can plug in its push/notification mechanism without the core knowing about it.
mod api;
mod db;

pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;

pub use api::{Actor, Applied, LifecycleApi, LifecycleError, PaymentFlowApi, PaymentFlowError};
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
