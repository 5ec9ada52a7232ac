//! Payment gateway adapters for the Bistro ordering backend.
//!
//! Two very different gateway protocols are normalized behind one [`PaymentGateway`] contract:
//!
//! * **eSewa** is a redirect-form gateway: initiation builds a signed HTML form the customer's browser posts to the
//!   gateway, and the result comes back as a signed, base64-encoded payload on the success redirect. Amounts are in
//!   rupees and trust rests on an HMAC-SHA256 signature.
//! * **Khalti** is a server-to-server gateway: initiation is an authenticated API call that returns a `pidx` session
//!   identifier and a redirect URL. Nothing on the return redirect is trusted; the authoritative result always comes
//!   from the lookup endpoint.
//!
//! Whatever the protocol, an adapter only ever hands the engine a normalized
//! [`PaymentOutcome`](bistro_engine::db_types::PaymentOutcome); the reconciliation rules live upstream.
mod error;
mod gateway;

pub mod config;
pub mod esewa;
pub mod helpers;
pub mod khalti;

pub use error::GatewayError;
pub use gateway::{AnyGateway, GatewayRegistry, InitiatedPayment, PaymentGateway};
