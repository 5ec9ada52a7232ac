mod errors;
mod lifecycle;
mod payment_flow;

pub use errors::{LifecycleError, PaymentFlowError};
pub use lifecycle::{Actor, LifecycleApi};
pub use payment_flow::{Applied, PaymentFlowApi};
