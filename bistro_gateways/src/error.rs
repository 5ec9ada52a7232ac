use bistro_engine::db_types::PaymentMethod;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Could not initialize gateway client: {0}")]
    Initialization(String),
    #[error("The gateway could not be reached: {0}")]
    Unavailable(String),
    #[error("Gateway request failed. Error {status}. {message}")]
    RequestFailed { status: u16, message: String },
    #[error("Could not deserialize gateway response: {0}")]
    MalformedResponse(String),
    #[error("Callback payload is missing the required field '{0}'")]
    MissingField(String),
    /// The re-derived signature does not match the one in the payload. The payload is forged or corrupt and must be
    /// discarded without touching order state.
    #[error("Callback signature verification failed for transaction [{0}]")]
    InvalidSignature(String),
    #[error("Invalid currency amount: {0}")]
    InvalidAmount(String),
    #[error("No gateway is configured for {0} payments")]
    UnsupportedMethod(PaymentMethod),
}
