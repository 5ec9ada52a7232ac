use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use bistro_engine::{LifecycleError, PaymentFlowError};
use bistro_gateways::GatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("{0}")]
    PaymentError(#[from] PaymentFlowError),
    #[error("{0}")]
    LifecycleError(#[from] LifecycleError),
    #[error("Gateway error. {0}")]
    GatewayError(#[from] GatewayError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InitializeError(_) | Self::BackendError(_) | Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            },
            Self::PaymentError(e) => match e {
                PaymentFlowError::OrderNotFound(_) | PaymentFlowError::UnknownReference(_) => StatusCode::NOT_FOUND,
                PaymentFlowError::AlreadyPaid(_) | PaymentFlowError::StaleTransaction { .. } => StatusCode::CONFLICT,
                PaymentFlowError::AmountMismatch { .. } | PaymentFlowError::UnsupportedMethod(_) => {
                    StatusCode::BAD_REQUEST
                },
                PaymentFlowError::RetriesExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
                PaymentFlowError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::LifecycleError(e) => match e {
                LifecycleError::OrderNotFound(_) => StatusCode::NOT_FOUND,
                LifecycleError::Unauthorized { .. } => StatusCode::FORBIDDEN,
                LifecycleError::InvalidTransition { .. } => StatusCode::CONFLICT,
                LifecycleError::RetriesExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
                LifecycleError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::GatewayError(e) => match e {
                GatewayError::Unavailable(_) | GatewayError::RequestFailed { .. } => StatusCode::BAD_GATEWAY,
                GatewayError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
                GatewayError::InvalidSignature(_) => StatusCode::FORBIDDEN,
                GatewayError::MissingField(_) | GatewayError::InvalidAmount(_) | GatewayError::UnsupportedMethod(_) => {
                    StatusCode::BAD_REQUEST
                },
                GatewayError::Initialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
}
