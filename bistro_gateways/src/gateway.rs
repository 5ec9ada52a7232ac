use std::collections::HashMap;

use bistro_common::Money;
use bistro_engine::db_types::{Order, PaymentMethod, PaymentOutcome};

use crate::{esewa::EsewaGateway, khalti::KhaltiGateway, GatewayError};

/// Everything the serving layer needs to hand to the customer's client to continue a payment at the gateway.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InitiatedPayment {
    pub method: PaymentMethod,
    /// The reference the gateway session is keyed on. This is what gets persisted as the order's live reference, and
    /// what every subsequent callback and lookup must match.
    pub txref: String,
    /// Where the client goes next. For redirect-form gateways this is the form-post target; for API gateways it is
    /// the ready-made payment page.
    pub redirect_url: String,
    /// Form fields the client must post to `redirect_url`. Empty for API gateways.
    pub form_fields: Vec<(String, String)>,
}

/// The adapter contract every supported online gateway implements.
///
/// `initiate` talks to the gateway (or builds the signed redirect form) for a fresh attempt keyed on `txref`;
/// `parse_callback` turns an inbound redirect's query parameters into a normalized outcome, verifying whatever
/// authenticity the protocol offers; `lookup` asks the gateway for the authoritative state of an attempt.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    fn method(&self) -> PaymentMethod;

    async fn initiate(&self, order: &Order, txref: &str) -> Result<InitiatedPayment, GatewayError>;

    fn parse_callback(&self, params: &HashMap<String, String>) -> Result<PaymentOutcome, GatewayError>;

    async fn lookup(&self, txref: &str, expected_amount: Money) -> Result<PaymentOutcome, GatewayError>;
}

/// Enum dispatch over the concrete adapters, so a registry can hold a heterogeneous set without boxing async trait
/// objects.
#[derive(Clone)]
pub enum AnyGateway {
    Esewa(EsewaGateway),
    Khalti(KhaltiGateway),
}

impl PaymentGateway for AnyGateway {
    fn method(&self) -> PaymentMethod {
        match self {
            AnyGateway::Esewa(g) => g.method(),
            AnyGateway::Khalti(g) => g.method(),
        }
    }

    async fn initiate(&self, order: &Order, txref: &str) -> Result<InitiatedPayment, GatewayError> {
        match self {
            AnyGateway::Esewa(g) => g.initiate(order, txref).await,
            AnyGateway::Khalti(g) => g.initiate(order, txref).await,
        }
    }

    fn parse_callback(&self, params: &HashMap<String, String>) -> Result<PaymentOutcome, GatewayError> {
        match self {
            AnyGateway::Esewa(g) => g.parse_callback(params),
            AnyGateway::Khalti(g) => g.parse_callback(params),
        }
    }

    async fn lookup(&self, txref: &str, expected_amount: Money) -> Result<PaymentOutcome, GatewayError> {
        match self {
            AnyGateway::Esewa(g) => g.lookup(txref, expected_amount).await,
            AnyGateway::Khalti(g) => g.lookup(txref, expected_amount).await,
        }
    }
}

/// The set of configured gateways, keyed by payment method.
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    gateways: Vec<AnyGateway>,
}

impl GatewayRegistry {
    pub fn register(mut self, gateway: AnyGateway) -> Self {
        self.gateways.push(gateway);
        self
    }

    pub fn get(&self, method: PaymentMethod) -> Result<&AnyGateway, GatewayError> {
        self.gateways.iter().find(|g| g.method() == method).ok_or(GatewayError::UnsupportedMethod(method))
    }
}
