//! Khalti (server-to-server protocol) adapter.
//!
//! Initiation is an authenticated API call that returns a `pidx` session identifier and a hosted payment page. The
//! `pidx` becomes the order's live reference, replacing whatever provisional reference initiation started with. The
//! return redirect carries status parameters but no signature, so nothing on it is trusted: [`parse_callback`]
//! reports the attempt as pending and the serving layer confirms through [`lookup`], whose response comes over our
//! own authenticated connection. Amounts are in paisa throughout.
//!
//! [`parse_callback`]: PaymentGateway::parse_callback
//! [`lookup`]: PaymentGateway::lookup
use std::{collections::HashMap, sync::Arc};

use bistro_common::Money;
use bistro_engine::db_types::{Order, OutcomeStatus, PaymentMethod, PaymentOutcome};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::Deserialize;

use crate::{config::KhaltiConfig, GatewayError, InitiatedPayment, PaymentGateway};

#[derive(Clone)]
pub struct KhaltiGateway {
    config: KhaltiConfig,
    client: Arc<Client>,
}

#[derive(Debug, Deserialize)]
struct InitiateResponse {
    pidx: String,
    payment_url: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    pidx: String,
    total_amount: i64,
    status: String,
    #[serde(default)]
    transaction_id: Option<String>,
}

impl KhaltiGateway {
    pub fn new(config: KhaltiConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::with_capacity(2);
        let auth = HeaderValue::from_str(&format!("key {}", config.secret_key.reveal()))
            .map_err(|e| GatewayError::Initialization(e.to_string()))?;
        headers.insert("Authorization", auth);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client =
            Client::builder().default_headers(headers).build().map_err(|e| GatewayError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, GatewayError> {
        let url = format!("{}{path}", self.config.base_url);
        trace!("🪙️ Khalti request: {url}");
        let response =
            self.client.post(url).json(&body).send().await.map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        if response.status().is_success() {
            response.json::<T>().await.map_err(|e| GatewayError::MalformedResponse(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayError::Unavailable(e.to_string()))?;
            Err(GatewayError::RequestFailed { status, message })
        }
    }
}

impl PaymentGateway for KhaltiGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Khalti
    }

    async fn initiate(&self, order: &Order, txref: &str) -> Result<InitiatedPayment, GatewayError> {
        let body = serde_json::json!({
            "return_url": self.config.return_url,
            "website_url": self.config.website_url,
            "amount": order.total_price.value(),
            "purchase_order_id": txref,
            "purchase_order_name": format!("Bistro order {}", order.order_id),
        });
        let response: InitiateResponse = self.post("/epayment/initiate/", body).await?;
        debug!("🪙️ Khalti session [{}] opened for order {}", response.pidx, order.order_id);
        // The session is keyed on the gateway-issued pidx, not on our provisional reference.
        Ok(InitiatedPayment {
            method: PaymentMethod::Khalti,
            txref: response.pidx,
            redirect_url: response.payment_url,
            form_fields: Vec::new(),
        })
    }

    /// The return redirect is unauthenticated, so the only thing taken from it is *which* attempt to go and verify.
    fn parse_callback(&self, params: &HashMap<String, String>) -> Result<PaymentOutcome, GatewayError> {
        let pidx = params.get("pidx").ok_or_else(|| GatewayError::MissingField("pidx".to_string()))?;
        let claimed_amount = params
            .get("total_amount")
            .and_then(|s| s.parse::<i64>().ok())
            .map(Money::from_paisa)
            .unwrap_or_default();
        Ok(PaymentOutcome { status: OutcomeStatus::Pending, amount: claimed_amount, txref: pidx.clone() })
    }

    async fn lookup(&self, txref: &str, _expected_amount: Money) -> Result<PaymentOutcome, GatewayError> {
        let response: LookupResponse = self.post("/epayment/lookup/", serde_json::json!({ "pidx": txref })).await?;
        let status = match response.status.as_str() {
            "Completed" => OutcomeStatus::Paid,
            "Pending" | "Initiated" => OutcomeStatus::Pending,
            "Expired" | "Failed" | "User canceled" | "Refunded" | "Partially Refunded" => OutcomeStatus::Failed,
            other => {
                warn!("🪙️ Khalti reported an unrecognized status '{other}' for [{}]. Treating as pending.", response.pidx);
                OutcomeStatus::Pending
            },
        };
        if let Some(tid) = &response.transaction_id {
            trace!("🪙️ Khalti [{}] settled under gateway transaction {tid}", response.pidx);
        }
        Ok(PaymentOutcome { status, amount: Money::from_paisa(response.total_amount), txref: response.pidx })
    }
}
