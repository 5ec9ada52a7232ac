//! eSewa (redirect-form protocol) adapter.
//!
//! Initiation is entirely local: we build the form the customer's browser posts to the gateway, signing
//! `total_amount`, `transaction_uuid` and `product_code` with HMAC-SHA256. The success redirect carries a
//! base64-encoded JSON payload whose signature we re-derive over the fields it claims were signed; a mismatch means
//! the payload is forged and is rejected outright. Amounts are rupee-denominated strings, so the exact rendering in
//! [`Money::to_rupee_string`] matters on both legs.
use std::{collections::HashMap, sync::Arc};

use bistro_common::Money;
use bistro_engine::db_types::{Order, OutcomeStatus, PaymentMethod, PaymentOutcome};
use log::*;
use reqwest::Client;
use serde_json::Value;

use crate::{
    config::EsewaConfig,
    helpers::{parse_rupee_amount, sign_message},
    GatewayError,
    InitiatedPayment,
    PaymentGateway,
};

const SIGNED_FIELDS: &str = "total_amount,transaction_uuid,product_code";

#[derive(Clone)]
pub struct EsewaGateway {
    config: EsewaConfig,
    client: Arc<Client>,
}

impl EsewaGateway {
    pub fn new(config: EsewaConfig) -> Result<Self, GatewayError> {
        let client = Client::builder().build().map_err(|e| GatewayError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    fn signature_for(&self, total_amount: &str, txref: &str) -> Result<String, GatewayError> {
        let message = format!(
            "total_amount={total_amount},transaction_uuid={txref},product_code={}",
            self.config.product_code
        );
        sign_message(&self.config.secret_key, &message)
    }

    /// Re-derives the signature over the fields the payload claims were signed and compares it to the one supplied.
    fn verify_payload(&self, payload: &Value, txref: &str) -> Result<(), GatewayError> {
        let signed_names = field_as_string(payload, "signed_field_names")?;
        let supplied = field_as_string(payload, "signature")?;
        let message = signed_names
            .split(',')
            .map(|name| Ok(format!("{name}={}", field_as_string(payload, name)?)))
            .collect::<Result<Vec<String>, GatewayError>>()?
            .join(",");
        let expected = sign_message(&self.config.secret_key, &message)?;
        if expected == supplied {
            Ok(())
        } else {
            warn!("💳️ eSewa callback for [{txref}] failed signature verification");
            Err(GatewayError::InvalidSignature(txref.to_string()))
        }
    }
}

impl PaymentGateway for EsewaGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Esewa
    }

    async fn initiate(&self, order: &Order, txref: &str) -> Result<InitiatedPayment, GatewayError> {
        let total_amount = order.total_price.to_rupee_string();
        let signature = self.signature_for(&total_amount, txref)?;
        let form_fields = vec![
            ("amount".to_string(), total_amount.clone()),
            ("tax_amount".to_string(), "0".to_string()),
            ("total_amount".to_string(), total_amount),
            ("transaction_uuid".to_string(), txref.to_string()),
            ("product_code".to_string(), self.config.product_code.clone()),
            ("product_service_charge".to_string(), "0".to_string()),
            ("product_delivery_charge".to_string(), "0".to_string()),
            ("success_url".to_string(), self.config.success_url.clone()),
            ("failure_url".to_string(), self.config.failure_url.clone()),
            ("signed_field_names".to_string(), SIGNED_FIELDS.to_string()),
            ("signature".to_string(), signature),
        ];
        debug!("💳️ Built eSewa payment form for order {} under [{txref}]", order.order_id);
        Ok(InitiatedPayment {
            method: PaymentMethod::Esewa,
            txref: txref.to_string(),
            redirect_url: self.config.payment_url.clone(),
            form_fields,
        })
    }

    fn parse_callback(&self, params: &HashMap<String, String>) -> Result<PaymentOutcome, GatewayError> {
        let data = params.get("data").ok_or_else(|| GatewayError::MissingField("data".to_string()))?;
        let decoded =
            base64::decode(data).map_err(|e| GatewayError::MalformedResponse(format!("Invalid base64: {e}")))?;
        let payload: Value =
            serde_json::from_slice(&decoded).map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
        let txref = field_as_string(&payload, "transaction_uuid")?;
        self.verify_payload(&payload, &txref)?;
        let status = map_status(&field_as_string(&payload, "status")?);
        let amount = parse_rupee_amount(&field_as_string(&payload, "total_amount")?)?;
        Ok(PaymentOutcome { status, amount, txref })
    }

    async fn lookup(&self, txref: &str, expected_amount: Money) -> Result<PaymentOutcome, GatewayError> {
        let total_amount = expected_amount.to_rupee_string();
        let params =
            [("product_code", self.config.product_code.as_str()), ("total_amount", &total_amount), ("transaction_uuid", txref)];
        trace!("💳️ eSewa status enquiry for [{txref}]");
        let response = self
            .client
            .get(&self.config.status_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayError::Unavailable(e.to_string()))?;
            return Err(GatewayError::RequestFailed { status, message });
        }
        let payload: Value = response.json().await.map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
        enquiry_outcome(&payload, txref)
    }
}

/// Normalizes a status-enquiry response. The amount is taken from the response itself, never from what we asked
/// about, so the reconciliation engine's amount check stays meaningful.
fn enquiry_outcome(payload: &Value, txref: &str) -> Result<PaymentOutcome, GatewayError> {
    let status = map_status(&field_as_string(payload, "status")?);
    let amount = parse_rupee_amount(&field_as_string(payload, "total_amount")?)?;
    Ok(PaymentOutcome { status, amount, txref: txref.to_string() })
}

/// Reads a field as the string the gateway signed it as. Numbers are rendered with their JSON representation.
fn field_as_string(payload: &Value, name: &str) -> Result<String, GatewayError> {
    match payload.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(_) | None => Err(GatewayError::MissingField(name.to_string())),
    }
}

fn map_status(status: &str) -> OutcomeStatus {
    match status {
        "COMPLETE" => OutcomeStatus::Paid,
        "PENDING" | "AMBIGUOUS" => OutcomeStatus::Pending,
        "CANCELED" | "NOT_FOUND" | "FULL_REFUND" | "PARTIAL_REFUND" => OutcomeStatus::Failed,
        other => {
            warn!("💳️ eSewa reported an unrecognized status '{other}'. Treating the attempt as failed.");
            OutcomeStatus::Failed
        },
    }
}
