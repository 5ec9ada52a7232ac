//! Gateway credentials and endpoints.
//!
//! Both configs default to the gateways' public sandbox environments, so a development server works out of the box.
//! Production deployments must set the `BISTRO_ESEWA_*` / `BISTRO_KHALTI_*` variables.
use bistro_common::Secret;
use log::*;

#[derive(Debug, Clone)]
pub struct EsewaConfig {
    /// The form-post endpoint the customer's browser is redirected to.
    pub payment_url: String,
    /// The transaction status enquiry endpoint, used when a callback never arrives.
    pub status_url: String,
    pub product_code: String,
    pub secret_key: Secret<String>,
    /// Where the gateway sends the customer after a successful payment.
    pub success_url: String,
    /// Where the gateway sends the customer after a failed or abandoned payment.
    pub failure_url: String,
}

impl Default for EsewaConfig {
    fn default() -> Self {
        Self {
            payment_url: "https://rc-epay.esewa.com.np/api/epay/main/v2/form".into(),
            status_url: "https://rc.esewa.com.np/api/epay/transaction/status/".into(),
            product_code: "EPAYTEST".into(),
            secret_key: Secret::new("8gBm/:&EnhH.1/q".into()),
            success_url: "http://localhost:4000/payments/esewa/success".into(),
            failure_url: "http://localhost:4000/payments/esewa/failure".into(),
        }
    }
}

impl EsewaConfig {
    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let secret_key = match std::env::var("BISTRO_ESEWA_SECRET_KEY") {
            Ok(s) => Secret::new(s),
            Err(_) => {
                warn!("🪛️ BISTRO_ESEWA_SECRET_KEY not set. Using the sandbox signing key.");
                defaults.secret_key
            },
        };
        Self {
            payment_url: std::env::var("BISTRO_ESEWA_PAYMENT_URL").unwrap_or(defaults.payment_url),
            status_url: std::env::var("BISTRO_ESEWA_STATUS_URL").unwrap_or(defaults.status_url),
            product_code: std::env::var("BISTRO_ESEWA_PRODUCT_CODE").unwrap_or(defaults.product_code),
            secret_key,
            success_url: std::env::var("BISTRO_ESEWA_SUCCESS_URL").unwrap_or(defaults.success_url),
            failure_url: std::env::var("BISTRO_ESEWA_FAILURE_URL").unwrap_or(defaults.failure_url),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KhaltiConfig {
    /// API base, e.g. `https://dev.khalti.com/api/v2`.
    pub base_url: String,
    pub secret_key: Secret<String>,
    /// Where the gateway sends the customer after the payment flow, successful or not.
    pub return_url: String,
    /// The merchant site URL the gateway displays to the customer.
    pub website_url: String,
}

impl Default for KhaltiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dev.khalti.com/api/v2".into(),
            secret_key: Secret::new("live_secret_key_68791341fdd94846a146f0457ff7b455".into()),
            return_url: "http://localhost:4000/payments/khalti/return".into(),
            website_url: "http://localhost:4000".into(),
        }
    }
}

impl KhaltiConfig {
    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let secret_key = match std::env::var("BISTRO_KHALTI_SECRET_KEY") {
            Ok(s) => Secret::new(s),
            Err(_) => {
                warn!("🪛️ BISTRO_KHALTI_SECRET_KEY not set. Using the sandbox key.");
                defaults.secret_key
            },
        };
        Self {
            base_url: std::env::var("BISTRO_KHALTI_BASE_URL").unwrap_or(defaults.base_url),
            secret_key,
            return_url: std::env::var("BISTRO_KHALTI_RETURN_URL").unwrap_or(defaults.return_url),
            website_url: std::env::var("BISTRO_KHALTI_WEBSITE_URL").unwrap_or(defaults.website_url),
        }
    }
}
