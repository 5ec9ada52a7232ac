use bistro_common::{Money, Secret};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::GatewayError;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 over `message`, base64-encoded. This is the signature scheme the redirect-form gateway uses on both
/// legs: we sign the initiation form with it, and re-derive it to verify callbacks.
pub fn sign_message(secret: &Secret<String>, message: &str) -> Result<String, GatewayError> {
    let mut mac = HmacSha256::new_from_slice(secret.reveal().as_bytes())
        .map_err(|e| GatewayError::Initialization(format!("Invalid HMAC key: {e}")))?;
    mac.update(message.as_bytes());
    Ok(base64::encode(mac.finalize().into_bytes()))
}

/// Parses a rupee-denominated amount as the gateway renders it. Callback payloads sometimes carry thousands
/// separators ("1,000.0"), which [`Money`]'s own parser rightly refuses.
pub fn parse_rupee_amount(s: &str) -> Result<Money, GatewayError> {
    let cleaned = s.replace(',', "");
    cleaned.parse::<Money>().map_err(|e| GatewayError::InvalidAmount(e.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn signatures_are_stable() {
        let secret = Secret::new("8gBm/:&EnhH.1/q".to_string());
        let msg = "total_amount=100,transaction_uuid=11-201-13,product_code=EPAYTEST";
        let sig = sign_message(&secret, msg).unwrap();
        assert_eq!(sig, sign_message(&secret, msg).unwrap());
        // A different key or message produces a different signature.
        assert_ne!(sig, sign_message(&secret, "total_amount=101,transaction_uuid=11-201-13,product_code=EPAYTEST").unwrap());
        assert_ne!(sig, sign_message(&Secret::new("other".to_string()), msg).unwrap());
    }

    #[test]
    fn rupee_amounts_with_separators() {
        assert_eq!(parse_rupee_amount("1,000.0").unwrap(), Money::from_rupees(1000));
        assert_eq!(parse_rupee_amount("850").unwrap(), Money::from_rupees(850));
        assert_eq!(parse_rupee_amount("850.50").unwrap(), Money::from_paisa(85_050));
        assert!(parse_rupee_amount("eight fifty").is_err());
    }
}
