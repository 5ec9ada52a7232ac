//! Access-token handling.
//!
//! Clients authenticate with a bearer JWT in the `Authorization` header. The token is signed with HS256 by the
//! identity service (the server itself never issues customer tokens) and carries the subject and role the engine's
//! authorization checks run against. [`JwtClaims`] is an actix extractor, so any handler that declares it as a
//! parameter is authenticated.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use bistro_engine::{db_types::Role, Actor};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The authenticated party's identifier: a customer id or a staff id.
    pub sub: String,
    pub role: Role,
    /// Expiry, as a unix timestamp. Checked during validation.
    pub exp: i64,
}

impl JwtClaims {
    pub fn actor(&self) -> Actor {
        Actor::new(self.sub.clone(), self.role)
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

/// Verifies bearer tokens against the shared secret. Stored as app data and used by the [`JwtClaims`] extractor.
#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(config: &AuthConfig) -> Self {
        let key = DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        Self { key, validation }
    }

    pub fn validate(&self, token: &str) -> Result<JwtClaims, AuthError> {
        decode::<JwtClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::ValidationError(e.to_string()))
    }
}

/// Signs tokens with the same shared secret. Handy for tests and local development; production tokens come from the
/// identity service.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { key: EncodingKey::from_secret(config.jwt_secret.reveal().as_bytes()) }
    }

    pub fn issue_token(&self, claims: &JwtClaims) -> Result<String, ServerError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.key)
            .map_err(|e| ServerError::BackendError(format!("Could not sign token. {e}")))
    }
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_claims(req))
    }
}

fn extract_claims(req: &HttpRequest) -> Result<JwtClaims, ServerError> {
    let validator = req
        .app_data::<web::Data<TokenValidator>>()
        .ok_or_else(|| ServerError::InitializeError("No token validator is configured".to_string()))?;
    let header = req.headers().get("Authorization").ok_or(AuthError::MissingToken)?;
    let token = header
        .to_str()
        .ok()
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or_else(|| AuthError::ValidationError("Authorization header is not a bearer token".to_string()))?;
    let claims = validator.validate(token)?;
    trace!("💻️ Validated access token for {} ({})", claims.sub, claims.role);
    Ok(claims)
}
