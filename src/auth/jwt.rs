//! JWT token generation and validation

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::loan::Address;

/// JWT-related errors
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token decoding failed: {0}")]
    DecodingFailed(String),

    #[error("Token expired")]
    TokenExpired,
}

/// JWT claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (ledger address of the caller)
    pub sub: String,
    /// JWT ID
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    pub token_type: String,
}

impl Claims {
    pub fn caller(&self) -> Address {
        Address::new(self.sub.clone())
    }
}

/// `token_type` claim carried by every token this service issues
pub const ACCESS_TOKEN_TYPE: &str = "access";

/// Signing secret and token lifetime shared with the request extractor
#[derive(Clone)]
pub struct AuthKeys {
    secret: String,
    access_ttl_seconds: i64,
}

impl AuthKeys {
    pub fn new(secret: impl Into<String>, access_ttl_seconds: i64) -> Self {
        Self {
            secret: secret.into(),
            access_ttl_seconds,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.secret
    }

    pub fn issue(&self, caller: &Address) -> Result<String, JwtError> {
        issue_access_token(caller, &self.secret, self.access_ttl_seconds)
    }
}

impl std::fmt::Debug for AuthKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthKeys")
            .field("secret", &"[REDACTED]")
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .finish()
    }
}

/// Generate an access token for a ledger address
///
/// # Arguments
/// * `caller` - Address the token authenticates
/// * `secret` - JWT signing secret
/// * `ttl_seconds` - Token time-to-live in seconds
pub fn issue_access_token(caller: &Address, secret: &str, ttl_seconds: i64) -> Result<String, JwtError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(ttl_seconds);

    let claims = Claims {
        sub: caller.to_string(),
        jti: Uuid::new_v4().to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
        token_type: ACCESS_TOKEN_TYPE.to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::EncodingFailed(e.to_string()))
}

/// Verify and decode a JWT token
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
        _ => JwtError::DecodingFailed(e.to_string()),
    })?;

    Ok(token_data.claims)
}
