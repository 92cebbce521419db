//! Authentication extractors
//!
//! Verify the Bearer JWT and turn its subject into the ledger's calling
//! principal.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use std::sync::Arc;

use crate::auth::{verify_token, AuthKeys, JwtError, ACCESS_TOKEN_TYPE};
use crate::error::ApiError;
use crate::gate::CallContext;
use crate::loan::{Address, LoanLedger};

/// Caller authenticated by an access token
#[derive(Debug, Clone)]
pub struct AuthenticatedCaller {
    pub address: Address,
    pub jti: String,
}

impl AuthenticatedCaller {
    pub fn context(&self) -> CallContext {
        CallContext::new(self.address.clone())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedCaller
where
    Arc<AuthKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::Unauthorized("Authorization header with Bearer token required".to_string())
                })?;

        let keys = Arc::<AuthKeys>::from_ref(state);

        let claims = verify_token(bearer.token(), keys.jwt_secret()).map_err(|e| match e {
            JwtError::TokenExpired => ApiError::Unauthorized("Token has expired".to_string()),
            _ => ApiError::Unauthorized("Invalid token".to_string()),
        })?;

        if claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(ApiError::Unauthorized("Expected access token".to_string()));
        }
        if claims.sub.trim().is_empty() {
            return Err(ApiError::Unauthorized("Token has no subject".to_string()));
        }

        Ok(AuthenticatedCaller {
            address: claims.caller(),
            jti: claims.jti,
        })
    }
}

/// Authenticated caller who is the current ledger owner. The ledger checks
/// ownership again; this rejects early at the edge.
#[derive(Debug, Clone)]
pub struct OwnerCaller(pub AuthenticatedCaller);

#[async_trait]
impl<S> FromRequestParts<S> for OwnerCaller
where
    Arc<AuthKeys>: FromRef<S>,
    Arc<LoanLedger>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let caller = AuthenticatedCaller::from_request_parts(parts, state).await?;
        let ledger = Arc::<LoanLedger>::from_ref(state);

        if ledger.owner() != caller.address {
            tracing::warn!(caller = %caller.address, "Owner-only route called by non-owner");
            return Err(crate::error::LedgerError::NotOwner.into());
        }

        Ok(OwnerCaller(caller))
    }
}
