use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::error::{ApiError, LedgerError};
use crate::loan::{Address, TransferRequest};
use crate::middleware::AuthenticatedCaller;
use crate::models::{ApiResponse, TokenBalance, TransferReceipt};
use crate::token::{LedgerToken, TokenService};

pub async fn get_balance(
    State(token): State<Arc<LedgerToken>>,
    Path(account): Path<Address>,
) -> Json<ApiResponse<TokenBalance>> {
    let balance = token.balance_of(&account);
    Json(ApiResponse::ok(TokenBalance { account, balance }))
}

/// Transfer from the caller's own balance, e.g. to the ledger account
pub async fn transfer_tokens(
    State(token): State<Arc<LedgerToken>>,
    caller: AuthenticatedCaller,
    Json(request): Json<TransferRequest>,
) -> Result<Json<ApiResponse<TransferReceipt>>, ApiError> {
    if request.amount == 0 {
        return Err(ApiError::ValidationError("amount must be positive".to_string()));
    }

    if !token.transfer(&caller.address, &request.to, request.amount) {
        let available = token.balance_of(&caller.address);
        if available < request.amount {
            return Err(LedgerError::InsufficientBalance {
                requested: request.amount,
                available,
            }
            .into());
        }
        return Err(LedgerError::TransferFailed.into());
    }

    Ok(Json(ApiResponse::ok(TransferReceipt {
        from: caller.address,
        to: request.to,
        amount: request.amount,
    })))
}
