use axum::{extract::State, Json};

use crate::error::ApiError;
use crate::loan::WithdrawRequest;
use crate::middleware::OwnerCaller;
use crate::models::{ApiResponse, LedgerInfo, WithdrawalReceipt};
use crate::state::AppState;

pub async fn get_ledger_info(State(state): State<AppState>) -> Json<ApiResponse<LedgerInfo>> {
    let ledger = &state.ledger;
    Json(ApiResponse::ok(LedgerInfo {
        account: ledger.account().clone(),
        owner: ledger.owner(),
        params: ledger.params().clone(),
        balance: ledger.ledger_balance(),
        token: state.token.metadata().clone(),
        total_supply: state.token.total_supply(),
    }))
}

/// Move ledger-held tokens to the owner
pub async fn withdraw_tokens(
    State(state): State<AppState>,
    OwnerCaller(owner): OwnerCaller,
    Json(request): Json<WithdrawRequest>,
) -> Result<Json<ApiResponse<WithdrawalReceipt>>, ApiError> {
    if request.amount == 0 {
        return Err(ApiError::ValidationError("amount must be positive".to_string()));
    }

    state.ledger.withdraw_tokens(&owner.context(), request.amount)?;

    Ok(Json(ApiResponse::ok(WithdrawalReceipt {
        to: owner.address,
        amount: request.amount,
        ledger_balance: state.ledger.ledger_balance(),
    })))
}
