use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::error::{ApiError, LedgerError};
use crate::loan::{
    Address, LiquidationEligibility, LiquidationReceipt, Loan, LoanDetails, LoanLedger,
    LoanRequest, LoanStatus, RepayRequest, RepaymentReceipt,
};
use crate::middleware::{AuthenticatedCaller, OwnerCaller};
use crate::models::{ApiResponse, TotalDue};

pub async fn request_loan(
    State(ledger): State<Arc<LoanLedger>>,
    caller: AuthenticatedCaller,
    Json(request): Json<LoanRequest>,
) -> Result<Json<ApiResponse<Loan>>, ApiError> {
    request.validate()?;
    if request.amount == 0 {
        return Err(ApiError::ValidationError("amount must be positive".to_string()));
    }

    let loan = ledger.request_loan(&caller.context(), request)?;
    Ok(Json(ApiResponse::ok(loan)))
}

pub async fn fund_loan(
    State(ledger): State<Arc<LoanLedger>>,
    caller: AuthenticatedCaller,
    Path(borrower): Path<Address>,
) -> Result<Json<ApiResponse<Loan>>, ApiError> {
    let loan = ledger.fund_loan(&caller.context(), &borrower)?;
    Ok(Json(ApiResponse::ok(loan)))
}

/// Repay the caller's own loan
pub async fn repay_loan(
    State(ledger): State<Arc<LoanLedger>>,
    caller: AuthenticatedCaller,
    Json(request): Json<RepayRequest>,
) -> Result<Json<ApiResponse<RepaymentReceipt>>, ApiError> {
    if request.amount == 0 {
        return Err(ApiError::ValidationError("amount must be positive".to_string()));
    }

    let receipt = ledger.repay(&caller.context(), request.amount)?;
    Ok(Json(ApiResponse::ok(receipt)))
}

pub async fn liquidate_loan(
    State(ledger): State<Arc<LoanLedger>>,
    OwnerCaller(owner): OwnerCaller,
    Path(borrower): Path<Address>,
) -> Result<Json<ApiResponse<LiquidationReceipt>>, ApiError> {
    let receipt = ledger.liquidate(&owner.context(), &borrower)?;
    Ok(Json(ApiResponse::ok(receipt)))
}

pub async fn get_loan(
    State(ledger): State<Arc<LoanLedger>>,
    Path(borrower): Path<Address>,
) -> Result<Json<ApiResponse<LoanDetails>>, ApiError> {
    let details = ledger
        .get_loan_details(&borrower)
        .ok_or(LedgerError::LoanNotFound)?;
    Ok(Json(ApiResponse::ok(details)))
}

pub async fn get_loan_status(
    State(ledger): State<Arc<LoanLedger>>,
    Path(borrower): Path<Address>,
) -> Result<Json<ApiResponse<LoanStatus>>, ApiError> {
    let status = ledger
        .get_loan_status(&borrower)?
        .ok_or(LedgerError::LoanNotFound)?;
    Ok(Json(ApiResponse::ok(status)))
}

/// Zero for unknown borrowers
pub async fn get_total_due(
    State(ledger): State<Arc<LoanLedger>>,
    Path(borrower): Path<Address>,
) -> Result<Json<ApiResponse<TotalDue>>, ApiError> {
    let total_due = ledger.calculate_total_due(&borrower)?;
    Ok(Json(ApiResponse::ok(TotalDue { borrower, total_due })))
}

pub async fn get_liquidation_eligibility(
    State(ledger): State<Arc<LoanLedger>>,
    Path(borrower): Path<Address>,
) -> Result<Json<ApiResponse<LiquidationEligibility>>, ApiError> {
    let eligibility = ledger
        .liquidation_eligibility(&borrower)?
        .ok_or(LedgerError::LoanNotFound)?;
    Ok(Json(ApiResponse::ok(eligibility)))
}
