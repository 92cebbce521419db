//! API response envelopes and views

use serde::Serialize;

use crate::loan::{Address, Amount, LedgerParams};
use crate::token::TokenMetadata;

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Ledger configuration and holdings
#[derive(Debug, Serialize)]
pub struct LedgerInfo {
    pub account: Address,
    pub owner: Address,
    pub params: LedgerParams,
    pub balance: Amount,
    pub token: TokenMetadata,
    pub total_supply: Amount,
}

#[derive(Debug, Serialize)]
pub struct TokenBalance {
    pub account: Address,
    pub balance: Amount,
}

#[derive(Debug, Serialize)]
pub struct TransferReceipt {
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
}

#[derive(Debug, Serialize)]
pub struct WithdrawalReceipt {
    pub to: Address,
    pub amount: Amount,
    pub ledger_balance: Amount,
}

#[derive(Debug, Serialize)]
pub struct TotalDue {
    pub borrower: Address,
    pub total_due: Amount,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub audit_log: String,
    pub version: String,
}
