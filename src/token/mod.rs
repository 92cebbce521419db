//! Token service consumed by the loan ledger
//!
//! The ledger never keeps token accounting itself. It mints principal and
//! refunds, burns repayments and moves its own holdings through this trait.

mod ledger_token;

pub use ledger_token::{LedgerToken, TokenMetadata};

use thiserror::Error;

use crate::loan::{Address, Amount};

/// Token service errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Insufficient token balance for {account}: available {available}, required {required}")]
    InsufficientBalance {
        account: Address,
        available: Amount,
        required: Amount,
    },

    #[error("Token supply overflow")]
    SupplyOverflow,
}

/// Fungible token operations the ledger depends on
pub trait TokenService: Send + Sync {
    fn mint(&self, to: &Address, amount: Amount) -> Result<(), TokenError>;

    fn burn(&self, from: &Address, amount: Amount) -> Result<(), TokenError>;

    fn balance_of(&self, account: &Address) -> Amount;

    /// Returns `false` instead of erroring when the transfer cannot be made
    fn transfer(&self, from: &Address, to: &Address, amount: Amount) -> bool;
}
