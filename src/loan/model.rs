//! Loan models for the micro-lending ledger

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Token amount in the smallest unit of the ledger token
pub type Amount = u128;

/// Account identity on the ledger (borrower, owner, or the ledger itself)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Loan record, one per borrower
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    /// Off-ledger correlation id (e.g. cross-chain borrower reference)
    pub external_borrower_id: String,
    pub principal: Amount,
    /// Cumulative amount repaid
    pub repaid_amount: Amount,
    /// Annualized rate, scale 10000
    pub interest_rate_bps: u32,
    /// Unix seconds, fixed at request time
    pub due_date: u64,
    /// Informational only
    pub credit_score: u32,
    pub active: bool,
    pub funded: bool,
}

impl Loan {
    /// A loan accepts repayments and liquidation only while active and funded
    pub fn is_open(&self) -> bool {
        self.active && self.funded
    }

    /// A loan can be funded once, while still active
    pub fn is_fundable(&self) -> bool {
        self.active && !self.funded
    }
}

/// Request to open a loan for a borrower
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoanRequest {
    #[validate(length(min = 1, max = 128))]
    pub external_borrower_id: String,
    pub borrower: Address,
    pub amount: Amount,
    pub interest_rate_bps: u32,
    #[validate(range(min = 1, max = 3650))]
    pub duration_days: u64,
    pub credit_score: u32,
}

/// Status view returned by `get_loan_status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanStatus {
    pub active: bool,
    pub funded: bool,
    pub repaid_amount: Amount,
    pub total_due: Amount,
    pub token_balance: Amount,
}

/// Full view returned by `get_loan_details`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanDetails {
    pub borrower: Address,
    pub external_borrower_id: String,
    pub principal: Amount,
    pub repaid_amount: Amount,
    pub interest_rate_bps: u32,
    pub due_date: u64,
    pub credit_score: u32,
    pub active: bool,
    pub funded: bool,
    pub token_balance: Amount,
}

impl LoanDetails {
    pub fn from_loan(borrower: &Address, loan: &Loan, token_balance: Amount) -> Self {
        Self {
            borrower: borrower.clone(),
            external_borrower_id: loan.external_borrower_id.clone(),
            principal: loan.principal,
            repaid_amount: loan.repaid_amount,
            interest_rate_bps: loan.interest_rate_bps,
            due_date: loan.due_date,
            credit_score: loan.credit_score,
            active: loan.active,
            funded: loan.funded,
            token_balance,
        }
    }
}

/// Outcome of a successful repayment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepaymentReceipt {
    pub amount: Amount,
    /// Outstanding balance captured at call entry
    pub total_due: Amount,
    /// Principal plus interest captured at call entry
    pub obligation: Amount,
    pub repaid_amount: Amount,
    pub fully_repaid: bool,
    pub refund: Amount,
}

/// Outcome of a successful liquidation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiquidationReceipt {
    pub borrower: Address,
    pub external_borrower_id: String,
    pub liquidation_amount: Amount,
}

/// Liquidation eligibility of a loan at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiquidationEligibility {
    pub eligible: bool,
    pub repaid_amount: Amount,
    pub obligation: Amount,
    pub threshold_amount: Amount,
    pub outstanding: Amount,
}

/// Funded loan that is past due or below the liquidation threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelinquentLoan {
    pub borrower: Address,
    pub external_borrower_id: String,
    pub due_date: u64,
    pub outstanding: Amount,
    pub past_due: bool,
    pub liquidatable: bool,
}

/// Repayment body; the borrower is the authenticated caller
#[derive(Debug, Deserialize)]
pub struct RepayRequest {
    pub amount: Amount,
}

/// Owner withdrawal of the ledger's token holdings
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub amount: Amount,
}

/// Token transfer from the authenticated caller
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub to: Address,
    pub amount: Amount,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_loan() -> Loan {
        Loan {
            external_borrower_id: "ext-1".to_string(),
            principal: 1_000,
            repaid_amount: 0,
            interest_rate_bps: 1_000,
            due_date: 2_592_000,
            credit_score: 700,
            active: true,
            funded: false,
        }
    }

    #[test]
    fn test_loan_flags() {
        let mut loan = sample_loan();
        assert!(loan.is_fundable());
        assert!(!loan.is_open());

        loan.funded = true;
        assert!(!loan.is_fundable());
        assert!(loan.is_open());

        loan.active = false;
        assert!(!loan.is_fundable());
        assert!(!loan.is_open());
    }

    #[test]
    fn test_address_serializes_as_plain_string() {
        let address = Address::new("GBORROWER");
        assert_eq!(serde_json::to_string(&address).unwrap(), "\"GBORROWER\"");
        assert_eq!(address.to_string(), "GBORROWER");
    }

    #[test]
    fn test_loan_request_validation() {
        let mut request = LoanRequest {
            external_borrower_id: "ext-1".to_string(),
            borrower: Address::new("GBORROWER"),
            amount: 1_000,
            interest_rate_bps: 500,
            duration_days: 30,
            credit_score: 650,
        };
        assert!(request.validate().is_ok());

        request.duration_days = 0;
        assert!(request.validate().is_err());

        request.duration_days = 30;
        request.external_borrower_id = String::new();
        assert!(request.validate().is_err());
    }
}
