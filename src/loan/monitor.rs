//! Background scan for past-due and liquidatable loans

use std::sync::Arc;
use std::time::Duration;

use crate::loan::{DelinquentLoan, LoanLedger};

/// Run one scan and log what it finds
pub fn scan(ledger: &LoanLedger) -> Vec<DelinquentLoan> {
    let delinquent = ledger.delinquent_loans();
    for loan in &delinquent {
        tracing::warn!(
            borrower = %loan.borrower,
            external_borrower_id = %loan.external_borrower_id,
            due_date = loan.due_date,
            outstanding = %loan.outstanding,
            past_due = loan.past_due,
            liquidatable = loan.liquidatable,
            "Delinquent loan"
        );
    }
    delinquent
}

/// Periodically report delinquent loans. Never liquidates on its own.
pub async fn delinquency_monitor(ledger: Arc<LoanLedger>, period: Duration) {
    tracing::info!(period_secs = period.as_secs(), "Starting delinquency monitor");

    loop {
        tokio::time::sleep(period).await;

        let delinquent = scan(&ledger);
        tracing::debug!(count = delinquent.len(), "Delinquency scan complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::gate::{CallContext, Ownable};
    use crate::loan::{Address, EventBus, LedgerParams, LoanRequest};
    use crate::token::LedgerToken;

    #[test]
    fn test_scan_reports_past_due_loans() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let ledger = LoanLedger::new(
            Address::new("ledger"),
            LedgerParams::default(),
            Arc::new(LedgerToken::default()),
            Arc::new(Ownable::new(Address::new("owner"))),
            clock.clone(),
            EventBus::default(),
        );
        let borrower = Address::new("borrower");
        let ctx = CallContext::new(borrower.clone());

        ledger
            .request_loan(
                &ctx,
                LoanRequest {
                    external_borrower_id: "ext-1".to_string(),
                    borrower: borrower.clone(),
                    amount: 1_000,
                    interest_rate_bps: 1_000,
                    duration_days: 30,
                    credit_score: 700,
                },
            )
            .unwrap();

        // Unfunded loans are never delinquent
        clock.advance(31 * 86_400);
        assert!(scan(&ledger).is_empty());

        ledger.fund_loan(&ctx, &borrower).unwrap();
        let found = scan(&ledger);
        assert_eq!(found.len(), 1);
        assert!(found[0].past_due);
        assert!(found[0].liquidatable);
        assert_eq!(found[0].borrower, borrower);
    }
}
