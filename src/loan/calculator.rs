//! Interest and liquidation arithmetic
//!
//! Pure functions of a loan snapshot and the current time. Interest is simple
//! and linear, annualized with a 365-day year, and truncated by integer
//! division. Accrual always starts 30 days before the due date, whatever
//! duration the borrower requested.

use crate::error::LedgerError;
use crate::loan::{Amount, Loan};

pub const SECONDS_PER_DAY: u64 = 86_400;
pub const SECONDS_PER_YEAR: u64 = 365 * SECONDS_PER_DAY;
/// Nominal accrual window used to back-derive the accrual start
pub const ACCRUAL_WINDOW_DAYS: u64 = 30;
pub const BPS_SCALE: u128 = 10_000;

/// Amounts owed on a loan at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueSnapshot {
    pub at: u64,
    pub interest: Amount,
    /// Principal plus accrued interest
    pub obligation: Amount,
    /// Obligation net of repayments, floored at zero
    pub outstanding: Amount,
}

impl DueSnapshot {
    fn zero(at: u64) -> Self {
        Self {
            at,
            interest: 0,
            obligation: 0,
            outstanding: 0,
        }
    }
}

/// `requested_at + duration_days` days
pub fn due_date(requested_at: u64, duration_days: u64) -> Result<u64, LedgerError> {
    duration_days
        .checked_mul(SECONDS_PER_DAY)
        .and_then(|secs| requested_at.checked_add(secs))
        .ok_or(LedgerError::MathOverflow)
}

pub fn accrual_start(loan: &Loan) -> u64 {
    loan.due_date
        .saturating_sub(ACCRUAL_WINDOW_DAYS * SECONDS_PER_DAY)
}

/// `principal * rate * elapsed / (year * 10000)`, zero before accrual starts
pub fn accrued_interest(loan: &Loan, now: u64) -> Result<Amount, LedgerError> {
    let elapsed = now.saturating_sub(accrual_start(loan));
    if elapsed == 0 {
        return Ok(0);
    }

    // rate * elapsed < 2^96, so only the multiplication by principal can overflow
    let rate_time = loan.interest_rate_bps as u128 * elapsed as u128;
    mul_div_floor(loan.principal, rate_time, SECONDS_PER_YEAR as u128 * BPS_SCALE)
}

/// `floor(a * b / d)` without forming `a * b`. Fails only when the quotient
/// itself does not fit.
///
/// With `a = qa*d + ra` and `b = qb*d + rb`:
/// `a*b/d = a*qb + qa*rb + ra*rb/d`, and `ra*rb < d^2` fits for any `d`
/// below 2^64.
fn mul_div_floor(a: u128, b: u128, d: u128) -> Result<u128, LedgerError> {
    let (qa, ra) = (a / d, a % d);
    let (qb, rb) = (b / d, b % d);

    a.checked_mul(qb)
        .and_then(|v| v.checked_add(qa.checked_mul(rb)?))
        .and_then(|v| v.checked_add(ra * rb / d))
        .ok_or(LedgerError::MathOverflow)
}

/// Everything owed at `now`. Inactive or unfunded loans owe nothing.
pub fn snapshot(loan: &Loan, now: u64) -> Result<DueSnapshot, LedgerError> {
    if !loan.is_open() {
        return Ok(DueSnapshot::zero(now));
    }

    let interest = accrued_interest(loan, now)?;
    let obligation = loan
        .principal
        .checked_add(interest)
        .ok_or(LedgerError::MathOverflow)?;

    Ok(DueSnapshot {
        at: now,
        interest,
        obligation,
        outstanding: obligation.saturating_sub(loan.repaid_amount),
    })
}

/// Outstanding amount at `now`
pub fn total_due(loan: &Loan, now: u64) -> Result<Amount, LedgerError> {
    Ok(snapshot(loan, now)?.outstanding)
}

/// `obligation * pct / 100`, truncating
pub fn liquidation_threshold(obligation: Amount, threshold_pct: u32) -> Result<Amount, LedgerError> {
    obligation
        .checked_mul(threshold_pct as u128)
        .map(|v| v / 100)
        .ok_or(LedgerError::MathOverflow)
}

/// Liquidation is allowed only while repayments cover less than the
/// threshold fraction of the obligation
pub fn is_liquidatable(loan: &Loan, now: u64, threshold_pct: u32) -> Result<bool, LedgerError> {
    if !loan.is_open() {
        return Ok(false);
    }
    let due = snapshot(loan, now)?;
    let threshold = liquidation_threshold(due.obligation, threshold_pct)?;
    Ok(loan.repaid_amount < threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = SECONDS_PER_DAY;
    const START: u64 = 1_700_000_000;

    fn funded_loan(principal: Amount, rate_bps: u32, duration_days: u64) -> Loan {
        Loan {
            external_borrower_id: "ext-1".to_string(),
            principal,
            repaid_amount: 0,
            interest_rate_bps: rate_bps,
            due_date: due_date(START, duration_days).unwrap(),
            credit_score: 700,
            active: true,
            funded: true,
        }
    }

    #[test]
    fn test_due_date() {
        assert_eq!(due_date(START, 30).unwrap(), START + 30 * DAY);
        assert_eq!(due_date(u64::MAX, 1), Err(LedgerError::MathOverflow));
        assert_eq!(due_date(0, u64::MAX), Err(LedgerError::MathOverflow));
    }

    #[test]
    fn test_thirty_day_loan_at_due_date() {
        // 1000 * 1000 * 2592000 / (31536000 * 10000) = 8.21..
        let loan = funded_loan(1_000, 1_000, 30);
        let due = snapshot(&loan, loan.due_date).unwrap();
        assert_eq!(due.interest, 8);
        assert_eq!(due.obligation, 1_008);
        assert_eq!(due.outstanding, 1_008);

        let loan = funded_loan(10_000, 1_000, 30);
        assert_eq!(total_due(&loan, loan.due_date).unwrap(), 10_082);
    }

    #[test]
    fn test_full_year_of_interest() {
        let loan = funded_loan(1_000_000, 500, 30);
        let one_year_later = accrual_start(&loan) + SECONDS_PER_YEAR;
        assert_eq!(accrued_interest(&loan, one_year_later).unwrap(), 50_000);
    }

    #[test]
    fn test_no_interest_before_accrual_start() {
        // A 90-day loan starts accruing 60 days after the request
        let loan = funded_loan(1_000, 1_000, 90);
        assert_eq!(accrual_start(&loan), START + 60 * DAY);
        assert_eq!(accrued_interest(&loan, START).unwrap(), 0);
        assert_eq!(accrued_interest(&loan, START + 60 * DAY).unwrap(), 0);
        assert_eq!(total_due(&loan, START + 30 * DAY).unwrap(), 1_000);
    }

    #[test]
    fn test_short_loan_accrues_from_before_request() {
        // A 10-day loan has an accrual start 20 days before the request
        let loan = funded_loan(1_000_000, 1_000, 10);
        assert_eq!(accrual_start(&loan), START - 20 * DAY);
        assert!(accrued_interest(&loan, START).unwrap() > 0);
    }

    #[test]
    fn test_inactive_or_unfunded_owes_nothing() {
        let mut loan = funded_loan(1_000, 1_000, 30);
        loan.funded = false;
        assert_eq!(total_due(&loan, loan.due_date).unwrap(), 0);

        loan.funded = true;
        loan.active = false;
        assert_eq!(total_due(&loan, loan.due_date).unwrap(), 0);
    }

    #[test]
    fn test_outstanding_nets_repayments_and_floors_at_zero() {
        let mut loan = funded_loan(1_000, 1_000, 30);
        loan.repaid_amount = 500;
        assert_eq!(total_due(&loan, loan.due_date).unwrap(), 508);

        loan.repaid_amount = 5_000;
        assert_eq!(total_due(&loan, loan.due_date).unwrap(), 0);
    }

    #[test]
    fn test_snapshot_is_deterministic() {
        let loan = funded_loan(123_456, 777, 45);
        let now = START + 40 * DAY;
        assert_eq!(snapshot(&loan, now).unwrap(), snapshot(&loan, now).unwrap());
    }

    #[test]
    fn test_large_principal_does_not_overflow() {
        // 1e9 tokens at 18 decimals, 100% a year, 400 days in
        let principal: Amount = 1_000_000_000 * 10u128.pow(18);
        let loan = funded_loan(principal, 10_000, 30);
        let now = accrual_start(&loan) + 400 * DAY;

        assert_eq!(accrued_interest(&loan, now).unwrap(), principal * 400 / 365);
        let due = snapshot(&loan, now).unwrap();
        assert_eq!(due.obligation, principal + principal * 400 / 365);
        assert!(is_liquidatable(&loan, now, 80).unwrap());
    }

    #[test]
    fn test_mul_div_floor_matches_direct_product() {
        let d = SECONDS_PER_YEAR as u128 * BPS_SCALE;
        for (a, b) in [
            (0, 5),
            (1_000, 1_000 * 30 * DAY as u128),
            (123_456_789, 777 * 40 * DAY as u128),
            (d - 1, d - 1),
            (d * 3 + 17, d + 5),
        ] {
            assert_eq!(mul_div_floor(a, b, d).unwrap(), a * b / d);
        }
    }

    #[test]
    fn test_interest_overflow_is_reported() {
        let loan = funded_loan(Amount::MAX / 2, u32::MAX, 30);
        assert_eq!(
            accrued_interest(&loan, loan.due_date),
            Err(LedgerError::MathOverflow)
        );
    }

    #[test]
    fn test_liquidation_threshold() {
        assert_eq!(liquidation_threshold(1_008, 80).unwrap(), 806);
        assert_eq!(liquidation_threshold(1_000, 100).unwrap(), 1_000);
        assert_eq!(
            liquidation_threshold(Amount::MAX, 80),
            Err(LedgerError::MathOverflow)
        );
    }

    #[test]
    fn test_is_liquidatable_boundary() {
        let mut loan = funded_loan(1_000, 1_000, 30);
        let now = loan.due_date;

        loan.repaid_amount = 805;
        assert!(is_liquidatable(&loan, now, 80).unwrap());

        loan.repaid_amount = 806;
        assert!(!is_liquidatable(&loan, now, 80).unwrap());

        loan.funded = false;
        loan.repaid_amount = 0;
        assert!(!is_liquidatable(&loan, now, 80).unwrap());
    }
}
