//! Loan ledger - the loan lifecycle state machine
//!
//! request -> fund -> repay (partial or full, overpayment refunded) or
//! liquidate. One active loan per borrower.
//!
//! All operations are serialized through a reentrant mutex over the loan
//! book. Same-thread re-entry (a token service calling back into the
//! ledger) gets past the mutex and is then rejected by the reentrancy guard,
//! which every mutating operation takes, so nothing writes to the book while
//! a token call is in flight. The book is never borrowed across a token
//! call: effects are written first, the borrow is released, the token
//! service is called, and the prior record is restored if that call fails.
//! Events are published only after the operation commits.

use parking_lot::ReentrantMutex;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::LedgerError;
use crate::gate::{AccessControl, CallContext, ReentrancyGuard};
use crate::loan::calculator;
use crate::loan::events::{EventBus, LoanEvent};
use crate::loan::{
    Address, Amount, DelinquentLoan, LiquidationEligibility, LiquidationReceipt, Loan,
    LoanDetails, LoanRequest, LoanStatus, RepaymentReceipt,
};
use crate::token::TokenService;

type LoanBook = HashMap<Address, Loan>;

/// Parameters fixed at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerParams {
    /// Liquidation allowed while repaid < obligation * pct / 100
    pub liquidation_threshold_pct: u32,
    /// Informational loan-to-value ratio
    pub loan_to_value_pct: u32,
    /// Restrict `fund` to the owner
    pub fund_requires_owner: bool,
    /// Accept repayments above the outstanding amount and refund the excess
    pub accept_overpayment: bool,
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            liquidation_threshold_pct: 80,
            loan_to_value_pct: 75,
            fund_requires_owner: false,
            accept_overpayment: false,
        }
    }
}

/// The loan ledger and its collaborators
pub struct LoanLedger {
    account: Address,
    params: LedgerParams,
    book: ReentrantMutex<RefCell<LoanBook>>,
    guard: ReentrancyGuard,
    token: Arc<dyn TokenService>,
    access: Arc<dyn AccessControl>,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl LoanLedger {
    /// Create a ledger holding tokens under `account`
    pub fn new(
        account: Address,
        params: LedgerParams,
        token: Arc<dyn TokenService>,
        access: Arc<dyn AccessControl>,
        clock: Arc<dyn Clock>,
        events: EventBus,
    ) -> Self {
        Self {
            account,
            params,
            book: ReentrantMutex::new(RefCell::new(HashMap::new())),
            guard: ReentrancyGuard::new(),
            token,
            access,
            clock,
            events,
        }
    }

    pub fn account(&self) -> &Address {
        &self.account
    }

    pub fn params(&self) -> &LedgerParams {
        &self.params
    }

    pub fn owner(&self) -> Address {
        self.access.current_owner()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ===== Mutating operations =====

    /// Open a loan record for `request.borrower`. No tokens move.
    pub fn request_loan(&self, ctx: &CallContext, request: LoanRequest) -> Result<Loan, LedgerError> {
        let book = self.book.lock();
        let _scope = self.guard.acquire()?;
        let now = self.clock.now();
        let due_date = calculator::due_date(now, request.duration_days)?;

        let loan = {
            let mut loans = book.borrow_mut();
            if loans.get(&request.borrower).is_some_and(|l| l.active) {
                tracing::warn!(
                    borrower = %request.borrower,
                    caller = %ctx.caller,
                    "Loan request rejected: borrower already has an active loan"
                );
                return Err(LedgerError::LoanAlreadyActive);
            }

            let loan = Loan {
                external_borrower_id: request.external_borrower_id,
                principal: request.amount,
                repaid_amount: 0,
                interest_rate_bps: request.interest_rate_bps,
                due_date,
                credit_score: request.credit_score,
                active: true,
                funded: false,
            };
            loans.insert(request.borrower.clone(), loan.clone());
            loan
        };

        tracing::info!(
            borrower = %request.borrower,
            caller = %ctx.caller,
            amount = %loan.principal,
            interest_rate_bps = loan.interest_rate_bps,
            due_date = loan.due_date,
            "Loan requested"
        );

        self.events.publish(
            request.borrower.clone(),
            now,
            LoanEvent::LoanRequested {
                borrower: request.borrower,
                amount: loan.principal,
                interest_rate_bps: loan.interest_rate_bps,
            },
        );

        Ok(loan)
    }

    /// Disburse the principal of a requested loan by minting it to the borrower
    pub fn fund_loan(&self, ctx: &CallContext, borrower: &Address) -> Result<Loan, LedgerError> {
        let book = self.book.lock();
        if self.params.fund_requires_owner {
            self.access.assert_owner(&ctx.caller)?;
        }
        let _scope = self.guard.acquire()?;
        let now = self.clock.now();

        let before = {
            let mut loans = book.borrow_mut();
            let loan = match loans.get_mut(borrower) {
                Some(loan) if loan.is_fundable() => loan,
                _ => {
                    tracing::warn!(borrower = %borrower, caller = %ctx.caller, "Loan not fundable");
                    return Err(LedgerError::LoanNotFundable);
                }
            };
            let before = loan.clone();
            loan.funded = true;
            before
        };

        if let Err(e) = self.token.mint(borrower, before.principal) {
            tracing::error!(borrower = %borrower, error = %e, "Mint failed, funding rolled back");
            Self::restore(&book, borrower, before);
            return Err(e.into());
        }

        tracing::info!(
            borrower = %borrower,
            caller = %ctx.caller,
            principal = %before.principal,
            "Loan funded"
        );

        self.events.publish(
            borrower.clone(),
            now,
            LoanEvent::LoanFunded {
                borrower: borrower.clone(),
                principal: before.principal,
            },
        );

        let funded = Loan {
            funded: true,
            ..before
        };
        Ok(funded)
    }

    /// Repay the caller's loan. The outstanding amount is captured once at
    /// entry and used for both the sufficiency and the closing check.
    ///
    /// The loan closes once cumulative repayments reach the gross obligation
    /// (principal plus interest accrued at entry), not the net amount still
    /// outstanding. Any excess over the obligation is the refund: only
    /// `amount - refund` is burned, so the borrower keeps the excess and no
    /// refund mint is needed.
    pub fn repay(&self, ctx: &CallContext, amount: Amount) -> Result<RepaymentReceipt, LedgerError> {
        let book = self.book.lock();
        let _scope = self.guard.acquire()?;
        let borrower = &ctx.caller;
        let now = self.clock.now();

        let (before, after, due, refund) = {
            let mut loans = book.borrow_mut();
            let loan = match loans.get_mut(borrower) {
                Some(loan) if loan.is_open() => loan,
                _ => {
                    tracing::warn!(borrower = %borrower, "Repayment rejected: loan not active or unfunded");
                    return Err(LedgerError::LoanNotActiveOrUnfunded);
                }
            };

            let due = calculator::snapshot(loan, now)?;
            if amount > due.outstanding && !self.params.accept_overpayment {
                tracing::warn!(
                    borrower = %borrower,
                    amount = %amount,
                    total_due = %due.outstanding,
                    "Repayment rejected: exceeds total due"
                );
                return Err(LedgerError::RepaymentExceedsDue {
                    amount,
                    total_due: due.outstanding,
                });
            }

            let before = loan.clone();
            loan.repaid_amount = loan
                .repaid_amount
                .checked_add(amount)
                .ok_or(LedgerError::MathOverflow)?;
            let refund = if loan.repaid_amount >= due.obligation {
                loan.active = false;
                loan.repaid_amount - due.obligation
            } else {
                0
            };
            (before, loan.clone(), due, refund)
        };

        // Excess never leaves the borrower's balance
        if let Err(e) = self.token.burn(borrower, amount - refund) {
            tracing::error!(borrower = %borrower, error = %e, "Burn failed, repayment rolled back");
            Self::restore(&book, borrower, before);
            return Err(e.into());
        }

        let fully_repaid = !after.active;

        tracing::info!(
            borrower = %borrower,
            amount = %amount,
            repaid_amount = %after.repaid_amount,
            total_due = %due.outstanding,
            fully_repaid,
            refund = %refund,
            "Loan repayment recorded"
        );

        self.events.publish(
            borrower.clone(),
            now,
            LoanEvent::LoanRepaid {
                external_borrower_id: after.external_borrower_id.clone(),
                amount,
            },
        );
        if fully_repaid {
            self.events.publish(
                borrower.clone(),
                now,
                LoanEvent::LoanFullyRepaid {
                    external_borrower_id: after.external_borrower_id.clone(),
                },
            );
        }

        Ok(RepaymentReceipt {
            amount,
            total_due: due.outstanding,
            obligation: due.obligation,
            repaid_amount: after.repaid_amount,
            fully_repaid,
            refund,
        })
    }

    /// Write off an under-repaid loan. Owner only; no tokens move.
    pub fn liquidate(&self, ctx: &CallContext, borrower: &Address) -> Result<LiquidationReceipt, LedgerError> {
        let book = self.book.lock();
        if let Err(e) = self.access.assert_owner(&ctx.caller) {
            tracing::warn!(caller = %ctx.caller, borrower = %borrower, "Liquidation rejected: caller is not owner");
            return Err(e);
        }
        let _scope = self.guard.acquire()?;
        let now = self.clock.now();

        let receipt = {
            let mut loans = book.borrow_mut();
            let loan = match loans.get_mut(borrower) {
                Some(loan) if loan.is_open() => loan,
                _ => return Err(LedgerError::LoanNotLiquidatable),
            };

            let due = calculator::snapshot(loan, now)?;
            let threshold =
                calculator::liquidation_threshold(due.obligation, self.params.liquidation_threshold_pct)?;
            if loan.repaid_amount >= threshold {
                tracing::warn!(
                    borrower = %borrower,
                    repaid = %loan.repaid_amount,
                    threshold = %threshold,
                    "Liquidation rejected: repayment coverage above threshold"
                );
                return Err(LedgerError::NotEligibleForLiquidation {
                    repaid: loan.repaid_amount,
                    threshold,
                });
            }

            loan.active = false;
            LiquidationReceipt {
                borrower: borrower.clone(),
                external_borrower_id: loan.external_borrower_id.clone(),
                liquidation_amount: due.outstanding,
            }
        };

        tracing::info!(
            borrower = %borrower,
            liquidation_amount = %receipt.liquidation_amount,
            "Loan liquidated"
        );

        self.events.publish(
            borrower.clone(),
            now,
            LoanEvent::LoanLiquidated {
                external_borrower_id: receipt.external_borrower_id.clone(),
                liquidation_amount: receipt.liquidation_amount,
            },
        );

        Ok(receipt)
    }

    /// Move `amount` of the ledger's own token holdings to the owner
    pub fn withdraw_tokens(&self, ctx: &CallContext, amount: Amount) -> Result<(), LedgerError> {
        let _book = self.book.lock();
        self.access.assert_owner(&ctx.caller)?;
        let _scope = self.guard.acquire()?;

        let available = self.token.balance_of(&self.account);
        if amount > available {
            tracing::warn!(requested = %amount, available = %available, "Withdrawal rejected: insufficient balance");
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available,
            });
        }

        let owner = self.access.current_owner();
        if !self.token.transfer(&self.account, &owner, amount) {
            tracing::error!(owner = %owner, amount = %amount, "Withdrawal transfer failed");
            return Err(LedgerError::TransferFailed);
        }

        tracing::info!(owner = %owner, amount = %amount, "Tokens withdrawn from ledger");
        Ok(())
    }

    // ===== Read queries =====

    pub fn get_loan_status(&self, borrower: &Address) -> Result<Option<LoanStatus>, LedgerError> {
        let now = self.clock.now();
        let loan = match self.loan(borrower) {
            Some(loan) => loan,
            None => return Ok(None),
        };

        Ok(Some(LoanStatus {
            active: loan.active,
            funded: loan.funded,
            repaid_amount: loan.repaid_amount,
            total_due: calculator::total_due(&loan, now)?,
            token_balance: self.token.balance_of(borrower),
        }))
    }

    pub fn get_loan_details(&self, borrower: &Address) -> Option<LoanDetails> {
        self.loan(borrower)
            .map(|loan| LoanDetails::from_loan(borrower, &loan, self.token.balance_of(borrower)))
    }

    /// Outstanding amount at the current time; zero for unknown, inactive or
    /// unfunded loans
    pub fn calculate_total_due(&self, borrower: &Address) -> Result<Amount, LedgerError> {
        match self.loan(borrower) {
            Some(loan) => calculator::total_due(&loan, self.clock.now()),
            None => Ok(0),
        }
    }

    pub fn liquidation_eligibility(&self, borrower: &Address) -> Result<Option<LiquidationEligibility>, LedgerError> {
        let loan = match self.loan(borrower) {
            Some(loan) => loan,
            None => return Ok(None),
        };

        let due = calculator::snapshot(&loan, self.clock.now())?;
        let threshold_amount =
            calculator::liquidation_threshold(due.obligation, self.params.liquidation_threshold_pct)?;

        Ok(Some(LiquidationEligibility {
            eligible: loan.is_open() && loan.repaid_amount < threshold_amount,
            repaid_amount: loan.repaid_amount,
            obligation: due.obligation,
            threshold_amount,
            outstanding: due.outstanding,
        }))
    }

    /// Token balance held by the ledger itself
    pub fn ledger_balance(&self) -> Amount {
        self.token.balance_of(&self.account)
    }

    /// Funded, active loans that are past due or liquidatable now. A loan
    /// whose amounts cannot be computed is logged and left out.
    pub fn delinquent_loans(&self) -> Vec<DelinquentLoan> {
        let book = self.book.lock();
        let loans = book.borrow();
        let now = self.clock.now();

        let mut delinquent = Vec::new();
        for (borrower, loan) in loans.iter().filter(|(_, l)| l.is_open()) {
            let assessed = calculator::snapshot(loan, now).and_then(|due| {
                let liquidatable =
                    calculator::is_liquidatable(loan, now, self.params.liquidation_threshold_pct)?;
                Ok((due.outstanding, liquidatable))
            });
            let (outstanding, liquidatable) = match assessed {
                Ok(assessed) => assessed,
                Err(e) => {
                    tracing::error!(borrower = %borrower, error = %e, "Skipping loan in delinquency scan");
                    continue;
                }
            };

            let past_due = now > loan.due_date;
            if past_due || liquidatable {
                delinquent.push(DelinquentLoan {
                    borrower: borrower.clone(),
                    external_borrower_id: loan.external_borrower_id.clone(),
                    due_date: loan.due_date,
                    outstanding,
                    past_due,
                    liquidatable,
                });
            }
        }
        delinquent.sort_by(|a, b| a.due_date.cmp(&b.due_date));

        delinquent
    }

    // ===== Private helpers =====

    fn loan(&self, borrower: &Address) -> Option<Loan> {
        let book = self.book.lock();
        let loans = book.borrow();
        loans.get(borrower).cloned()
    }

    fn restore(book: &RefCell<LoanBook>, borrower: &Address, loan: Loan) {
        book.borrow_mut().insert(borrower.clone(), loan);
    }
}
