//! Loan route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn loan_routes() -> Router<AppState> {
    Router::new()
        .route("/api/loans", post(request_loan))
        .route("/api/loans/repay", post(repay_loan))
        .route("/api/loans/:borrower", get(get_loan))
        .route("/api/loans/:borrower/status", get(get_loan_status))
        .route("/api/loans/:borrower/total-due", get(get_total_due))
        .route("/api/loans/:borrower/liquidation", get(get_liquidation_eligibility))
        .route("/api/loans/:borrower/fund", post(fund_loan))
        .route("/api/loans/:borrower/liquidate", post(liquidate_loan))
}
