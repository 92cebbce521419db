//! Ledger info and treasury route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn treasury_routes() -> Router<AppState> {
    Router::new()
        .route("/api/ledger", get(get_ledger_info))
        .route("/api/treasury/withdraw", post(withdraw_tokens))
}
