//! Token route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn token_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tokens/:account/balance", get(get_balance))
        .route("/api/tokens/transfer", post(transfer_tokens))
}
