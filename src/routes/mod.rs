//! Route definitions for the ledger API

mod loan;
mod token;
mod treasury;

pub use loan::loan_routes;
pub use token::token_routes;
pub use treasury::treasury_routes;

use axum::{routing::get, Router};

use crate::handlers::{health_check, root};
use crate::state::AppState;
use crate::websocket;

/// Full application router without transport layers
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/ws", get(websocket::ws_handler))
        .merge(loan_routes())
        .merge(treasury_routes())
        .merge(token_routes())
        .with_state(state)
}
