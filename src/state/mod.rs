//! Application state shared across handlers

use axum::extract::FromRef;
use std::sync::Arc;

use crate::audit::AuditLog;
use crate::auth::AuthKeys;
use crate::loan::LoanLedger;
use crate::token::LedgerToken;
use crate::websocket::WsState;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LoanLedger>,
    pub token: Arc<LedgerToken>,
    pub auth: Arc<AuthKeys>,
    pub ws_state: WsState,
    pub audit: Option<AuditLog>,
}

impl AppState {
    pub fn new(
        ledger: Arc<LoanLedger>,
        token: Arc<LedgerToken>,
        auth: Arc<AuthKeys>,
        ws_state: WsState,
        audit: Option<AuditLog>,
    ) -> Self {
        Self {
            ledger,
            token,
            auth,
            ws_state,
            audit,
        }
    }
}

impl FromRef<AppState> for WsState {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.ws_state.clone()
    }
}

impl FromRef<AppState> for Arc<LoanLedger> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.ledger.clone()
    }
}

impl FromRef<AppState> for Arc<LedgerToken> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.token.clone()
    }
}

impl FromRef<AppState> for Arc<AuthKeys> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth.clone()
    }
}
