use axum::{extract::State, Json};

use crate::models::HealthResponse;
use crate::state::AppState;

pub async fn root() -> &'static str {
    "MicroLend Ledger API Server"
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let audit_log = match &state.audit {
        None => "disabled".to_string(),
        Some(audit) => match audit.check_health().await {
            Ok(()) => "connected".to_string(),
            Err(e) => format!("error: {}", e),
        },
    };

    let status = if audit_log.starts_with("error") {
        "degraded"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        audit_log,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
