//! MicroLend Ledger Server
//!
//! HTTP and WebSocket front end for the micro-lending ledger: loan requests,
//! funding, repayment, liquidation and the treasury, backed by the in-memory
//! ledger token.
//!
//! `microlend-server issue-token <address>` prints an access token for
//! `<address>` signed with the configured secret, then exits.

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use microlend_ledger::audit::AuditLog;
use microlend_ledger::auth::AuthKeys;
use microlend_ledger::clock::SystemClock;
use microlend_ledger::config::Config;
use microlend_ledger::gate::Ownable;
use microlend_ledger::loan::{delinquency_monitor, Address, EventBus, LoanLedger};
use microlend_ledger::middleware::{self, RateLimiter};
use microlend_ledger::routes;
use microlend_ledger::state::AppState;
use microlend_ledger::token::LedgerToken;
use microlend_ledger::websocket::WsState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let auth = Arc::new(AuthKeys::new(
        config.jwt_secret.clone(),
        config.jwt_access_token_ttl_seconds,
    ));

    let mut args = std::env::args().skip(1);
    if args.next().as_deref() == Some("issue-token") {
        let address = args.next().context("usage: microlend-server issue-token <address>")?;
        let token = auth.issue(&Address::new(address))?;
        println!("{}", token);
        return Ok(());
    }

    tracing::info!(
        environment = config.environment.as_str(),
        owner = %config.owner_address,
        ledger = %config.ledger_address,
        "Starting MicroLend ledger"
    );

    let token = Arc::new(LedgerToken::new(config.token_metadata.clone()));
    let events = EventBus::default();

    let ledger = Arc::new(LoanLedger::new(
        config.ledger_address.clone(),
        config.ledger_params.clone(),
        token.clone(),
        Arc::new(Ownable::new(config.owner_address.clone())),
        Arc::new(SystemClock),
        events.clone(),
    ));

    let audit = match &config.database_url {
        Some(url) => {
            tracing::info!(
                "Connecting audit log at {}",
                config.database_url_masked().unwrap_or_default()
            );
            let audit = AuditLog::connect(url, 5)
                .await
                .context("Failed to connect audit log")?;
            tokio::spawn(audit.clone().run(events.subscribe()));
            Some(audit)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, audit log disabled");
            None
        }
    };

    let ledger_monitor = ledger.clone();
    let monitor_period = Duration::from_secs(config.monitor_interval_seconds);
    tokio::spawn(async move {
        delinquency_monitor(ledger_monitor, monitor_period).await;
    });

    let ws_state = WsState::new(events);
    let app_state = AppState::new(ledger, token, auth, ws_state, audit);

    let rate_limiter = RateLimiter::new(config.rate_limit_rps);
    tokio::spawn(rate_limiter.clone().run_eviction(Duration::from_secs(300)));

    // Outermost first
    let mut app = routes::app_router(app_state).layer(
        ServiceBuilder::new()
            .layer(configure_cors(config.cors_allowed_origins.as_deref()))
            .layer(axum::middleware::from_fn(middleware::rate_limit_layer(
                rate_limiter,
            )))
            .layer(axum::middleware::from_fn(middleware::request_tracing))
            .layer(axum::middleware::from_fn(middleware::security_headers)),
    );

    if config.environment.is_production() {
        app = app.layer(axum::middleware::from_fn(middleware::hsts_header));
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let allowed_origins = allowed_origins.unwrap_or_default();

    if allowed_origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
