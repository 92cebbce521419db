//! HTTP API tests driving the router directly

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use microlend_ledger::auth::{AuthKeys, Claims, ACCESS_TOKEN_TYPE};
use microlend_ledger::clock::ManualClock;
use microlend_ledger::gate::Ownable;
use microlend_ledger::loan::{Address, EventBus, LedgerParams, LoanLedger};
use microlend_ledger::routes::app_router;
use microlend_ledger::state::AppState;
use microlend_ledger::token::{LedgerToken, TokenService};
use microlend_ledger::websocket::WsState;

const SECRET: &str = "api-test-secret";
const START: u64 = 1_700_000_000;
const DAY: u64 = 86_400;

struct TestApp {
    router: Router,
    token: Arc<LedgerToken>,
    clock: Arc<ManualClock>,
    keys: AuthKeys,
}

impl TestApp {
    fn new() -> Self {
        let token = Arc::new(LedgerToken::default());
        let clock = Arc::new(ManualClock::new(START));
        let events = EventBus::default();
        let ledger = Arc::new(LoanLedger::new(
            Address::new("ledger"),
            LedgerParams::default(),
            token.clone(),
            Arc::new(Ownable::new(Address::new("owner"))),
            clock.clone(),
            events.clone(),
        ));
        let keys = AuthKeys::new(SECRET, 900);
        let state = AppState::new(
            ledger,
            token.clone(),
            Arc::new(keys.clone()),
            WsState::new(events),
            None,
        );

        Self {
            router: app_router(state),
            token,
            clock,
            keys,
        }
    }

    fn bearer(&self, address: &str) -> String {
        format!("Bearer {}", self.keys.issue(&Address::new(address)).unwrap())
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn post(&self, uri: &str, caller: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(caller) = caller {
            builder = builder.header(header::AUTHORIZATION, self.bearer(caller));
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn open_funded_loan(&self, borrower: &str) {
        let (status, _) = self
            .post("/api/loans", Some(borrower), loan_body(borrower, 1_000))
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = self
            .post(&format!("/api/loans/{}/fund", borrower), Some(borrower), json!({}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}

fn loan_body(borrower: &str, amount: u64) -> Value {
    json!({
        "external_borrower_id": format!("ext-{}", borrower),
        "borrower": borrower,
        "amount": amount,
        "interest_rate_bps": 1000,
        "duration_days": 30,
        "credit_score": 700
    })
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["audit_log"], "disabled");
}

#[tokio::test]
async fn test_mutations_require_token() {
    let app = TestApp::new();

    let (status, body) = app.post("/api/loans", None, loan_body("alice", 1_000)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let request = Request::builder()
        .method("POST")
        .uri("/api/loans/repay")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::from(json!({"amount": 1}).to_string()))
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rejects_token_of_other_type() {
    let app = TestApp::new();
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: "alice".to_string(),
        jti: "refresh-1".to_string(),
        iat: now,
        exp: now + 900,
        token_type: "refresh".to_string(),
    };
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();
    assert_ne!(claims.token_type, ACCESS_TOKEN_TYPE);

    let request = Request::builder()
        .method("POST")
        .uri("/api/loans")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(loan_body("alice", 1_000).to_string()))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_loan_lifecycle_over_http() {
    let app = TestApp::new();
    app.open_funded_loan("alice").await;

    let (status, body) = app.get("/api/loans/alice/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["funded"], true);
    assert_eq!(body["data"]["token_balance"], 1000);
    assert_eq!(body["data"]["total_due"], 1000);

    app.clock.set(START + 30 * DAY);
    let (_, body) = app.get("/api/loans/alice/total-due").await;
    assert_eq!(body["data"]["total_due"], 1008);

    app.token.mint(&Address::new("alice"), 8).unwrap();
    let (status, body) = app
        .post("/api/loans/repay", Some("alice"), json!({"amount": 1008}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fully_repaid"], true);
    assert_eq!(body["data"]["refund"], 0);

    let (_, body) = app.get("/api/loans/alice").await;
    assert_eq!(body["data"]["active"], false);
    assert_eq!(body["data"]["repaid_amount"], 1008);
}

#[tokio::test]
async fn test_request_validation() {
    let app = TestApp::new();

    let mut body = loan_body("alice", 1_000);
    body["duration_days"] = json!(0);
    let (status, response) = app.post("/api/loans", Some("alice"), body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .post("/api/loans", Some("alice"), loan_body("alice", 0))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ledger_errors_map_to_status_codes() {
    let app = TestApp::new();
    app.open_funded_loan("alice").await;

    let (status, body) = app
        .post("/api/loans", Some("alice"), loan_body("alice", 10))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "LOAN_ALREADY_ACTIVE");

    let (status, body) = app
        .post("/api/loans/alice/fund", Some("alice"), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "LOAN_NOT_FUNDABLE");

    let (status, body) = app
        .post("/api/loans/repay", Some("alice"), json!({"amount": 5000}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "REPAYMENT_EXCEEDS_DUE");

    let (status, body) = app.get("/api/loans/nobody").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "LOAN_NOT_FOUND");

    let (_, body) = app.get("/api/loans/nobody/total-due").await;
    assert_eq!(body["data"]["total_due"], 0);
}

#[tokio::test]
async fn test_liquidation_is_owner_only() {
    let app = TestApp::new();
    app.open_funded_loan("alice").await;

    let (status, body) = app
        .post("/api/loans/alice/liquidate", Some("alice"), json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "NOT_OWNER");

    let (_, body) = app.get("/api/loans/alice/liquidation").await;
    assert_eq!(body["data"]["eligible"], true);

    let (status, body) = app
        .post("/api/loans/alice/liquidate", Some("owner"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["liquidation_amount"], 1000);

    let (_, body) = app.get("/api/loans/alice").await;
    assert_eq!(body["data"]["active"], false);
}

#[tokio::test]
async fn test_transfer_and_withdraw() {
    let app = TestApp::new();
    app.open_funded_loan("alice").await;

    let (status, body) = app
        .post("/api/tokens/transfer", Some("alice"), json!({"to": "ledger", "amount": 400}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["amount"], 400);

    let (_, body) = app.get("/api/ledger").await;
    assert_eq!(body["data"]["balance"], 400);
    assert_eq!(body["data"]["owner"], "owner");
    assert_eq!(body["data"]["params"]["liquidation_threshold_pct"], 80);

    let (status, body) = app
        .post("/api/treasury/withdraw", Some("owner"), json!({"amount": 401}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_BALANCE");

    let (status, _) = app
        .post("/api/treasury/withdraw", Some("alice"), json!({"amount": 1}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post("/api/treasury/withdraw", Some("owner"), json!({"amount": 250}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ledger_balance"], 150);

    let (_, body) = app.get("/api/tokens/owner/balance").await;
    assert_eq!(body["data"]["balance"], 250);
    assert_eq!(app.token.balance_of(&Address::new("alice")), 600);
}
