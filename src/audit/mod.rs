//! Postgres audit log of committed ledger events
//!
//! Enabled when `DATABASE_URL` is set. A background task drains the event
//! bus into the `loan_events` table; the ledger itself never waits on it.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::loan::EventEnvelope;

/// Audit log errors
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Failed to connect to database: {0}")]
    ConnectionError(String),

    #[error("Failed to prepare audit schema: {0}")]
    SchemaError(String),

    #[error("Failed to write audit record: {0}")]
    WriteError(String),

    #[error("Failed to encode event: {0}")]
    EncodeError(String),
}

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS loan_events (
    id UUID PRIMARY KEY,
    sequence BIGINT NOT NULL,
    occurred_at TIMESTAMPTZ NOT NULL,
    borrower TEXT NOT NULL,
    kind TEXT NOT NULL,
    payload JSONB NOT NULL,
    recorded_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS loan_events_borrower_idx ON loan_events (borrower, sequence)";

/// Writer for the `loan_events` table
#[derive(Clone)]
pub struct AuditLog {
    pool: PgPool,
}

impl AuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the table exists
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AuditError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AuditError::ConnectionError(e.to_string()))?;

        let log = Self::new(pool);
        log.ensure_schema().await?;
        tracing::info!("Audit log connected");
        Ok(log)
    }

    pub async fn ensure_schema(&self) -> Result<(), AuditError> {
        for statement in [CREATE_TABLE, CREATE_INDEX] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AuditError::SchemaError(e.to_string()))?;
        }
        Ok(())
    }

    pub async fn record(&self, envelope: &EventEnvelope) -> Result<(), AuditError> {
        let payload = serde_json::to_string(&envelope.event)
            .map_err(|e| AuditError::EncodeError(e.to_string()))?;
        let occurred_at = DateTime::<Utc>::from_timestamp(envelope.occurred_at as i64, 0)
            .ok_or_else(|| AuditError::EncodeError("timestamp out of range".to_string()))?;

        sqlx::query(
            "INSERT INTO loan_events (id, sequence, occurred_at, borrower, kind, payload) \
             VALUES ($1, $2, $3, $4, $5, $6::jsonb)",
        )
        .bind(Uuid::new_v4())
        .bind(envelope.sequence as i64)
        .bind(occurred_at)
        .bind(envelope.borrower.as_str())
        .bind(envelope.event.kind())
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| AuditError::WriteError(e.to_string()))?;

        Ok(())
    }

    pub async fn check_health(&self) -> Result<(), AuditError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AuditError::ConnectionError(e.to_string()))?;
        Ok(())
    }

    /// Number of recorded events for a borrower
    pub async fn count_for(&self, borrower: &str) -> Result<i64, AuditError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM loan_events WHERE borrower = $1")
            .bind(borrower)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AuditError::WriteError(e.to_string()))?;
        Ok(count)
    }

    /// Drain the event stream until the bus closes. Write failures are
    /// logged and skipped.
    pub async fn run(self, mut rx: broadcast::Receiver<EventEnvelope>) {
        tracing::info!("Starting audit log writer");

        loop {
            match rx.recv().await {
                Ok(envelope) => {
                    if let Err(e) = self.record(&envelope).await {
                        tracing::error!(sequence = envelope.sequence, "Error writing audit record: {}", e);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Audit log fell behind the event stream");
                }
                Err(RecvError::Closed) => break,
            }
        }

        tracing::info!("Audit log writer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::{Address, LoanEvent};

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_record_event() {
        let url = std::env::var("TEST_DATABASE_URL").unwrap();
        let log = AuditLog::connect(&url, 2).await.unwrap();
        let borrower = format!("audit-{}", Uuid::new_v4());

        let envelope = EventEnvelope {
            sequence: 1,
            occurred_at: 1_700_000_000,
            borrower: Address::new(borrower.clone()),
            event: LoanEvent::LoanRepaid {
                external_borrower_id: "ext-1".to_string(),
                amount: u128::from(u64::MAX) + 1,
            },
        };
        log.record(&envelope).await.unwrap();

        assert_eq!(log.count_for(&borrower).await.unwrap(), 1);
    }
}
