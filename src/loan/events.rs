//! Domain events emitted by the loan ledger

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::loan::{Address, Amount};

/// Loan lifecycle events, for external observers and audit logs
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum LoanEvent {
    LoanRequested {
        borrower: Address,
        amount: Amount,
        interest_rate_bps: u32,
    },
    LoanFunded {
        borrower: Address,
        principal: Amount,
    },
    LoanRepaid {
        external_borrower_id: String,
        amount: Amount,
    },
    LoanFullyRepaid {
        external_borrower_id: String,
    },
    LoanLiquidated {
        external_borrower_id: String,
        liquidation_amount: Amount,
    },
}

impl LoanEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            LoanEvent::LoanRequested { .. } => "LoanRequested",
            LoanEvent::LoanFunded { .. } => "LoanFunded",
            LoanEvent::LoanRepaid { .. } => "LoanRepaid",
            LoanEvent::LoanFullyRepaid { .. } => "LoanFullyRepaid",
            LoanEvent::LoanLiquidated { .. } => "LoanLiquidated",
        }
    }
}

/// Event with ordering and routing metadata
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct EventEnvelope {
    pub sequence: u64,
    pub occurred_at: u64,
    /// Ledger key of the loan the event belongs to
    pub borrower: Address,
    pub event: LoanEvent,
}

/// Fan-out of committed ledger events
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self {
            tx,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Number of events published so far
    pub fn published(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    pub fn publish(&self, borrower: Address, occurred_at: u64, event: LoanEvent) -> EventEnvelope {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let envelope = EventEnvelope {
            sequence,
            occurred_at,
            borrower,
            event,
        };

        tracing::info!(
            sequence,
            kind = envelope.event.kind(),
            borrower = %envelope.borrower,
            "Loan event emitted"
        );

        // No receivers is normal when nobody is listening
        if self.tx.send(envelope.clone()).is_err() {
            tracing::debug!(sequence, "No event subscribers");
        }

        envelope
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
