//! Loan module - models, interest arithmetic, events and the ledger

pub mod calculator;
pub mod events;
pub mod ledger;
pub mod model;
pub mod monitor;

pub use events::{EventBus, EventEnvelope, LoanEvent};
pub use ledger::{LedgerParams, LoanLedger};
pub use model::*;
pub use monitor::delinquency_monitor;
