//! Authority gate around ledger mutations
//!
//! Owner checks, the reentrancy guard, and the explicit caller context that
//! replaces an implicit calling principal.

mod access;
mod reentrancy;

pub use access::{AccessControl, Ownable};
pub use reentrancy::{GuardScope, ReentrancyGuard};

use crate::loan::Address;

/// Authenticated caller of a ledger operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
}

impl CallContext {
    pub fn new(caller: impl Into<Address>) -> Self {
        Self {
            caller: caller.into(),
        }
    }
}
