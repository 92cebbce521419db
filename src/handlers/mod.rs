//! HTTP handlers for the ledger API

mod loan;
mod system;
mod token;
mod treasury;

pub use loan::*;
pub use system::*;
pub use token::*;
pub use treasury::*;
