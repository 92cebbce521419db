//! MicroLend Ledger
//!
//! Collateral-free, credit-scored micro-lending ledger. A single owner funds
//! loans in a managed token, borrowers repay with linearly accruing interest,
//! and under-repaid loans can be written off by the owner.
//!
//! The core is [`loan::LoanLedger`]; everything under `routes`, `handlers`,
//! `middleware` and `websocket` is the HTTP surface around it.

pub mod audit;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod loan;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod token;
pub mod websocket;
