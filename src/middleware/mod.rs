//! HTTP middleware for the ledger API
//!
//! Request tracing, per-client rate limiting, security headers and the
//! authenticated-caller extractor.

pub mod auth;
mod rate_limiter;
mod security;
mod tracing;

pub use auth::{AuthenticatedCaller, OwnerCaller};
pub use rate_limiter::{rate_limit_layer, RateLimiter};
pub use security::{hsts_header, security_headers};
pub use tracing::{request_tracing, REQUEST_ID_HEADER};
