//! Authentication for the ledger API
//!
//! Callers present a JWT access token whose subject is their ledger address.
//! The token identifies the calling principal passed to ledger operations.

mod jwt;

pub use jwt::{issue_access_token, verify_token, AuthKeys, Claims, JwtError, ACCESS_TOKEN_TYPE};
