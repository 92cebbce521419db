//! Configuration for the micro-lending ledger server
//!
//! Loaded from environment variables (and `.env` when present), with support
//! for different environments (development, staging, production).

use std::env;
use thiserror::Error;

use crate::loan::{Address, LedgerParams};
use crate::token::TokenMetadata;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse environment from string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

const DEV_JWT_SECRET: &str = "development-secret-change-in-production";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,

    /// Server port
    pub port: u16,

    /// Log level (RUST_LOG)
    pub log_level: String,

    /// Initial ledger owner
    pub owner_address: Address,

    /// Account under which the ledger holds tokens
    pub ledger_address: Address,

    /// Fixed ledger parameters
    pub ledger_params: LedgerParams,

    pub token_metadata: TokenMetadata,

    /// JWT secret for token signing
    pub jwt_secret: String,

    /// Access token TTL in seconds (default: 900 = 15 minutes)
    pub jwt_access_token_ttl_seconds: i64,

    /// Postgres URL for the event audit log; disabled when unset
    pub database_url: Option<String>,

    /// Delinquency scan period
    pub monitor_interval_seconds: u64,

    /// Rate limit: requests per second per IP
    pub rate_limit_rps: u32,

    /// CORS allowed origins
    pub cors_allowed_origins: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .map(|s| Environment::parse(&s))
            .unwrap_or(Ok(Environment::Development))?;

        let port = lookup("PORT")
            .unwrap_or_else(|| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let log_level = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let owner_address = lookup("OWNER_ADDRESS")
            .filter(|s| !s.trim().is_empty())
            .map(Address::new)
            .ok_or_else(|| ConfigError::MissingEnvVar("OWNER_ADDRESS".to_string()))?;

        let ledger_address = lookup("LEDGER_ADDRESS")
            .map(Address::new)
            .unwrap_or_else(|| Address::new("microlend-ledger"));

        if ledger_address == owner_address {
            return Err(ConfigError::InvalidValue(
                "LEDGER_ADDRESS must differ from OWNER_ADDRESS".to_string(),
            ));
        }

        let ledger_params = LedgerParams {
            liquidation_threshold_pct: percentage(&lookup, "LIQUIDATION_THRESHOLD_PCT", 80)?,
            loan_to_value_pct: percentage(&lookup, "LOAN_TO_VALUE_PCT", 75)?,
            fund_requires_owner: flag(&lookup, "FUND_REQUIRES_OWNER", false)?,
            accept_overpayment: flag(&lookup, "ACCEPT_OVERPAYMENT", false)?,
        };

        let defaults = TokenMetadata::default();
        let token_metadata = TokenMetadata {
            name: lookup("TOKEN_NAME").unwrap_or(defaults.name),
            symbol: lookup("TOKEN_SYMBOL").unwrap_or(defaults.symbol),
            decimals: match lookup("TOKEN_DECIMALS") {
                Some(raw) => raw.parse::<u8>().map_err(|_| {
                    ConfigError::InvalidValue(format!("TOKEN_DECIMALS must be 0-255, got '{}'", raw))
                })?,
                None => defaults.decimals,
            },
        };

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.to_string());
        if environment.is_production() && jwt_secret == DEV_JWT_SECRET {
            return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string()));
        }

        let jwt_access_token_ttl_seconds = lookup("JWT_ACCESS_TOKEN_TTL_SECONDS")
            .unwrap_or_else(|| "900".to_string())
            .parse::<i64>()
            .unwrap_or(900);

        let database_url = lookup("DATABASE_URL").filter(|s| !s.is_empty());

        let monitor_interval_seconds = lookup("MONITOR_INTERVAL_SECONDS")
            .unwrap_or_else(|| "60".to_string())
            .parse::<u64>()
            .unwrap_or(60)
            .max(1);

        let rate_limit_rps = lookup("RATE_LIMIT_RPS")
            .unwrap_or_else(|| "100".to_string())
            .parse::<u32>()
            .unwrap_or(100);

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS");

        Ok(Config {
            environment,
            port,
            log_level,
            owner_address,
            ledger_address,
            ledger_params,
            token_metadata,
            jwt_secret,
            jwt_access_token_ttl_seconds,
            database_url,
            monitor_interval_seconds,
            rate_limit_rps,
            cors_allowed_origins,
        })
    }

    /// Database URL with the password masked, for logging
    pub fn database_url_masked(&self) -> Option<String> {
        self.database_url.as_deref().map(|url| {
            if let Some(at_pos) = url.find('@') {
                if let Some(colon_pos) = url[..at_pos].rfind(':') {
                    return format!("{}****{}", &url[..colon_pos + 1], &url[at_pos..]);
                }
            }
            url.to_string()
        })
    }
}

fn percentage<F>(lookup: &F, key: &str, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = match lookup(key) {
        Some(raw) => raw,
        None => return Ok(default),
    };
    match raw.trim().parse::<u32>() {
        Ok(pct) if (1..=100).contains(&pct) => Ok(pct),
        _ => Err(ConfigError::InvalidValue(format!(
            "{} must be an integer in 1..=100, got '{}'",
            key, raw
        ))),
    }
}

fn flag<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|s| s.trim().to_lowercase()) {
        None => Ok(default),
        Some(s) if matches!(s.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(s) if matches!(s.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(s) => Err(ConfigError::InvalidValue(format!(
            "{} must be a boolean, got '{}'",
            key, s
        ))),
    }
}
