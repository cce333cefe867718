//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, iterations above the floor)
//! - Check fee tiers are ordered slow <= standard <= fast
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: WalletConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::WalletConfig;
use crate::crypto::MIN_KDF_ITERATIONS;

/// One semantic problem in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check every semantic rule and collect all failures.
pub fn validate_config(config: &WalletConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let chain = &config.blockchain;
    if chain.rpc_url.parse::<url::Url>().is_err() {
        errors.push(ValidationError::new("blockchain.rpc_url", "not a valid URL"));
    }
    for (i, failover) in chain.failover_urls.iter().enumerate() {
        if failover.parse::<url::Url>().is_err() {
            errors.push(ValidationError::new(
                &format!("blockchain.failover_urls[{}]", i),
                "not a valid URL",
            ));
        }
    }
    if chain.chain_id == 0 {
        errors.push(ValidationError::new("blockchain.chain_id", "must be greater than 0"));
    }
    if chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("blockchain.rpc_timeout_secs", "must be greater than 0"));
    }
    if chain.receipt_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "blockchain.receipt_timeout_secs",
            "must be greater than 0",
        ));
    }
    if chain.max_gas_price_gwei == 0 {
        errors.push(ValidationError::new(
            "blockchain.max_gas_price_gwei",
            "must be greater than 0",
        ));
    }

    let gas = &config.gas;
    if gas.slow_multiplier_percent == 0 {
        errors.push(ValidationError::new("gas.slow_multiplier_percent", "must be greater than 0"));
    }
    if gas.slow_multiplier_percent > gas.standard_multiplier_percent
        || gas.standard_multiplier_percent > gas.fast_multiplier_percent
    {
        errors.push(ValidationError::new(
            "gas",
            "multipliers must satisfy slow <= standard <= fast",
        ));
    }
    if gas.default_gas_limit < 21_000 {
        errors.push(ValidationError::new("gas.default_gas_limit", "must be at least 21000"));
    }

    if config.vault.kdf_iterations < MIN_KDF_ITERATIONS {
        errors.push(ValidationError::new(
            "vault.kdf_iterations",
            format!("must be at least {}", MIN_KDF_ITERATIONS),
        ));
    }
    if config.vault.store_path.as_os_str().is_empty() {
        errors.push(ValidationError::new("vault.store_path", "must not be empty"));
    }

    if config.security.max_unlock_attempts == 0 {
        errors.push(ValidationError::new("security.max_unlock_attempts", "must be greater than 0"));
    }
    if config.security.min_password_len == 0 {
        errors.push(ValidationError::new("security.min_password_len", "must be greater than 0"));
    }

    if config.monitor.interval_ms == 0 {
        errors.push(ValidationError::new("monitor.interval_ms", "must be greater than 0"));
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "not a valid socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
