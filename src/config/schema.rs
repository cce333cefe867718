//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the wallet.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the wallet.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WalletConfig {
    /// Chain connection settings.
    pub blockchain: BlockchainConfig,

    /// Fee tier policy.
    pub gas: GasConfig,

    /// Vault storage and key derivation settings.
    pub vault: VaultConfig,

    /// Unlock throttling and password policy.
    pub security: SecurityConfig,

    /// Status monitor cadence.
    pub monitor: MonitorConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Blockchain connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Chain ID (e.g., 1 for Ethereum mainnet, 31337 for local Anvil).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Number of block confirmations required for finality.
    pub confirmation_blocks: u32,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,

    /// How long `wait_for_receipt` polls before giving up.
    pub receipt_timeout_secs: u64,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: 1,
            rpc_timeout_secs: 10,
            confirmation_blocks: 1,
            max_gas_price_gwei: 500,
            receipt_timeout_secs: 120,
        }
    }
}

/// Fee tiers derived from one base fee sample.
///
/// Multipliers are percentages of the sampled price.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GasConfig {
    pub slow_multiplier_percent: u64,
    pub standard_multiplier_percent: u64,
    pub fast_multiplier_percent: u64,

    /// Static confirmation estimates shown next to each tier.
    pub slow_eta_secs: u64,
    pub standard_eta_secs: u64,
    pub fast_eta_secs: u64,

    /// Gas limit used when a caller supplies none and estimation is skipped.
    pub default_gas_limit: u64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            slow_multiplier_percent: 80,
            standard_multiplier_percent: 100,
            fast_multiplier_percent: 120,
            slow_eta_secs: 120,
            standard_eta_secs: 30,
            fast_eta_secs: 15,
            default_gas_limit: 21_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VaultConfig {
    /// JSON file holding the vault record and the transaction ledger.
    pub store_path: PathBuf,

    /// PBKDF2 rounds for newly encrypted secrets.
    pub kdf_iterations: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("wallet.json"),
            kdf_iterations: 100_000,
        }
    }
}

/// Unlock throttling and password policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Consecutive failed unlocks before the cool-down starts.
    pub max_unlock_attempts: u32,
    /// Cool-down length in seconds.
    pub cooldown_secs: u64,
    /// Minimum password length for new vaults.
    pub min_password_len: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_unlock_attempts: 5,
            cooldown_secs: 300, // 5 minutes
            min_password_len: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Start the status monitor with the wallet.
    pub enabled: bool,

    /// Polling interval in milliseconds.
    pub interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 15_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json_logs: bool,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: WalletConfig = toml::from_str(
            r#"
            [blockchain]
            rpc_url = "http://127.0.0.1:8545"
            chain_id = 31337
            "#,
        )
        .unwrap();

        assert_eq!(config.blockchain.chain_id, 31337);
        assert_eq!(config.blockchain.rpc_timeout_secs, 10);
        assert_eq!(config.security.max_unlock_attempts, 5);
        assert_eq!(config.vault.kdf_iterations, 100_000);
        assert_eq!(config.gas.standard_multiplier_percent, 100);
        assert!(config.monitor.enabled);
    }
}
