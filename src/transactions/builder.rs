//! Transfer construction, gas estimation and fee quotes.
//!
//! # Responsibilities
//! - Validate the recipient and amount before anything touches the chain
//! - Delegate gas estimation, keeping its failures distinct
//! - Derive three fee tiers from one base fee sample
//! - Enforce the configured gas price ceiling
//!
//! All amounts are wei; conversion to ether happens in `units`.

use alloy::primitives::{Address, Bytes, U256};
use std::str::FromStr;
use std::sync::Arc;

use crate::blockchain::{BlockchainError, ChainClient};
use crate::config::GasConfig;
use crate::error::{WalletError, WalletResult};
use crate::transactions::types::{GasQuote, GasTier, TransferRequest};

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Builds transfers against one chain client.
#[derive(Clone)]
pub struct TransferBuilder {
    client: Arc<dyn ChainClient>,
    gas: GasConfig,
    max_gas_price_gwei: u64,
}

impl TransferBuilder {
    pub fn new(client: Arc<dyn ChainClient>, gas: GasConfig, max_gas_price_gwei: u64) -> Self {
        Self {
            client,
            gas,
            max_gas_price_gwei,
        }
    }

    /// Assemble a transfer of `amount` wei from `from` to `to`.
    ///
    /// Makes no chain calls. A malformed recipient or a zero amount is a
    /// validation error; nothing is clamped.
    pub fn build(
        &self,
        from: Address,
        to: &str,
        amount: U256,
        gas_price: Option<u128>,
        gas_limit: Option<u64>,
    ) -> WalletResult<TransferRequest> {
        let to = parse_address(to)?;
        if amount.is_zero() {
            return Err(WalletError::Validation("Amount must be greater than zero".to_string()));
        }
        if gas_limit == Some(0) {
            return Err(WalletError::Validation("Gas limit must be greater than zero".to_string()));
        }

        Ok(TransferRequest {
            from,
            to,
            value: amount,
            data: Bytes::new(),
            gas_limit,
            gas_price,
        })
    }

    /// Ask the node how much gas `request` needs.
    pub async fn estimate_gas(&self, request: &TransferRequest) -> WalletResult<u64> {
        let estimate = self
            .client
            .estimate_gas(&request.to_rpc_request())
            .await
            .map_err(|e| match e {
                BlockchainError::GasEstimation(msg) => WalletError::GasEstimation(msg),
                other => WalletError::from(other),
            })?;
        tracing::debug!(to = %request.to, gas = estimate, "Gas estimated");
        Ok(estimate)
    }

    /// Sample the base fee once and derive slow/standard/fast tiers.
    pub async fn gas_quote(&self) -> WalletResult<GasQuote> {
        let base = self.client.get_base_fee().await?;
        Ok(quote_from_base_fee(base, &self.gas))
    }

    /// Reject prices above the configured ceiling.
    pub fn check_gas_price(&self, price: u128) -> WalletResult<()> {
        let price_gwei = price / WEI_PER_GWEI;
        if price_gwei > u128::from(self.max_gas_price_gwei) {
            return Err(BlockchainError::GasPriceTooHigh {
                current_gwei: u64::try_from(price_gwei).unwrap_or(u64::MAX),
                max_gwei: self.max_gas_price_gwei,
            }
            .into());
        }
        Ok(())
    }

    pub fn default_gas_limit(&self) -> u64 {
        self.gas.default_gas_limit
    }
}

/// Apply the configured percentage multipliers to `base`.
///
/// Tiers are forced non-decreasing even if the multipliers are not.
pub fn quote_from_base_fee(base: u128, gas: &GasConfig) -> GasQuote {
    let scale = |percent: u64| base.saturating_mul(u128::from(percent)) / 100;

    let slow = scale(gas.slow_multiplier_percent);
    let standard = scale(gas.standard_multiplier_percent).max(slow);
    let fast = scale(gas.fast_multiplier_percent).max(standard);

    GasQuote {
        slow: GasTier {
            price: slow,
            eta_secs: gas.slow_eta_secs,
        },
        standard: GasTier {
            price: standard,
            eta_secs: gas.standard_eta_secs,
        },
        fast: GasTier {
            price: fast,
            eta_secs: gas.fast_eta_secs,
        },
    }
}

/// `gas_limit × gas_price + value`, in wei.
pub fn total_cost(gas_limit: u64, gas_price: u128, value: U256) -> U256 {
    U256::from(gas_limit)
        .saturating_mul(U256::from(gas_price))
        .saturating_add(value)
}

/// Parse a `0x`-prefixed hex address.
///
/// Mixed-case input must carry a valid EIP-55 checksum.
pub fn parse_address(input: &str) -> WalletResult<Address> {
    let trimmed = input.trim();
    let invalid = || WalletError::Validation(format!("Invalid address: '{}'", input));

    let hex_part = trimmed.strip_prefix("0x").ok_or_else(invalid)?;
    if hex_part.len() != 40 {
        return Err(invalid());
    }
    let address = Address::from_str(trimmed).map_err(|_| invalid())?;

    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        Address::parse_checksummed(trimmed, None).map_err(|_| {
            WalletError::Validation(format!("Invalid address checksum: '{}'", input))
        })?;
    }
    Ok(address)
}
