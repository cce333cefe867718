//! Transfer requests, records and fee quotes.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a submitted transaction.
///
/// `Success` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Success,
    Failed,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Success => "success",
            TxStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A validated value transfer, ready for estimation and signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub from: Address,
    pub to: Address,
    /// Amount in wei. Always greater than zero.
    pub value: U256,
    pub data: Bytes,
    pub gas_limit: Option<u64>,
    /// Legacy gas price in wei.
    pub gas_price: Option<u128>,
}

impl TransferRequest {
    /// The JSON-RPC form, without nonce or chain ID.
    pub fn to_rpc_request(&self) -> TransactionRequest {
        let mut request = TransactionRequest::default()
            .with_from(self.from)
            .with_to(self.to)
            .with_value(self.value)
            .with_input(self.data.clone());
        if let Some(limit) = self.gas_limit {
            request = request.with_gas_limit(limit);
        }
        if let Some(price) = self.gas_price {
            request = request.with_gas_price(price);
        }
        request
    }
}

/// Local record of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub hash: TxHash,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub gas_used: u64,
    pub gas_price: u128,
    pub status: TxStatus,
    /// Seconds since the Unix epoch at submission.
    pub timestamp: u64,
    pub block_number: Option<u64>,
    pub nonce: u64,
}

impl TransactionRecord {
    /// Whether `address` sent or received this transfer.
    pub fn involves(&self, address: &Address) -> bool {
        self.from == *address || self.to == *address
    }
}

/// Fields a ledger update may change. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordUpdate {
    pub status: Option<TxStatus>,
    pub gas_used: Option<u64>,
    pub gas_price: Option<u128>,
    pub block_number: Option<u64>,
}

/// Fee tier chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GasSpeed {
    Slow,
    #[default]
    Standard,
    Fast,
}

impl FromStr for GasSpeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow" => Ok(GasSpeed::Slow),
            "standard" => Ok(GasSpeed::Standard),
            "fast" => Ok(GasSpeed::Fast),
            other => Err(format!("unknown speed '{}', expected slow, standard or fast", other)),
        }
    }
}

/// One fee tier: price in wei and a static confirmation estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasTier {
    pub price: u128,
    pub eta_secs: u64,
}

/// Three fee tiers derived from one base fee sample.
///
/// Prices never decrease from `slow` to `fast`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasQuote {
    pub slow: GasTier,
    pub standard: GasTier,
    pub fast: GasTier,
}

impl GasQuote {
    pub fn tier(&self, speed: GasSpeed) -> GasTier {
        match speed {
            GasSpeed::Slow => self.slow,
            GasSpeed::Standard => self.standard,
            GasSpeed::Fast => self.fast,
        }
    }
}
