//! Chain-facing types and error definitions.

use alloy::primitives::TxHash;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export BlockchainConfig from config module to avoid duplication
pub use crate::config::schema::BlockchainConfig;

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Transaction was not confirmed within expected time.
    #[error("Transaction not confirmed with {0} confirmations before the deadline")]
    ConfirmationTimeout(u32),

    /// The node refused to estimate gas (revert, bad call data, ...).
    #[error("Gas estimation failed: {0}")]
    GasEstimation(String),

    /// The node reported the sender cannot pay for value plus gas.
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// The signer or the user declined.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The node refused the signed transaction.
    #[error("Broadcast failed: {0}")]
    Broadcast(String),

    /// The transaction could not be assembled or signed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Gas price exceeded maximum allowed.
    #[error("Gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Outcome of a mined transaction as reported by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReceipt {
    /// EIP-658 status code: 1 for success, 0 for revert.
    pub status: u64,
    pub gas_used: u64,
    pub effective_gas_price: Option<u128>,
    pub block_number: Option<u64>,
}

impl ChainReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == 1
    }
}

/// Map a node's rejection of `eth_sendRawTransaction` onto a typed error.
pub fn classify_broadcast_error(message: &str) -> BlockchainError {
    let lower = message.to_lowercase();
    if lower.contains("insufficient funds") || lower.contains("insufficient balance") {
        BlockchainError::InsufficientFunds(message.to_string())
    } else if lower.contains("user rejected")
        || lower.contains("user denied")
        || lower.contains("rejected by user")
    {
        BlockchainError::Rejected(message.to_string())
    } else {
        BlockchainError::Broadcast(message.to_string())
    }
}

/// Interpret a refusal of `eth_sendRawTransaction` for `tx_hash`.
///
/// Once an earlier provider may have forwarded the payload, a node that
/// already has it (or has mined it, hence the nonce complaint) is
/// confirming the broadcast rather than refusing it.
pub fn resolve_broadcast_refusal(
    message: &str,
    forwarded: bool,
    tx_hash: TxHash,
) -> BlockchainResult<TxHash> {
    let lower = message.to_lowercase();
    let known = lower.contains("already known")
        || lower.contains("known transaction")
        || lower.contains("already imported")
        || lower.contains("nonce too low");
    if forwarded && known {
        Ok(tx_hash)
    } else {
        Err(classify_broadcast_error(message))
    }
}
