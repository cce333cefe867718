//! Wallet error taxonomy.
//!
//! Every subsystem error funnels into [`WalletError`], which is what the
//! wallet surface and the CLI report. The variants map one-to-one onto the
//! ways a caller is expected to react: fix the input, re-enter the password,
//! retry later, fall back to manual gas, or give up on the transfer.

use alloy::primitives::TxHash;
use std::time::Duration;
use thiserror::Error;

use crate::blockchain::types::BlockchainError;
use crate::config::ConfigError;
use crate::crypto::CipherError;
use crate::keys::KeyError;
use crate::storage::StorageError;

/// Errors surfaced by the wallet.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Malformed address, amount, mnemonic or password. Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Wrong password or corrupted ciphertext.
    #[error("Wrong password or corrupted data")]
    Crypto,

    /// Chain client unreachable or RPC failure. Safe to retry.
    #[error("Network error: {0}")]
    Network(String),

    /// Gas estimation rejected the transfer; callers may fall back to a
    /// manual gas limit.
    #[error("Gas estimation failed: {0}")]
    GasEstimation(String),

    /// The sending account cannot cover value plus fees.
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// The user cancelled the operation.
    #[error("Rejected by user")]
    UserRejected,

    /// Broadcast or signing failed for any other reason.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Broadcast succeeded but the pending record could not be written.
    /// The transaction is live under `tx_hash`.
    #[error("Transaction {tx_hash} was broadcast but not recorded: {reason}")]
    Unrecorded { tx_hash: TxHash, reason: String },

    /// No vault has been created or imported yet.
    #[error("Wallet is not initialized")]
    NotInitialized,

    /// The operation needs an unlocked session.
    #[error("Wallet is locked")]
    Locked,

    /// Too many failed unlock attempts.
    #[error("Too many failed unlock attempts, retry in {} seconds", retry_after.as_secs().max(1))]
    TooManyAttempts { retry_after: Duration },

    /// Persistence collaborator failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for wallet operations.
pub type WalletResult<T> = Result<T, WalletError>;

impl From<CipherError> for WalletError {
    fn from(_: CipherError) -> Self {
        WalletError::Crypto
    }
}

impl From<KeyError> for WalletError {
    fn from(e: KeyError) -> Self {
        WalletError::Validation(e.to_string())
    }
}

impl From<StorageError> for WalletError {
    fn from(e: StorageError) -> Self {
        WalletError::Storage(e.to_string())
    }
}

impl From<ConfigError> for WalletError {
    fn from(e: ConfigError) -> Self {
        WalletError::Validation(e.to_string())
    }
}

impl From<BlockchainError> for WalletError {
    fn from(e: BlockchainError) -> Self {
        match e {
            BlockchainError::GasEstimation(msg) => WalletError::GasEstimation(msg),
            BlockchainError::InsufficientFunds(msg) => WalletError::InsufficientFunds(msg),
            BlockchainError::Rejected(_) => WalletError::UserRejected,
            BlockchainError::Broadcast(msg) => WalletError::TransactionFailed(msg),
            BlockchainError::Signing(msg) => WalletError::TransactionFailed(msg),
            too_high @ BlockchainError::GasPriceTooHigh { .. } => {
                WalletError::Validation(too_high.to_string())
            }
            other => WalletError::Network(other.to_string()),
        }
    }
}
