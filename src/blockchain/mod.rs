//! Chain client collaborator.
//!
//! # Data Flow
//! ```text
//! config.toml [blockchain] (RPC URL, failovers, chain ID)
//!     → client.rs (JSON-RPC with per-call timeouts and failover)
//!     → ChainClient trait (balance, nonce, fee, estimate, broadcast, receipt)
//!     → transactions / monitor
//! ```
//!
//! # Security Constraints
//! - Only signed, encoded transactions cross this boundary
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts
//! - Graceful degradation when the node is unreachable

pub mod client;
pub mod types;

pub use client::{BlockchainClient, ChainClient};
pub use types::{
    resolve_broadcast_refusal, BlockchainConfig, BlockchainError, BlockchainResult, ChainReceipt,
};
