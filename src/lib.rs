//! Self-custodial Ethereum wallet library.
//!
//! Key vault (recovery phrase, HD derivation, encrypted persistence,
//! lock/unlock) and transaction lifecycle engine (build, estimate, sign,
//! broadcast, reconcile) behind one [`WalletService`].

pub mod accounts;
pub mod blockchain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod lifecycle;
pub mod monitor;
pub mod observability;
pub mod resilience;
pub mod security;
pub mod storage;
pub mod transactions;
pub mod vault;
pub mod wallet;

pub use config::schema::WalletConfig;
pub use error::{WalletError, WalletResult};
pub use wallet::WalletService;
