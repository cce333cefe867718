//! Wallet lifecycle surface.
//!
//! # Data Flow
//! ```text
//! create / import ──→ keys (derive) ──→ vault.initialize ──→ session
//! unlock ──→ security::UnlockThrottle ──→ vault.unlock ──→ session
//! send ──→ transactions (build → estimate → quote → funds → sign → ledger)
//! lock / wipe ──→ session dropped (keys zeroized)
//! ```
//!
//! # Security Constraints
//! - Decrypted keys live only in the session and are dropped on lock
//! - Never log private keys, phrases or passwords

pub mod service;

pub use service::{CreatedWallet, WalletService};
