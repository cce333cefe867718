//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! WalletService::unlock(password):
//!     → lockout.rs (refuse while a cool-down is active)
//!     → VaultStore::unlock (decryption is the password check)
//!     → lockout.rs (count the failure or reset on success)
//! ```
//!
//! # Design Decisions
//! - Fail closed: a cool-down refuses even the correct password
//! - Lockout lives above the vault so the vault stays a pure, retryable check
//! - No trust in client input

pub mod lockout;

pub use lockout::UnlockThrottle;
