//! Encrypted-at-rest container for the wallet's secrets.
//!
//! # State Machine
//! ```text
//!                initialize                 unlock (password ok)
//! Uninitialized ───────────→ Locked ─────────────────────────→ Unlocked
//!       ↑                      ↑                                   │
//!       │ wipe                 └──────────── lock ─────────────────┘
//!       └──────────── (from any state)
//! ```
//!
//! # Security Constraints
//! - Mnemonic and private key are encrypted independently, each with its own
//!   salt and IV
//! - Decryption is the only password check; there is no stored password hash
//! - A missing, corrupted or wrongly-keyed record all fail the same way
//! - Unlocks are serialised per vault; throttling is the caller's job

pub mod record;
pub mod store;

pub use record::{VaultRecord, VAULT_VERSION};
pub use store::{UnlockedSecrets, VaultState, VaultStore};
