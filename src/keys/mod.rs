//! Recovery phrases and hierarchical key derivation.
//!
//! # Data Flow
//! ```text
//! OS randomness (128 bits)
//!     → mnemonic.rs (BIP-39 English, 12 words, checksum)
//!     → derivation.rs (BIP-39 seed → BIP-32 walk of m/44'/60'/0'/0/{index})
//!     → KeyPair { private key (zeroized on drop), address }
//! ```
//!
//! Derivation is pure: no I/O, no logging of inputs or outputs. There is no
//! path back from a private key to its phrase.

pub mod derivation;
pub mod mnemonic;

use thiserror::Error;

pub use derivation::{
    derive_at_path, derive_key_pair, DerivationPath, KeyPair, ETHEREUM_COIN_TYPE, HARDENED_OFFSET,
};
pub use mnemonic::{normalize_phrase, validate_mnemonic, Mnemonic, MNEMONIC_WORDS};

/// Errors from phrase handling and key derivation.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid recovery phrase")]
    InvalidMnemonic,

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("key derivation failed: {0}")]
    Derivation(String),
}
