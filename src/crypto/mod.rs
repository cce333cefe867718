//! Symmetric protection of secrets at rest.
//!
//! # Data Flow
//! ```text
//! password + fresh salt
//!     → PBKDF2-HMAC-SHA256 (>= 100 000 rounds) → 64-byte key block
//!         → [0..32]  AES-256-CBC key  (fresh IV per call)
//!         → [32..64] HMAC-SHA256 key  (tag over iv || ciphertext)
//!     → EncryptedSecret { ciphertext, salt, iv, mac }
//! ```
//!
//! # Security Constraints
//! - Salt and IV are never reused between encryptions
//! - Decryption verifies the tag before touching the ciphertext and fails
//!   closed with a single, uninformative error
//! - Derived keys live in zeroizing buffers

pub mod cipher;

pub use cipher::{Cipher, CipherError, EncryptedSecret, MIN_KDF_ITERATIONS};
