//! Persisted vault layout.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::crypto::EncryptedSecret;

/// Current vault record format.
pub const VAULT_VERSION: u32 = 1;

/// The single encrypted record describing a wallet.
///
/// Written once at creation or import and never mutated; a new wallet
/// replaces the whole record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRecord {
    pub version: u32,
    /// Absent for private-key-only imports.
    pub encrypted_mnemonic: Option<EncryptedSecret>,
    pub encrypted_private_key: EncryptedSecret,
    /// Seconds since the Unix epoch.
    pub created_at: u64,
}

impl VaultRecord {
    pub fn new(
        encrypted_mnemonic: Option<EncryptedSecret>,
        encrypted_private_key: EncryptedSecret,
    ) -> Self {
        Self {
            version: VAULT_VERSION,
            encrypted_mnemonic,
            encrypted_private_key,
            created_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }

    pub fn has_mnemonic(&self) -> bool {
        self.encrypted_mnemonic.is_some()
    }
}
