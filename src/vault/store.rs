//! Vault persistence and lock state.

use std::sync::{Arc, RwLock};

use secrecy::ExposeSecret;
use tokio::sync::Mutex;
use zeroize::Zeroizing;

use crate::crypto::Cipher;
use crate::error::{WalletError, WalletResult};
use crate::keys::{KeyPair, Mnemonic};
use crate::observability::metrics;
use crate::storage::{self, keys, KeyValueStore};
use crate::vault::record::{VaultRecord, VAULT_VERSION};

/// Lock state of a vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    Uninitialized,
    Locked,
    Unlocked,
}

/// Plaintext secrets recovered by a successful unlock.
///
/// Both members zeroize their buffers when dropped.
#[derive(Debug)]
pub struct UnlockedSecrets {
    pub mnemonic: Option<Mnemonic>,
    pub key_pair: KeyPair,
}

/// Encrypted secret storage over a [`KeyValueStore`].
pub struct VaultStore {
    store: Arc<dyn KeyValueStore>,
    cipher: Cipher,
    state: RwLock<VaultState>,
    unlock_gate: Mutex<()>,
}

impl VaultStore {
    /// Open the vault kept in `store`.
    pub fn new(store: Arc<dyn KeyValueStore>, cipher: Cipher) -> WalletResult<Self> {
        let vault = Self {
            store,
            cipher,
            state: RwLock::new(VaultState::Uninitialized),
            unlock_gate: Mutex::new(()),
        };
        if vault.is_initialized()? {
            vault.set_state(VaultState::Locked);
        }
        Ok(vault)
    }

    pub fn state(&self) -> VaultState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: VaultState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// True iff a complete vault record is persisted.
    pub fn is_initialized(&self) -> WalletResult<bool> {
        let flag: Option<bool> = storage::get_json(self.store.as_ref(), keys::VAULT_INITIALIZED)?;
        Ok(flag.unwrap_or(false) && self.store.get(keys::VAULT_RECORD)?.is_some())
    }

    /// Whether the stored vault carries a recovery phrase.
    pub fn has_mnemonic(&self) -> WalletResult<bool> {
        let record: Option<VaultRecord> =
            storage::get_json(self.store.as_ref(), keys::VAULT_RECORD)?;
        Ok(record.map(|r| r.has_mnemonic()).unwrap_or(false))
    }

    /// Encrypt and persist a new vault, replacing any existing one.
    ///
    /// The caller already holds the plaintext, so the vault is left
    /// `Unlocked`.
    pub async fn initialize(
        &self,
        mnemonic: Option<&Mnemonic>,
        key_pair: &KeyPair,
        password: &str,
    ) -> WalletResult<()> {
        let _gate = self.unlock_gate.lock().await;

        let cipher = self.cipher;
        let phrase = mnemonic.map(|m| Zeroizing::new(m.phrase().to_owned()));
        let private_key = key_pair.private_key_hex();
        let password = Zeroizing::new(password.to_owned());

        let record = tokio::task::spawn_blocking(move || -> WalletResult<VaultRecord> {
            let encrypted_mnemonic = phrase
                .as_ref()
                .map(|p| cipher.encrypt(p, &password))
                .transpose()?;
            let encrypted_private_key = cipher.encrypt(&private_key, &password)?;
            Ok(VaultRecord::new(encrypted_mnemonic, encrypted_private_key))
        })
        .await
        .map_err(|e| WalletError::Storage(format!("vault task failed: {}", e)))??;

        // Clear the flag first so a crash between writes never leaves a
        // flagged vault pointing at a stale record.
        self.store.remove(keys::VAULT_INITIALIZED)?;
        storage::set_json(self.store.as_ref(), keys::VAULT_RECORD, &record)?;
        storage::set_json(self.store.as_ref(), keys::VAULT_INITIALIZED, &true)?;
        self.set_state(VaultState::Unlocked);

        tracing::info!(
            address = %key_pair.address(),
            has_mnemonic = record.has_mnemonic(),
            "Vault initialized"
        );
        Ok(())
    }

    /// Decrypt the vault with `password`.
    ///
    /// On failure nothing changes, so the call can be retried.
    pub async fn unlock(&self, password: &str) -> WalletResult<UnlockedSecrets> {
        let _gate = self.unlock_gate.lock().await;

        let record = match self.load_record() {
            Ok(Some(record)) if record.version == VAULT_VERSION => record,
            Ok(_) | Err(_) => {
                metrics::record_unlock_attempt("failure");
                return Err(WalletError::Crypto);
            }
        };

        let cipher = self.cipher;
        let password = Zeroizing::new(password.to_owned());
        let secrets =
            tokio::task::spawn_blocking(move || decrypt_record(&cipher, &record, &password))
                .await
                .map_err(|e| WalletError::Storage(format!("vault task failed: {}", e)))?;

        match secrets {
            Ok(secrets) => {
                self.set_state(VaultState::Unlocked);
                metrics::record_unlock_attempt("success");
                tracing::info!(address = %secrets.key_pair.address(), "Vault unlocked");
                Ok(secrets)
            }
            Err(e) => {
                metrics::record_unlock_attempt("failure");
                tracing::warn!("Vault unlock failed");
                Err(e)
            }
        }
    }

    /// Return to `Locked`. The caller drops its decrypted secrets.
    pub fn lock(&self) {
        if self.state() == VaultState::Unlocked {
            self.set_state(VaultState::Locked);
            tracing::info!("Vault locked");
        }
    }

    /// Erase the persisted vault.
    pub fn wipe(&self) -> WalletResult<()> {
        self.store.remove(keys::VAULT_INITIALIZED)?;
        self.store.remove(keys::VAULT_RECORD)?;
        self.set_state(VaultState::Uninitialized);
        tracing::warn!("Vault wiped");
        Ok(())
    }

    fn load_record(&self) -> WalletResult<Option<VaultRecord>> {
        if !self.is_initialized()? {
            return Ok(None);
        }
        Ok(storage::get_json(self.store.as_ref(), keys::VAULT_RECORD)?)
    }
}

fn decrypt_record(
    cipher: &Cipher,
    record: &VaultRecord,
    password: &str,
) -> WalletResult<UnlockedSecrets> {
    let private_key = cipher.decrypt(&record.encrypted_private_key, password)?;
    let key_pair =
        KeyPair::from_private_key_hex(private_key.expose_secret())
            .map_err(|_| WalletError::Crypto)?;

    let mnemonic = match &record.encrypted_mnemonic {
        Some(secret) => {
            let phrase = cipher.decrypt(secret, password)?;
            Some(Mnemonic::parse(phrase.expose_secret()).map_err(|_| WalletError::Crypto)?)
        }
        None => None,
    };

    Ok(UnlockedSecrets { mnemonic, key_pair })
}

impl std::fmt::Debug for VaultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultStore")
            .field("state", &self.state())
            .field("kdf_iterations", &self.cipher.iterations())
            .finish()
    }
}
