//! The wallet surface: vault lifecycle, accounts and transfers.
//!
//! One `WalletService` is built at startup from its collaborators and
//! passed by reference to whatever drives it (the CLI, an embedding host,
//! tests).

use alloy::primitives::{Address, TxHash, U256};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::accounts::{Account, AccountRegistry};
use crate::blockchain::ChainClient;
use crate::config::{validate_config, WalletConfig};
use crate::crypto::Cipher;
use crate::error::{WalletError, WalletResult};
use crate::keys::{derive_key_pair, KeyPair, Mnemonic};
use crate::monitor::StatusMonitor;
use crate::observability::metrics;
use crate::security::UnlockThrottle;
use crate::storage::KeyValueStore;
use crate::transactions::{
    format_ether, total_cost, GasQuote, GasSpeed, Submitter, TransactionLedger, TransactionRecord,
    TransferBuilder, TransferRequest,
};
use crate::vault::{UnlockedSecrets, VaultState, VaultStore};

/// Intrinsic gas of a plain value transfer.
const MIN_TRANSFER_GAS: u64 = 21_000;

/// A freshly generated wallet. The phrase must be shown to the user once.
#[derive(Debug)]
pub struct CreatedWallet {
    pub address: Address,
    pub mnemonic: Mnemonic,
}

/// Decrypted key material for the current unlocked session.
///
/// Dropping it zeroizes every key and the phrase.
struct Session {
    mnemonic: Option<Mnemonic>,
    registry: AccountRegistry,
    keys: HashMap<Address, KeyPair>,
}

impl Session {
    fn open(secrets: UnlockedSecrets) -> Self {
        let mut registry = AccountRegistry::new();
        let address = secrets.key_pair.address();
        registry.create_account(address, 0);

        let mut keys = HashMap::new();
        keys.insert(address, secrets.key_pair);
        Self {
            mnemonic: secrets.mnemonic,
            registry,
            keys,
        }
    }

    fn primary(&self) -> Option<Address> {
        self.registry.accounts().first().map(|a| a.address)
    }
}

pub struct WalletService {
    vault: VaultStore,
    ledger: Arc<TransactionLedger>,
    client: Arc<dyn ChainClient>,
    builder: TransferBuilder,
    submitter: Submitter,
    monitor: StatusMonitor,
    throttle: UnlockThrottle,
    /// Serializes throttle check, decryption and bookkeeping per attempt.
    unlock_gate: tokio::sync::Mutex<()>,
    session: RwLock<Option<Session>>,
    min_password_len: usize,
    confirmation_blocks: u32,
    receipt_timeout: Duration,
    monitor_interval: Duration,
    monitor_enabled: bool,
}

impl WalletService {
    /// Wire the wallet over `store` and `client`.
    ///
    /// Fails with [`WalletError::Validation`] listing every invalid setting.
    pub fn new(
        config: &WalletConfig,
        store: Arc<dyn KeyValueStore>,
        client: Arc<dyn ChainClient>,
    ) -> WalletResult<Self> {
        validate_config(config).map_err(|errors| {
            let listed: Vec<String> = errors.iter().map(ToString::to_string).collect();
            WalletError::Validation(format!("Invalid configuration: {}", listed.join("; ")))
        })?;
        let cipher = Cipher::new(config.vault.kdf_iterations)
            .map_err(|e| WalletError::Validation(e.to_string()))?;
        let vault = VaultStore::new(store.clone(), cipher)?;
        let ledger = Arc::new(TransactionLedger::open(store)?);

        let builder = TransferBuilder::new(
            client.clone(),
            config.gas.clone(),
            config.blockchain.max_gas_price_gwei,
        );
        let submitter = Submitter::new(client.clone(), ledger.clone(), config.blockchain.chain_id);
        let monitor = StatusMonitor::new(ledger.clone(), client.clone());

        Ok(Self {
            vault,
            ledger,
            client,
            builder,
            submitter,
            monitor,
            throttle: UnlockThrottle::from_config(&config.security),
            unlock_gate: tokio::sync::Mutex::new(()),
            session: RwLock::new(None),
            min_password_len: config.security.min_password_len,
            confirmation_blocks: config.blockchain.confirmation_blocks,
            receipt_timeout: Duration::from_secs(config.blockchain.receipt_timeout_secs),
            monitor_interval: Duration::from_millis(config.monitor.interval_ms),
            monitor_enabled: config.monitor.enabled,
        })
    }

    fn session(&self) -> RwLockReadGuard<'_, Option<Session>> {
        self.session.read().unwrap_or_else(|e| e.into_inner())
    }

    fn session_mut(&self) -> RwLockWriteGuard<'_, Option<Session>> {
        self.session.write().unwrap_or_else(|e| e.into_inner())
    }

    fn check_password_policy(&self, password: &str) -> WalletResult<()> {
        if password.chars().count() < self.min_password_len {
            return Err(WalletError::Validation(format!(
                "Password must be at least {} characters",
                self.min_password_len
            )));
        }
        Ok(())
    }

    async fn initialize(
        &self,
        mnemonic: Option<Mnemonic>,
        key_pair: KeyPair,
        password: &str,
    ) -> WalletResult<Address> {
        self.check_password_policy(password)?;
        self.lock();
        self.vault.initialize(mnemonic.as_ref(), &key_pair, password).await?;
        self.throttle.record_success();

        let address = key_pair.address();
        *self.session_mut() = Some(Session::open(UnlockedSecrets { mnemonic, key_pair }));
        Ok(address)
    }

    /// Generate a phrase, derive account 0, and store both encrypted.
    ///
    /// Replaces any existing vault. The wallet is left unlocked.
    pub async fn create_wallet(&self, password: &str) -> WalletResult<CreatedWallet> {
        let mnemonic = Mnemonic::generate()?;
        let key_pair = derive_key_pair(&mnemonic, None, 0)?;
        let address = self.initialize(Some(mnemonic.clone()), key_pair, password).await?;
        tracing::info!(address = %address, "Wallet created");
        Ok(CreatedWallet { address, mnemonic })
    }

    /// Store a raw private key. The vault carries no phrase afterwards.
    pub async fn import_private_key(
        &self,
        private_key: &str,
        password: &str,
    ) -> WalletResult<Address> {
        let key_pair = KeyPair::from_private_key_hex(private_key)?;
        let address = self.initialize(None, key_pair, password).await?;
        tracing::info!(address = %address, "Private key imported");
        Ok(address)
    }

    /// Restore from a recovery phrase, using account 0.
    pub async fn import_mnemonic(&self, phrase: &str, password: &str) -> WalletResult<Address> {
        let mnemonic = Mnemonic::parse(phrase)?;
        let key_pair = derive_key_pair(&mnemonic, None, 0)?;
        let address = self.initialize(Some(mnemonic), key_pair, password).await?;
        tracing::info!(address = %address, "Recovery phrase imported");
        Ok(address)
    }

    /// Decrypt the vault and open a session.
    ///
    /// Refused with [`WalletError::TooManyAttempts`] during a cool-down.
    pub async fn unlock(&self, password: &str) -> WalletResult<Address> {
        let _attempt = self.unlock_gate.lock().await;
        if let Err(retry_after) = self.throttle.check() {
            metrics::record_unlock_attempt("throttled");
            tracing::warn!(
                retry_after_secs = retry_after.as_secs(),
                "Unlock refused during cool-down"
            );
            return Err(WalletError::TooManyAttempts { retry_after });
        }

        match self.vault.unlock(password).await {
            Ok(secrets) => {
                self.throttle.record_success();
                let session = Session::open(secrets);
                let address = session.primary().ok_or(WalletError::Crypto)?;
                *self.session_mut() = Some(session);
                Ok(address)
            }
            Err(WalletError::Crypto) => {
                self.throttle.record_failure();
                Err(WalletError::Crypto)
            }
            Err(other) => Err(other),
        }
    }

    /// Drop the session's key material and lock the vault.
    pub fn lock(&self) {
        let had_session = self.session_mut().take().is_some();
        self.vault.lock();
        if had_session {
            tracing::info!("Session closed");
        }
    }

    pub fn is_initialized(&self) -> WalletResult<bool> {
        self.vault.is_initialized()
    }

    pub fn is_unlocked(&self) -> bool {
        self.session().is_some()
    }

    pub fn state(&self) -> VaultState {
        self.vault.state()
    }

    /// Address of account 0.
    pub fn address(&self) -> WalletResult<Address> {
        self.session()
            .as_ref()
            .and_then(Session::primary)
            .ok_or(WalletError::Locked)
    }

    pub fn accounts(&self) -> WalletResult<Vec<Account>> {
        self.session()
            .as_ref()
            .map(|s| s.registry.accounts().to_vec())
            .ok_or(WalletError::Locked)
    }

    /// Derive and register the next account from the recovery phrase.
    pub fn add_account(&self) -> WalletResult<Account> {
        let mut guard = self.session_mut();
        let session = guard.as_mut().ok_or(WalletError::Locked)?;
        let mnemonic = session.mnemonic.as_ref().ok_or_else(|| {
            WalletError::Validation(
                "Wallets imported from a private key have a single account".to_string(),
            )
        })?;

        let index = session.registry.next_index();
        let batch = AccountRegistry::derive_many(mnemonic, None, 1, index);
        if let Some((_, e)) = batch.error {
            return Err(e.into());
        }
        let Some((_, key_pair)) = batch.accounts.into_iter().next() else {
            return Err(WalletError::Validation(format!("No account derived at index {}", index)));
        };

        let address = key_pair.address();
        if session.registry.is_address_exists(&address.to_string()) {
            return Err(WalletError::Validation(format!("Account {} already exists", address)));
        }
        let account = session.registry.create_account(address, index);
        session.keys.insert(address, key_pair);
        tracing::info!(address = %address, index, "Account added");
        Ok(account)
    }

    fn key_for(&self, address: &Address) -> WalletResult<KeyPair> {
        let guard = self.session();
        let session = guard.as_ref().ok_or(WalletError::Locked)?;
        session
            .keys
            .get(address)
            .cloned()
            .ok_or_else(|| WalletError::Validation(format!("Unknown account {}", address)))
    }

    /// Balance in wei of `address`, or of account 0.
    pub async fn balance(&self, address: Option<Address>) -> WalletResult<U256> {
        let address = match address {
            Some(address) => address,
            None => self.address()?,
        };
        Ok(self.client.get_balance(address).await?)
    }

    pub async fn gas_quote(&self) -> WalletResult<GasQuote> {
        self.builder.gas_quote().await
    }

    /// Send `amount` wei from account 0.
    pub async fn send(&self, to: &str, amount: U256, speed: GasSpeed) -> WalletResult<TxHash> {
        let from = self.address()?;
        self.transfer(from, to, amount, speed, None).await
    }

    /// Validate, price, check funds, sign and broadcast a transfer.
    pub async fn send_from(
        &self,
        from: Address,
        to: &str,
        amount: U256,
        speed: GasSpeed,
    ) -> WalletResult<TxHash> {
        self.transfer(from, to, amount, speed, None).await
    }

    /// Send from account 0 with a caller-chosen gas limit, skipping
    /// estimation. The fallback after [`WalletError::GasEstimation`].
    pub async fn send_with_gas_limit(
        &self,
        to: &str,
        amount: U256,
        speed: GasSpeed,
        gas_limit: u64,
    ) -> WalletResult<TxHash> {
        if gas_limit < MIN_TRANSFER_GAS {
            return Err(WalletError::Validation(format!(
                "Gas limit must be at least {}",
                MIN_TRANSFER_GAS
            )));
        }
        let from = self.address()?;
        self.transfer(from, to, amount, speed, Some(gas_limit)).await
    }

    /// Configured gas limit offered when estimation fails.
    pub fn default_gas_limit(&self) -> u64 {
        self.builder.default_gas_limit()
    }

    async fn transfer(
        &self,
        from: Address,
        to: &str,
        amount: U256,
        speed: GasSpeed,
        gas_limit: Option<u64>,
    ) -> WalletResult<TxHash> {
        let key_pair = self.key_for(&from)?;
        let draft = self.builder.build(from, to, amount, None, gas_limit)?;

        let gas_limit = match gas_limit {
            Some(limit) => limit,
            None => self.builder.estimate_gas(&draft).await?,
        };
        let gas_price = self.builder.gas_quote().await?.tier(speed).price;
        self.builder.check_gas_price(gas_price)?;

        let cost = total_cost(gas_limit, gas_price, amount);
        let balance = self.client.get_balance(from).await?;
        if balance < cost {
            return Err(WalletError::InsufficientFunds(format!(
                "need {} ETH, have {} ETH",
                format_ether(cost),
                format_ether(balance)
            )));
        }

        let request = TransferRequest {
            gas_limit: Some(gas_limit),
            gas_price: Some(gas_price),
            ..draft
        };
        self.submitter.sign_and_send(&request, &key_pair).await
    }

    /// Local history, optionally filtered by address.
    pub fn history(&self, address: Option<Address>) -> Vec<TransactionRecord> {
        self.ledger.list(address.as_ref())
    }

    pub fn transaction(&self, hash: &TxHash) -> Option<TransactionRecord> {
        self.ledger.get(hash)
    }

    /// Wait for the configured confirmation depth, then settle the record.
    pub async fn wait_for_confirmation(
        &self,
        hash: TxHash,
    ) -> WalletResult<Option<TransactionRecord>> {
        self.client
            .wait_for_receipt(hash, self.confirmation_blocks, self.receipt_timeout)
            .await?;
        self.monitor.check_one(hash).await
    }

    /// Probe the chain client and refresh the RPC health gauge.
    pub async fn is_healthy(&self) -> bool {
        self.client.is_healthy().await
    }

    pub fn monitor(&self) -> &StatusMonitor {
        &self.monitor
    }

    /// Start the status monitor at the configured cadence, if enabled.
    pub fn start_monitor(&self) {
        if self.monitor_enabled {
            self.monitor.start(self.monitor_interval);
        } else {
            tracing::info!("Status monitor disabled");
        }
    }

    /// Erase the vault and the transaction history.
    pub fn wipe(&self) -> WalletResult<()> {
        self.monitor.stop();
        self.lock();
        self.vault.wipe()?;
        self.ledger.clear()?;
        self.throttle.record_success();
        Ok(())
    }
}

impl std::fmt::Debug for WalletService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletService")
            .field("state", &self.state())
            .field("monitor", &self.monitor)
            .finish()
    }
}
