//! Shared utilities for integration tests.

#![allow(dead_code)]

use alloy::primitives::{keccak256, Address, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use custody_wallet::blockchain::{BlockchainError, BlockchainResult, ChainClient, ChainReceipt};
use custody_wallet::storage::MemoryStore;
use custody_wallet::{WalletConfig, WalletService};

pub const PASSWORD: &str = "Passw0rd1";
pub const DEV_PHRASE: &str = "test test test test test test test test test test test junk";
pub const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

pub const GWEI: u128 = 1_000_000_000;

pub fn ether(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
}

/// Programmable in-memory chain.
pub struct FakeChain {
    pub balance: Mutex<U256>,
    pub base_fee: Mutex<u128>,
    pub block_number: AtomicU64,
    pub nonce: AtomicU64,
    /// Next results of `estimate_gas`; falls back to 21 000 when empty.
    pub estimates: Mutex<VecDeque<BlockchainResult<u64>>>,
    /// Next results of `broadcast`; falls back to accepting when empty.
    pub broadcast_failures: Mutex<VecDeque<BlockchainError>>,
    pub receipts: Mutex<HashMap<TxHash, ChainReceipt>>,
    pub broadcasts: Mutex<Vec<Vec<u8>>>,
    pub estimate_calls: AtomicUsize,
    pub receipt_calls: AtomicUsize,
    /// `get_block_number` fails while false.
    pub healthy: AtomicBool,
    /// While set, `get_receipt` blocks until `release_receipts`.
    pub holding_receipts: AtomicBool,
    pub receipt_release: Notify,
}

impl FakeChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            balance: Mutex::new(ether(10)),
            base_fee: Mutex::new(10 * GWEI),
            block_number: AtomicU64::new(100),
            nonce: AtomicU64::new(0),
            estimates: Mutex::new(VecDeque::new()),
            broadcast_failures: Mutex::new(VecDeque::new()),
            receipts: Mutex::new(HashMap::new()),
            broadcasts: Mutex::new(Vec::new()),
            estimate_calls: AtomicUsize::new(0),
            receipt_calls: AtomicUsize::new(0),
            healthy: AtomicBool::new(true),
            holding_receipts: AtomicBool::new(false),
            receipt_release: Notify::new(),
        })
    }

    pub fn set_balance(&self, wei: U256) {
        *self.balance.lock().unwrap() = wei;
    }

    pub fn set_base_fee(&self, wei: u128) {
        *self.base_fee.lock().unwrap() = wei;
    }

    pub fn fail_next_estimate(&self, error: BlockchainError) {
        self.estimates.lock().unwrap().push_back(Err(error));
    }

    pub fn fail_next_broadcast(&self, error: BlockchainError) {
        self.broadcast_failures.lock().unwrap().push_back(error);
    }

    /// Mine `hash` with the given EIP-658 status.
    pub fn mine(&self, hash: TxHash, status: u64) {
        let block = self.block_number.fetch_add(1, Ordering::SeqCst) + 1;
        self.receipts.lock().unwrap().insert(
            hash,
            ChainReceipt {
                status,
                gas_used: 21_000,
                effective_gas_price: Some(10 * GWEI),
                block_number: Some(block),
            },
        );
    }

    pub fn hold_receipts(&self) {
        self.holding_receipts.store(true, Ordering::SeqCst);
    }

    pub fn release_receipts(&self) {
        self.holding_receipts.store(false, Ordering::SeqCst);
        self.receipt_release.notify_waiters();
    }

    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.lock().unwrap().len()
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn get_chain_id(&self) -> BlockchainResult<u64> {
        Ok(31337)
    }

    async fn get_block_number(&self) -> BlockchainResult<u64> {
        if !self.healthy.load(Ordering::SeqCst) {
            return Err(BlockchainError::Rpc("connection refused".to_string()));
        }
        Ok(self.block_number.load(Ordering::SeqCst))
    }

    async fn get_balance(&self, _address: Address) -> BlockchainResult<U256> {
        Ok(*self.balance.lock().unwrap())
    }

    async fn get_nonce(&self, _address: Address) -> BlockchainResult<u64> {
        Ok(self.nonce.load(Ordering::SeqCst))
    }

    async fn get_base_fee(&self) -> BlockchainResult<u128> {
        Ok(*self.base_fee.lock().unwrap())
    }

    async fn estimate_gas(&self, _request: &TransactionRequest) -> BlockchainResult<u64> {
        self.estimate_calls.fetch_add(1, Ordering::SeqCst);
        self.estimates.lock().unwrap().pop_front().unwrap_or(Ok(21_000))
    }

    async fn broadcast(&self, raw_tx: &[u8]) -> BlockchainResult<TxHash> {
        if let Some(error) = self.broadcast_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.broadcasts.lock().unwrap().push(raw_tx.to_vec());
        self.nonce.fetch_add(1, Ordering::SeqCst);
        Ok(keccak256(raw_tx))
    }

    async fn get_receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<ChainReceipt>> {
        let released = self.receipt_release.notified();
        tokio::pin!(released);
        released.as_mut().enable();
        self.receipt_calls.fetch_add(1, Ordering::SeqCst);
        if self.holding_receipts.load(Ordering::SeqCst) {
            released.await;
        }
        Ok(self.receipts.lock().unwrap().get(&tx_hash).copied())
    }
}

pub fn test_config() -> WalletConfig {
    let mut config = WalletConfig::default();
    config.blockchain.chain_id = 31337;
    config.blockchain.receipt_timeout_secs = 5;
    config.security.cooldown_secs = 1;
    config.monitor.interval_ms = 50;
    config
}

pub fn wallet(store: &MemoryStore, chain: &Arc<FakeChain>) -> WalletService {
    wallet_with(test_config(), store, chain)
}

pub fn wallet_with(
    config: WalletConfig,
    store: &MemoryStore,
    chain: &Arc<FakeChain>,
) -> WalletService {
    WalletService::new(&config, Arc::new(store.clone()), chain.clone()).unwrap()
}

/// Poll `check` until it returns true or `timeout` elapses.
pub async fn wait_until<F: Fn() -> bool>(timeout: Duration, check: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
