//! Pending transaction reconciliation.
//!
//! # Responsibilities
//! - Poll receipts for pending records on a fixed cadence
//! - Settle each record at most once (pending → success/failed)
//! - Notify subscribers only on an observed transition
//! - Refresh the RPC health gauge every tick

use alloy::primitives::TxHash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::blockchain::ChainClient;
use crate::error::WalletResult;
use crate::lifecycle::Shutdown;
use crate::monitor::events::{EventKind, MonitorEvent, SubscriberError, Subscribers, SubscriptionId};
use crate::observability::metrics;
use crate::transactions::{TransactionLedger, TransactionRecord, TxStatus};

struct Shared {
    ledger: Arc<TransactionLedger>,
    client: Arc<dyn ChainClient>,
    subscribers: Subscribers,
    /// Bumped on every start and stop; a tick only acts while the value it
    /// was started with is current.
    generation: AtomicU64,
}

struct RunningTask {
    shutdown: Shutdown,
    handle: JoinHandle<()>,
}

/// Polls the chain for pending records and notifies subscribers.
pub struct StatusMonitor {
    shared: Arc<Shared>,
    task: Mutex<Option<RunningTask>>,
}

impl StatusMonitor {
    pub fn new(ledger: Arc<TransactionLedger>, client: Arc<dyn ChainClient>) -> Self {
        Self {
            shared: Arc::new(Shared {
                ledger,
                client,
                subscribers: Subscribers::default(),
                generation: AtomicU64::new(0),
            }),
            task: Mutex::new(None),
        }
    }

    /// Start polling every `interval`. The first tick runs immediately.
    ///
    /// No-op if already running or if `interval` is zero. Must be called
    /// inside a Tokio runtime.
    pub fn start(&self, interval: Duration) {
        if interval.is_zero() {
            tracing::error!("Status monitor interval must be non-zero, not starting");
            return;
        }
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            tracing::debug!("Status monitor already running");
            return;
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let shutdown = Shutdown::new();
        let mut stop = shutdown.subscribe();
        let shared = self.shared.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => shared.tick(generation).await,
                    _ = stop.recv() => {
                        tracing::info!("Status monitor received stop signal, exiting loop");
                        break;
                    }
                }
            }
        });

        tracing::info!(interval_ms = interval.as_millis() as u64, "Status monitor started");
        *task = Some(RunningTask { shutdown, handle });
    }

    /// Stop polling without waiting for an in-flight tick. Idempotent.
    ///
    /// A tick already running notices the stop before its next record and
    /// returns; a receipt it was waiting on is discarded.
    pub fn stop(&self) {
        let Some(task) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() else {
            return;
        };
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        task.shutdown.trigger();
        tracing::info!("Status monitor stopped");
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Reconcile one record now, outside the polling cadence.
    ///
    /// Returns the record as it stands afterwards, or `None` if the hash is
    /// unknown.
    pub async fn check_one(&self, hash: TxHash) -> WalletResult<Option<TransactionRecord>> {
        match self.shared.ledger.get(&hash) {
            None => Ok(None),
            Some(record) if record.status.is_terminal() => Ok(Some(record)),
            Some(_) => self.shared.reconcile(hash, None).await,
        }
    }

    /// Run one polling pass now. Used by callers that drive the cadence
    /// themselves.
    pub async fn poll_once(&self) {
        let generation = self.shared.generation.load(Ordering::SeqCst);
        self.shared.tick(generation).await;
    }

    /// Register `callback` for `kind` events.
    pub fn on<F>(&self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&MonitorEvent) -> Result<(), SubscriberError> + Send + Sync + 'static,
    {
        self.shared.subscribers.subscribe(kind, callback)
    }

    pub fn off(&self, id: SubscriptionId) -> bool {
        self.shared.subscribers.unsubscribe(id)
    }
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    async fn tick(&self, generation: u64) {
        if !self.is_current(generation) {
            return;
        }
        if !self.client.is_healthy().await {
            tracing::warn!("Chain client unreachable");
        }
        let pending = self.ledger.pending();
        metrics::record_pending_transactions(pending.len());
        if pending.is_empty() {
            return;
        }
        tracing::debug!(pending = pending.len(), "Reconciling pending transactions");

        for record in pending {
            if !self.is_current(generation) {
                tracing::debug!("Status monitor stopped mid-tick");
                return;
            }
            if let Err(e) = self.reconcile(record.hash, Some(generation)).await {
                tracing::warn!(tx_hash = %record.hash, error = %e, "Reconciliation failed");
            }
        }
    }

    /// Settle `hash` from its receipt. With a `generation`, a receipt that
    /// arrives after a stop is dropped.
    async fn reconcile(
        &self,
        hash: TxHash,
        generation: Option<u64>,
    ) -> WalletResult<Option<TransactionRecord>> {
        let Some(receipt) = self.client.get_receipt(hash).await? else {
            return Ok(self.ledger.get(&hash));
        };
        if generation.is_some_and(|g| !self.is_current(g)) {
            tracing::debug!(tx_hash = %hash, "Discarding receipt fetched before stop");
            return Ok(self.ledger.get(&hash));
        }

        match self.ledger.apply_receipt(&hash, &receipt)? {
            Some((record, old_status)) => {
                metrics::record_transaction_status(record.status.as_str());
                tracing::info!(
                    tx_hash = %hash,
                    old_status = %old_status,
                    status = %record.status,
                    block_number = ?record.block_number,
                    gas_used = record.gas_used,
                    "Transaction settled"
                );
                self.subscribers.emit(&MonitorEvent::StatusChange {
                    record: record.clone(),
                    old_status,
                });
                if record.status == TxStatus::Success {
                    self.subscribers.emit(&MonitorEvent::BalanceUpdate {
                        record: record.clone(),
                    });
                }
                Ok(Some(record))
            }
            // Settled concurrently or unknown; report what the ledger holds.
            None => Ok(self.ledger.get(&hash)),
        }
    }
}

impl Drop for StatusMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for StatusMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusMonitor")
            .field("running", &self.is_running())
            .field("subscribers", &self.shared.subscribers.len())
            .finish()
    }
}
