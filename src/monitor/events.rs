//! Typed subscriber registry for monitor notifications.
//!
//! A subscriber that returns an error or panics is logged and skipped; the
//! remaining subscribers still run.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::transactions::{TransactionRecord, TxStatus};

/// What a subscriber listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    StatusChange,
    BalanceUpdate,
}

/// A notification emitted by the status monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// A record moved from `old_status` to `record.status`.
    StatusChange {
        record: TransactionRecord,
        old_status: TxStatus,
    },
    /// A confirmed transfer may have changed balances.
    BalanceUpdate { record: TransactionRecord },
}

impl MonitorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MonitorEvent::StatusChange { .. } => EventKind::StatusChange,
            MonitorEvent::BalanceUpdate { .. } => EventKind::BalanceUpdate,
        }
    }

    pub fn record(&self) -> &TransactionRecord {
        match self {
            MonitorEvent::StatusChange { record, .. }
            | MonitorEvent::BalanceUpdate { record } => record,
        }
    }
}

/// Error type subscribers may return.
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

/// Subscriber callback.
pub type Callback = Arc<dyn Fn(&MonitorEvent) -> Result<(), SubscriberError> + Send + Sync>;

/// Handle returned by [`Subscribers::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Entry {
    id: SubscriptionId,
    kind: EventKind,
    callback: Callback,
}

#[derive(Default)]
pub struct Subscribers {
    next_id: AtomicU64,
    entries: Mutex<Vec<Entry>>,
}

impl Subscribers {
    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&MonitorEvent) -> Result<(), SubscriberError> + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Entry { id, kind, callback });
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every matching subscriber in registration order.
    ///
    /// Callbacks run outside the registry lock, so they may subscribe or
    /// unsubscribe.
    pub fn emit(&self, event: &MonitorEvent) {
        let targets: Vec<(SubscriptionId, Callback)> = self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|entry| entry.kind == event.kind())
            .map(|entry| (entry.id, entry.callback.clone()))
            .collect();

        for (id, callback) in targets {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(
                    subscription = id.0,
                    tx_hash = %event.record().hash,
                    error = %e,
                    "Monitor subscriber failed"
                ),
                Err(_) => tracing::error!(
                    subscription = id.0,
                    tx_hash = %event.record().hash,
                    "Monitor subscriber panicked"
                ),
            }
        }
    }
}
