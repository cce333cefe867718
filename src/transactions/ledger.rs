//! Local transaction history.
//!
//! Records are keyed by hash and only ever appended or merged into. The
//! whole list is rewritten to storage on every change, before the call
//! returns.

use alloy::primitives::{Address, TxHash};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::blockchain::ChainReceipt;
use crate::error::{WalletError, WalletResult};
use crate::storage::{self, keys, KeyValueStore};
use crate::transactions::types::{RecordUpdate, TransactionRecord, TxStatus};

/// Transaction history over a [`KeyValueStore`].
pub struct TransactionLedger {
    store: Arc<dyn KeyValueStore>,
    records: Mutex<Vec<TransactionRecord>>,
}

impl TransactionLedger {
    /// Load the history persisted in `store`.
    pub fn open(store: Arc<dyn KeyValueStore>) -> WalletResult<Self> {
        let records: Vec<TransactionRecord> =
            storage::get_json(store.as_ref(), keys::LEDGER_TRANSACTIONS)?.unwrap_or_default();
        tracing::debug!(records = records.len(), "Transaction ledger loaded");
        Ok(Self {
            store,
            records: Mutex::new(records),
        })
    }

    fn records(&self) -> MutexGuard<'_, Vec<TransactionRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, records: &[TransactionRecord]) -> WalletResult<()> {
        storage::set_json(self.store.as_ref(), keys::LEDGER_TRANSACTIONS, records)?;
        Ok(())
    }

    /// Append a new record. Hashes are unique.
    pub fn save(&self, record: TransactionRecord) -> WalletResult<()> {
        let mut records = self.records();
        if records.iter().any(|r| r.hash == record.hash) {
            return Err(WalletError::Validation(format!(
                "Transaction {} already recorded",
                record.hash
            )));
        }
        records.push(record);
        if let Err(e) = self.persist(&records) {
            records.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Merge `update` into the record for `hash`.
    ///
    /// A terminal status is never replaced; the other fields still merge.
    /// Returns the record after the merge, or `None` for an unknown hash.
    pub fn update(
        &self,
        hash: &TxHash,
        update: RecordUpdate,
    ) -> WalletResult<Option<TransactionRecord>> {
        let mut records = self.records();
        let Some(pos) = records.iter().position(|r| r.hash == *hash) else {
            return Ok(None);
        };

        let previous = records[pos].clone();
        let record = &mut records[pos];
        if let Some(status) = update.status {
            if record.status.is_terminal() && status != record.status {
                tracing::debug!(
                    tx_hash = %hash,
                    current = %record.status,
                    requested = %status,
                    "Ignoring status change on terminal record"
                );
            } else {
                record.status = status;
            }
        }
        if let Some(gas_used) = update.gas_used {
            record.gas_used = gas_used;
        }
        if let Some(gas_price) = update.gas_price {
            record.gas_price = gas_price;
        }
        if let Some(block_number) = update.block_number {
            record.block_number = Some(block_number);
        }
        let updated = record.clone();

        if let Err(e) = self.persist(&records) {
            records[pos] = previous;
            return Err(e);
        }
        Ok(Some(updated))
    }

    /// Settle a pending record from its receipt.
    ///
    /// Returns the settled record and its previous status only when this
    /// call performed the transition; records that are unknown or already
    /// terminal yield `None`.
    pub fn apply_receipt(
        &self,
        hash: &TxHash,
        receipt: &ChainReceipt,
    ) -> WalletResult<Option<(TransactionRecord, TxStatus)>> {
        let mut records = self.records();
        let Some(pos) = records.iter().position(|r| r.hash == *hash) else {
            return Ok(None);
        };
        if records[pos].status.is_terminal() {
            return Ok(None);
        }

        let previous = records[pos].clone();
        let record = &mut records[pos];
        record.status = if receipt.succeeded() {
            TxStatus::Success
        } else {
            TxStatus::Failed
        };
        record.gas_used = receipt.gas_used;
        if let Some(price) = receipt.effective_gas_price {
            record.gas_price = price;
        }
        record.block_number = receipt.block_number;
        let settled = record.clone();

        if let Err(e) = self.persist(&records) {
            records[pos] = previous;
            return Err(e);
        }
        Ok(Some((settled, previous.status)))
    }

    pub fn get(&self, hash: &TxHash) -> Option<TransactionRecord> {
        self.records().iter().find(|r| r.hash == *hash).cloned()
    }

    /// All records, or those sent from or to `address`, oldest first.
    pub fn list(&self, address: Option<&Address>) -> Vec<TransactionRecord> {
        let records = self.records();
        match address {
            Some(address) => records.iter().filter(|r| r.involves(address)).cloned().collect(),
            None => records.clone(),
        }
    }

    /// Records still waiting for a receipt.
    pub fn pending(&self) -> Vec<TransactionRecord> {
        self.records()
            .iter()
            .filter(|r| r.status == TxStatus::Pending)
            .cloned()
            .collect()
    }

    /// Drop the whole history.
    pub fn clear(&self) -> WalletResult<()> {
        let mut records = self.records();
        self.store.remove(keys::LEDGER_TRANSACTIONS)?;
        records.clear();
        tracing::info!("Transaction history cleared");
        Ok(())
    }
}

impl std::fmt::Debug for TransactionLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionLedger")
            .field("records", &self.records().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{B256, U256};

    use crate::storage::MemoryStore;

    fn record(byte: u8, from: Address, to: Address) -> TransactionRecord {
        TransactionRecord {
            hash: B256::repeat_byte(byte),
            from,
            to,
            value: U256::from(1u64),
            gas_used: 0,
            gas_price: 1_000_000_000,
            status: TxStatus::Pending,
            timestamp: 1_700_000_000,
            block_number: None,
            nonce: u64::from(byte),
        }
    }

    fn receipt(status: u64) -> ChainReceipt {
        ChainReceipt {
            status,
            gas_used: 21_000,
            effective_gas_price: Some(2_000_000_000),
            block_number: Some(42),
        }
    }

    #[test]
    fn test_save_persists_and_rejects_duplicates() {
        let backend = MemoryStore::new();
        let ledger = TransactionLedger::open(Arc::new(backend.clone())).unwrap();
        let r = record(1, Address::repeat_byte(0xaa), Address::repeat_byte(0xbb));

        ledger.save(r.clone()).unwrap();
        assert!(matches!(ledger.save(r.clone()), Err(WalletError::Validation(_))));

        let reopened = TransactionLedger::open(Arc::new(backend)).unwrap();
        assert_eq!(reopened.get(&r.hash), Some(r));
        assert_eq!(reopened.list(None).len(), 1);
    }

    #[test]
    fn test_update_merges_fields() {
        let ledger = TransactionLedger::open(Arc::new(MemoryStore::new())).unwrap();
        let r = record(2, Address::repeat_byte(0xaa), Address::repeat_byte(0xbb));
        ledger.save(r.clone()).unwrap();

        let updated = ledger
            .update(
                &r.hash,
                RecordUpdate {
                    gas_used: Some(21_000),
                    ..RecordUpdate::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.gas_used, 21_000);
        assert_eq!(updated.gas_price, r.gas_price);
        assert_eq!(updated.status, TxStatus::Pending);

        assert!(ledger
            .update(&B256::repeat_byte(9), RecordUpdate::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_terminal_status_is_absorbing() {
        let ledger = TransactionLedger::open(Arc::new(MemoryStore::new())).unwrap();
        let r = record(3, Address::repeat_byte(0xaa), Address::repeat_byte(0xbb));
        ledger.save(r.clone()).unwrap();

        let (settled, old) = ledger.apply_receipt(&r.hash, &receipt(0)).unwrap().unwrap();
        assert_eq!(old, TxStatus::Pending);
        assert_eq!(settled.status, TxStatus::Failed);
        assert_eq!(settled.block_number, Some(42));
        assert_eq!(settled.gas_price, 2_000_000_000);

        // Neither a second receipt nor an explicit update can move it.
        assert!(ledger.apply_receipt(&r.hash, &receipt(1)).unwrap().is_none());
        let after = ledger
            .update(
                &r.hash,
                RecordUpdate {
                    status: Some(TxStatus::Pending),
                    ..RecordUpdate::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(after.status, TxStatus::Failed);
    }

    #[test]
    fn test_list_filters_case_insensitively() {
        let ledger = TransactionLedger::open(Arc::new(MemoryStore::new())).unwrap();
        let alice = Address::repeat_byte(0xaa);
        let bob = Address::repeat_byte(0xbb);
        let carol = Address::repeat_byte(0xcc);
        ledger.save(record(1, alice, bob)).unwrap();
        ledger.save(record(2, bob, carol)).unwrap();
        ledger.save(record(3, carol, alice)).unwrap();

        // Address equality is on bytes, so any textual casing matches.
        let upper: Address = format!("0x{}", "AA".repeat(20)).parse().unwrap();
        assert_eq!(ledger.list(Some(&upper)).len(), 2);
        assert_eq!(ledger.list(Some(&bob)).len(), 2);
        assert_eq!(ledger.list(None).len(), 3);
    }

    #[test]
    fn test_pending_and_clear() {
        let backend = MemoryStore::new();
        let ledger = TransactionLedger::open(Arc::new(backend.clone())).unwrap();
        let a = record(1, Address::repeat_byte(1), Address::repeat_byte(2));
        let b = record(2, Address::repeat_byte(1), Address::repeat_byte(2));
        ledger.save(a.clone()).unwrap();
        ledger.save(b).unwrap();
        ledger.apply_receipt(&a.hash, &receipt(1)).unwrap();

        assert_eq!(ledger.pending().len(), 1);

        ledger.clear().unwrap();
        assert!(ledger.list(None).is_empty());
        assert!(backend.get(keys::LEDGER_TRANSACTIONS).unwrap().is_none());
    }
}
