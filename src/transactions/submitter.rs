//! Signing and broadcast.
//!
//! # Security Constraints
//! - The private key is turned into a signer only for the duration of one
//!   signing call
//! - Never log private keys or raw signed payloads

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::TxHash;
use alloy::rpc::types::TransactionRequest;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::blockchain::{BlockchainError, ChainClient};
use crate::error::{WalletError, WalletResult};
use crate::keys::KeyPair;
use crate::observability::metrics;
use crate::transactions::ledger::TransactionLedger;
use crate::transactions::types::{TransactionRecord, TransferRequest, TxStatus};

/// Signs transfers and records them as pending once broadcast.
#[derive(Clone)]
pub struct Submitter {
    client: Arc<dyn ChainClient>,
    ledger: Arc<TransactionLedger>,
    chain_id: u64,
}

impl Submitter {
    pub fn new(
        client: Arc<dyn ChainClient>,
        ledger: Arc<TransactionLedger>,
        chain_id: u64,
    ) -> Self {
        Self {
            client,
            ledger,
            chain_id,
        }
    }

    /// Sign `request` with `key_pair`, broadcast it, and record it.
    ///
    /// The `pending` record is persisted before this returns. Nothing is
    /// recorded when signing or broadcast fails. If the record cannot be
    /// written after a broadcast, [`WalletError::Unrecorded`] carries the hash.
    pub async fn sign_and_send(
        &self,
        request: &TransferRequest,
        key_pair: &KeyPair,
    ) -> WalletResult<TxHash> {
        if key_pair.address() != request.from {
            return Err(WalletError::Validation(format!(
                "Key for {} cannot sign for {}",
                key_pair.address(),
                request.from
            )));
        }
        let gas_limit = request
            .gas_limit
            .ok_or_else(|| WalletError::Validation("Gas limit not set".to_string()))?;
        let gas_price = request
            .gas_price
            .ok_or_else(|| WalletError::Validation("Gas price not set".to_string()))?;

        let nonce = self.client.get_nonce(request.from).await?;

        let tx: TransactionRequest = request
            .to_rpc_request()
            .with_nonce(nonce)
            .with_chain_id(self.chain_id)
            .with_gas_limit(gas_limit)
            .with_gas_price(gas_price);

        let (raw, hash) = {
            let wallet = EthereumWallet::from(key_pair.signer()?);
            let envelope = tx
                .build(&wallet)
                .await
                .map_err(|e| BlockchainError::Signing(e.to_string()))?;
            (envelope.encoded_2718(), *envelope.tx_hash())
        };

        match self.client.broadcast(&raw).await {
            Ok(reported) if reported != hash => tracing::warn!(
                tx_hash = %hash,
                reported = %reported,
                "Node reported a different transaction hash"
            ),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    from = %request.from,
                    to = %request.to,
                    nonce,
                    error = %e,
                    "Broadcast failed"
                );
                return Err(e.into());
            }
        }

        let record = TransactionRecord {
            hash,
            from: request.from,
            to: request.to,
            value: request.value,
            gas_used: 0,
            gas_price,
            status: TxStatus::Pending,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            block_number: None,
            nonce,
        };
        if let Err(e) = self.ledger.save(record) {
            tracing::error!(
                tx_hash = %hash,
                error = %e,
                "Broadcast succeeded but the record was not saved"
            );
            return Err(WalletError::Unrecorded {
                tx_hash: hash,
                reason: e.to_string(),
            });
        }

        metrics::record_transaction_submitted();
        tracing::info!(
            tx_hash = %hash,
            from = %request.from,
            to = %request.to,
            nonce,
            gas_limit,
            gas_price,
            "Transaction submitted"
        );
        Ok(hash)
    }
}
