//! Chain client contract and its JSON-RPC implementation.
//!
//! # Responsibilities
//! - Define the node queries the wallet relies on ([`ChainClient`])
//! - Connect to JSON-RPC endpoints with failover
//! - Bound every call with a timeout
//! - Translate node rejections into typed errors

use alloy::primitives::{keccak256, Address, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::{RpcError, TransportErrorKind};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};

use crate::blockchain::types::{
    resolve_broadcast_refusal, BlockchainConfig, BlockchainError, BlockchainResult, ChainReceipt,
};
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;

const RECEIPT_POLL_BASE_MS: u64 = 500;
const RECEIPT_POLL_MAX_MS: u64 = 5_000;

/// Node queries the wallet depends on.
///
/// Every method is a suspension point; callers must not assume ordering
/// between concurrent calls.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_chain_id(&self) -> BlockchainResult<u64>;

    async fn get_block_number(&self) -> BlockchainResult<u64>;

    async fn get_balance(&self, address: Address) -> BlockchainResult<U256>;

    /// Next nonce for `address`, counting pending transactions.
    async fn get_nonce(&self, address: Address) -> BlockchainResult<u64>;

    /// Current gas price sample in wei.
    async fn get_base_fee(&self) -> BlockchainResult<u128>;

    /// Fails with [`BlockchainError::GasEstimation`] when the node rejects
    /// the call itself, and with a network error otherwise.
    async fn estimate_gas(&self, request: &TransactionRequest) -> BlockchainResult<u64>;

    /// Submit an EIP-2718 encoded signed transaction.
    async fn broadcast(&self, raw_tx: &[u8]) -> BlockchainResult<TxHash>;

    async fn get_receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<ChainReceipt>>;

    /// Whether the node answers at all. Updates the RPC health gauge.
    async fn is_healthy(&self) -> bool {
        let healthy = self.get_block_number().await.is_ok();
        metrics::record_rpc_health(healthy);
        healthy
    }

    /// Poll until the transaction has `confirmations` blocks on top of and
    /// including its own, or `timeout_after` elapses.
    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        confirmations: u32,
        timeout_after: Duration,
    ) -> BlockchainResult<ChainReceipt> {
        let deadline = Instant::now() + timeout_after;
        let mut attempt = 0u32;

        loop {
            match self.get_receipt(tx_hash).await {
                Ok(Some(receipt)) => match self.get_block_number().await {
                    Ok(head) => {
                        let depth = receipt
                            .block_number
                            .map(|b| head.saturating_sub(b) + 1)
                            .unwrap_or(0);
                        if depth >= u64::from(confirmations) {
                            return Ok(receipt);
                        }
                        tracing::debug!(
                            tx_hash = %tx_hash,
                            confirmations = depth,
                            required = confirmations,
                            "Waiting for confirmations"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(tx_hash = %tx_hash, error = %e, "Block number lookup failed")
                    }
                },
                Ok(None) => tracing::debug!(tx_hash = %tx_hash, "Transaction pending"),
                Err(e) => tracing::warn!(tx_hash = %tx_hash, error = %e, "Receipt lookup failed"),
            }

            attempt = attempt.saturating_add(1);
            let delay = calculate_backoff(attempt, RECEIPT_POLL_BASE_MS, RECEIPT_POLL_MAX_MS);
            if Instant::now() + delay > deadline {
                return Err(BlockchainError::ConfirmationTimeout(confirmations));
            }
            sleep(delay).await;
        }
    }
}

type SharedProvider = Arc<dyn Provider + Send + Sync>;

/// JSON-RPC chain client with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// List of providers (primary + failovers).
    providers: Vec<SharedProvider>,
    config: BlockchainConfig,
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a new blockchain client.
    ///
    /// Succeeds even when the node is unreachable; a chain ID mismatch is
    /// logged, not fatal.
    pub async fn new(config: BlockchainConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers
            .push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as SharedProvider);

        for url_str in &config.failover_urls {
            match url_str.parse::<url::Url>() {
                Ok(url) => {
                    let provider = ProviderBuilder::new().connect_http(url);
                    providers.push(Arc::new(provider) as SharedProvider)
                }
                Err(_) => tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL"),
            }
        }

        let client = Self {
            providers,
            config: config.clone(),
            timeout_duration,
        };

        match client.verify_chain_id().await {
            Ok(()) => tracing::info!(
                rpc_url = %config.rpc_url,
                chain_id = config.chain_id,
                "Blockchain client initialized"
            ),
            Err(e) => tracing::warn!(
                error = %e,
                "Blockchain client initialized but chain verification failed"
            ),
        }

        Ok(client)
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let chain_id = self.get_chain_id().await?;
        if chain_id != self.config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id,
            });
        }
        Ok(())
    }

    pub fn config(&self) -> &BlockchainConfig {
        &self.config
    }

    /// Run `call` against each provider in turn.
    ///
    /// Transport failures and timeouts move on to the next provider. A
    /// JSON-RPC error response means the node understood and refused the
    /// request, so it is returned at once through `on_refusal`. When every
    /// provider timed out the result is [`BlockchainError::Timeout`].
    async fn with_failover<T, F, Fut>(
        &self,
        op: &'static str,
        call: F,
        on_refusal: fn(String) -> BlockchainError,
    ) -> BlockchainResult<T>
    where
        F: Fn(SharedProvider) -> Fut,
        Fut: Future<Output = Result<T, RpcError<TransportErrorKind>>>,
    {
        let mut all_timed_out = true;
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, call(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(RpcError::ErrorResp(payload))) => {
                    tracing::debug!(
                        op,
                        provider_idx = i,
                        code = payload.code,
                        "Node refused request"
                    );
                    return Err(on_refusal(payload.message.to_string()));
                }
                Ok(Err(e)) => {
                    all_timed_out = false;
                    tracing::warn!(
                        op,
                        provider_idx = i,
                        error = %e,
                        "RPC error, trying next provider"
                    )
                }
                Err(_) => tracing::warn!(op, provider_idx = i, "RPC timeout, trying next provider"),
            }
        }
        if all_timed_out {
            return Err(BlockchainError::Timeout(self.config.rpc_timeout_secs));
        }
        Err(BlockchainError::Rpc(format!("All RPC providers failed: {}", op)))
    }
}

#[async_trait]
impl ChainClient for BlockchainClient {
    async fn get_chain_id(&self) -> BlockchainResult<u64> {
        self.with_failover(
            "eth_chainId",
            |p| async move { p.get_chain_id().await },
            BlockchainError::Rpc,
        )
        .await
    }

    async fn get_block_number(&self) -> BlockchainResult<u64> {
        self.with_failover(
            "eth_blockNumber",
            |p| async move { p.get_block_number().await },
            BlockchainError::Rpc,
        )
        .await
    }

    async fn get_balance(&self, address: Address) -> BlockchainResult<U256> {
        self.with_failover(
            "eth_getBalance",
            move |p| async move { p.get_balance(address).await },
            BlockchainError::Rpc,
        )
        .await
    }

    async fn get_nonce(&self, address: Address) -> BlockchainResult<u64> {
        self.with_failover(
            "eth_getTransactionCount",
            move |p| async move { p.get_transaction_count(address).pending().await },
            BlockchainError::Rpc,
        )
        .await
    }

    async fn get_base_fee(&self) -> BlockchainResult<u128> {
        self.with_failover(
            "eth_gasPrice",
            |p| async move { p.get_gas_price().await },
            BlockchainError::Rpc,
        )
        .await
    }

    async fn estimate_gas(&self, request: &TransactionRequest) -> BlockchainResult<u64> {
        self.with_failover(
            "eth_estimateGas",
            |p| {
                let request = request.clone();
                async move { p.estimate_gas(request).await }
            },
            BlockchainError::GasEstimation,
        )
        .await
    }

    /// A provider that failed at the transport level may still have
    /// forwarded the payload, so a later "already known" answer counts as
    /// accepted under the locally computed hash.
    async fn broadcast(&self, raw_tx: &[u8]) -> BlockchainResult<TxHash> {
        let local_hash = keccak256(raw_tx);
        let mut forwarded = false;

        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.send_raw_transaction(raw_tx)).await {
                Ok(Ok(pending)) => {
                    let tx_hash = *pending.tx_hash();
                    tracing::info!(tx_hash = %tx_hash, provider_idx = i, "Transaction broadcast");
                    return Ok(tx_hash);
                }
                Ok(Err(RpcError::ErrorResp(payload))) => {
                    let tx_hash =
                        resolve_broadcast_refusal(&payload.message, forwarded, local_hash)?;
                    tracing::info!(
                        tx_hash = %tx_hash,
                        provider_idx = i,
                        "Transaction already known after failover"
                    );
                    return Ok(tx_hash);
                }
                Ok(Err(e)) => {
                    forwarded = true;
                    tracing::warn!(
                        provider_idx = i,
                        error = %e,
                        "Broadcast error, trying next provider"
                    )
                }
                Err(_) => {
                    forwarded = true;
                    tracing::warn!(provider_idx = i, "Broadcast timeout, trying next provider")
                }
            }
        }
        Err(BlockchainError::Rpc(
            "All RPC providers failed: eth_sendRawTransaction".to_string(),
        ))
    }

    async fn get_receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<ChainReceipt>> {
        let receipt = self
            .with_failover(
                "eth_getTransactionReceipt",
                move |p| async move { p.get_transaction_receipt(tx_hash).await },
                BlockchainError::Rpc,
            )
            .await?;

        Ok(receipt.map(|r| ChainReceipt {
            status: u64::from(r.status()),
            gas_used: r.gas_used,
            effective_gas_price: Some(r.effective_gas_price),
            block_number: r.block_number,
        }))
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("failover_urls", &self.config.failover_urls.len())
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accepts connections and never answers.
    async fn silent_node() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{}", addr)
    }

    /// Answers every JSON-RPC request with an error carrying `message`.
    async fn refusing_node(message: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 4096];
                    loop {
                        let n = socket.read(&mut chunk).await.unwrap_or(0);
                        if n == 0 {
                            return;
                        }
                        buf.extend_from_slice(&chunk[..n]);
                        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                            continue;
                        };
                        let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                        let len = headers
                            .lines()
                            .find_map(|l| l.strip_prefix("content-length:"))
                            .and_then(|v| v.trim().parse::<usize>().ok())
                            .unwrap_or(0);
                        if buf.len() < end + 4 + len {
                            continue;
                        }
                        let body = &buf[end + 4..end + 4 + len];
                        let request: serde_json::Value =
                            serde_json::from_slice(body).unwrap_or_default();
                        let reply = serde_json::json!({
                            "jsonrpc": "2.0",
                            "id": request["id"],
                            "error": { "code": -32000, "message": message },
                        })
                        .to_string();
                        let response = format!(
                            "HTTP/1.1 200 OK\r\n\
                             content-type: application/json\r\n\
                             content-length: {}\r\n\r\n{}",
                            reply.len(),
                            reply
                        );
                        if socket.write_all(response.as_bytes()).await.is_err() {
                            return;
                        }
                        buf.clear();
                    }
                });
            }
        });
        format!("http://{}", addr)
    }

    fn test_config() -> BlockchainConfig {
        BlockchainConfig {
            rpc_url: "http://127.0.0.1:1".to_string(),
            failover_urls: Vec::new(),
            chain_id: 31337, // Anvil default
            rpc_timeout_secs: 1,
            ..BlockchainConfig::default()
        }
    }

    #[tokio::test]
    async fn test_client_creation_tolerates_unreachable_node() {
        let result = BlockchainClient::new(test_config()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_primary_url() {
        let mut config = test_config();
        config.rpc_url = "not a url".to_string();
        assert!(matches!(
            BlockchainClient::new(config).await,
            Err(BlockchainError::Rpc(_))
        ));
    }

    #[tokio::test]
    async fn test_rpc_failover_exhausts_providers() {
        let mut config = test_config();
        config.failover_urls.push("http://127.0.0.1:2".to_string());
        config.failover_urls.push("::garbage::".to_string());

        let client = BlockchainClient::new(config).await.unwrap();
        assert_eq!(client.providers.len(), 2);

        let err = client.get_chain_id().await.unwrap_err();
        assert!(err.to_string().contains("All RPC providers failed"));
        assert!(!client.is_healthy().await);
    }

    #[tokio::test]
    async fn test_every_provider_timing_out_is_a_timeout() {
        let mut config = test_config();
        config.rpc_url = silent_node().await;

        let client = BlockchainClient::new(config).await.unwrap();
        assert!(matches!(client.get_chain_id().await, Err(BlockchainError::Timeout(1))));
    }

    #[tokio::test]
    async fn test_broadcast_known_after_failover_is_accepted() {
        let mut config = test_config();
        config.rpc_url = silent_node().await;
        config.failover_urls.push(refusing_node("already known").await);

        let client = BlockchainClient::new(config).await.unwrap();
        let raw = [0x02u8, 0xc0];
        assert_eq!(client.broadcast(&raw).await.unwrap(), keccak256(raw));
    }

    #[tokio::test]
    async fn test_broadcast_refused_by_first_provider() {
        let mut config = test_config();
        config.rpc_url = refusing_node("already known").await;

        let client = BlockchainClient::new(config).await.unwrap();
        assert!(matches!(
            client.broadcast(&[0x02, 0xc0]).await,
            Err(BlockchainError::Broadcast(_))
        ));
    }
}
