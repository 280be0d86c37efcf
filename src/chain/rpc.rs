use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{BlockNumberOrTag, Filter};
use alloy::sol;
use alloy::sol_types::SolEvent;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::retry::{retry_rpc, with_timeout, RetryPolicy};
use super::{ChainClient, TokenPage};
use crate::config::NetworkConfig;
use crate::error::ChainError;
use crate::tracker::decoder::{self, Receipt};
use crate::tracker::types::ReceiptLog;

sol! {
    #[sol(rpc)]
    interface ITokenList {
        function getActiveItems(uint256 offset, uint8 limit) external view returns (uint256 count, address[] items);
    }

    #[sol(rpc)]
    interface IERC20 {
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function balanceOf(address owner) external view returns (uint256);
    }
}

/// [`ChainClient`] backed by an HTTP JSON-RPC node.
pub struct RpcChainClient {
    network: String,
    provider: DynProvider,
    timeout: Duration,
    retry: RetryPolicy,
    /// Process-wide shutdown; aborts in-flight calls and retry backoff.
    shutdown: CancellationToken,
}

impl RpcChainClient {
    pub fn new(config: &NetworkConfig, shutdown: CancellationToken) -> eyre::Result<Self> {
        let url = config.rpc_http.parse().map_err(|e| {
            eyre::eyre!("Invalid RPC URL for network '{}': {}", config.name, e)
        })?;
        let provider = ProviderBuilder::new().connect_http(url).erased();

        Ok(Self {
            network: config.name.clone(),
            provider,
            timeout: config.request_timeout(),
            retry: RetryPolicy::from_config(config),
            shutdown,
        })
    }

    async fn call<T, E, F, Fut>(&self, op: &'static str, mut f: F) -> Result<T, ChainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        retry_rpc(&self.retry, op, &self.shutdown, || {
            with_timeout(op, self.timeout, f())
        })
        .await
    }
}

#[async_trait::async_trait]
impl ChainClient for RpcChainClient {
    fn network(&self) -> &str {
        &self.network
    }

    async fn latest_block_number(&self) -> Result<u64, ChainError> {
        self.call("eth_blockNumber", || async {
            self.provider.get_block_number().await
        })
        .await
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<u64, ChainError> {
        let block = self
            .call("eth_getBlockByNumber", || async {
                self.provider
                    .get_block_by_number(BlockNumberOrTag::Number(block_number))
                    .await
            })
            .await?;

        block
            .map(|b| b.header.timestamp)
            .ok_or(ChainError::MissingBlock(block_number))
    }

    async fn receipt_logs(
        &self,
        cashier: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<ReceiptLog>, ChainError> {
        let filter = Filter::new()
            .address(cashier)
            .event_signature(Receipt::SIGNATURE_HASH)
            .from_block(from_block)
            .to_block(to_block);

        let logs = self
            .call("eth_getLogs", || async { self.provider.get_logs(&filter).await })
            .await?;

        logs.iter().map(decoder::decode_receipt_log).collect()
    }

    async fn active_tokens(
        &self,
        list: Address,
        offset: u64,
        limit: u8,
    ) -> Result<TokenPage, ChainError> {
        let page = self
            .call("getActiveItems", || async {
                ITokenList::new(list, self.provider.clone())
                    .getActiveItems(U256::from(offset), limit)
                    .call()
                    .await
            })
            .await?;

        Ok(TokenPage {
            total: u64::try_from(page.count).unwrap_or(u64::MAX),
            items: page.items,
        })
    }

    async fn token_symbol(&self, token: Address) -> Result<String, ChainError> {
        self.call("symbol", || async {
            IERC20::new(token, self.provider.clone()).symbol().call().await
        })
        .await
    }

    async fn token_decimals(&self, token: Address) -> Result<u8, ChainError> {
        self.call("decimals", || async {
            IERC20::new(token, self.provider.clone()).decimals().call().await
        })
        .await
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
        self.call("balanceOf", || async {
            IERC20::new(token, self.provider.clone())
                .balanceOf(owner)
                .call()
                .await
        })
        .await
    }
}
