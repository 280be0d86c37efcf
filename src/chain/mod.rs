pub mod retry;
pub mod rpc;

use alloy::primitives::{Address, U256};

use crate::error::ChainError;
use crate::tracker::types::ReceiptLog;

/// One page of a token list contract's active items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenPage {
    /// Total number of active items in the list.
    pub total: u64,
    pub items: Vec<Address>,
}

/// The node calls the trackers need from one network.
///
/// A single client is shared by every tracker scanning that network; each
/// call is independently bounded in time.
#[async_trait::async_trait]
pub trait ChainClient: Send + Sync {
    fn network(&self) -> &str;

    /// Number of the latest block the node knows about.
    async fn latest_block_number(&self) -> Result<u64, ChainError>;

    /// Unix timestamp of a block.
    async fn block_timestamp(&self, block_number: u64) -> Result<u64, ChainError>;

    /// Decoded cashier `Receipt` events in `[from_block, to_block]`, in log order.
    async fn receipt_logs(
        &self,
        cashier: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<ReceiptLog>, ChainError>;

    async fn active_tokens(
        &self,
        list: Address,
        offset: u64,
        limit: u8,
    ) -> Result<TokenPage, ChainError>;

    async fn token_symbol(&self, token: Address) -> Result<String, ChainError>;

    async fn token_decimals(&self, token: Address) -> Result<u8, ChainError>;

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainError>;
}
