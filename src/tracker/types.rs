use alloy::primitives::{Address, B256, U256};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// One monitored stream of bridge receipts: a cashier contract on the source
/// network whose deposits are bound for `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeDirection {
    /// Unique key under which the watermark is stored.
    pub name: String,
    pub bridge: String,
    pub source: String,
    pub destination: String,
    pub cashier: Address,
    pub start_block: u64,
    pub window_size: u64,
    /// Blocks kept behind the node's head as a reorg margin.
    pub confirmations: u64,
    pub poll_interval: Duration,
}

/// Metadata for a bridgeable token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

/// A `Receipt` event as emitted by a cashier, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptLog {
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
    pub token: Address,
    pub deposit_id: U256,
    pub sender: Address,
    pub recipient: Address,
    pub amount: U256,
    pub fee: U256,
}

/// A normalized bridge transfer, ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub direction: String,
    pub bridge: String,
    pub source: String,
    pub destination: String,
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
    pub token: Address,
    pub symbol: String,
    pub deposit_id: BigDecimal,
    pub sender: Address,
    pub recipient: Address,
    pub amount: BigDecimal,
    pub fee: BigDecimal,
    pub timestamp: DateTime<Utc>,
}

/// Balance of one token held by a bridge's safe at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TvlSample {
    pub bridge: String,
    pub network: String,
    pub token: Address,
    pub symbol: String,
    pub value: BigDecimal,
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSample {
    pub symbol: String,
    pub usd: BigDecimal,
    pub taken_at: DateTime<Utc>,
}
