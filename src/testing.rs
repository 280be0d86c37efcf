//! Scripted chain and in-memory store for tracker tests.

use alloy::primitives::{Address, B256, U256};
use bigdecimal::BigDecimal;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::chain::{ChainClient, TokenPage};
use crate::db::CheckpointStore;
use crate::error::ChainError;
use crate::tokens::registry::TokenRegistry;
use crate::tracker::types::{
    BridgeDirection, PriceSample, ReceiptLog, Token, Transaction, TvlSample,
};

pub const GENESIS_TIMESTAMP: u64 = 1_600_000_000;

// ============================================================
// Fixtures
// ============================================================

pub fn usdt() -> Token {
    Token {
        address: Address::repeat_byte(0xa1),
        symbol: "USDT".to_string(),
        decimals: 6,
    }
}

pub fn dai() -> Token {
    Token {
        address: Address::repeat_byte(0xa2),
        symbol: "DAI".to_string(),
        decimals: 18,
    }
}

pub fn wbtc() -> Token {
    Token {
        address: Address::repeat_byte(0xa3),
        symbol: "WBTC".to_string(),
        decimals: 8,
    }
}

pub fn registry_with(tokens: Vec<Token>) -> TokenRegistry {
    TokenRegistry::from_tokens(tokens)
}

pub fn direction(start_block: u64, window_size: u64) -> BridgeDirection {
    BridgeDirection {
        name: "ethereum-to-iotex".to_string(),
        bridge: "iotube-ethereum".to_string(),
        source: "ethereum".to_string(),
        destination: "iotex".to_string(),
        cashier: Address::repeat_byte(0xc1),
        start_block,
        window_size,
        confirmations: 0,
        poll_interval: Duration::from_secs(20),
    }
}

pub fn receipt(block_number: u64, log_index: u64, token: Address, amount: u128) -> ReceiptLog {
    let mut hash = [0u8; 32];
    hash[..8].copy_from_slice(&block_number.to_be_bytes());
    hash[8..16].copy_from_slice(&log_index.to_be_bytes());

    ReceiptLog {
        block_number,
        tx_hash: B256::from(hash),
        log_index,
        token,
        deposit_id: U256::from(block_number * 1000 + log_index),
        sender: Address::repeat_byte(0x11),
        recipient: Address::repeat_byte(0x22),
        amount: U256::from(amount),
        fee: U256::ZERO,
    }
}

pub fn sample_transaction(direction: &BridgeDirection, block_number: u64, log_index: u64) -> Transaction {
    let r = receipt(block_number, log_index, usdt().address, 1_000_000);
    Transaction {
        direction: direction.name.clone(),
        bridge: direction.bridge.clone(),
        source: direction.source.clone(),
        destination: direction.destination.clone(),
        block_number,
        tx_hash: r.tx_hash,
        log_index,
        token: r.token,
        symbol: "USDT".to_string(),
        deposit_id: BigDecimal::from(1),
        sender: r.sender,
        recipient: r.recipient,
        amount: BigDecimal::from(1),
        fee: BigDecimal::from(0),
        timestamp: Utc::now(),
    }
}

// ============================================================
// MockChain
// ============================================================

/// A chain whose head, receipts, lists and balances are set by the test.
/// Block `n` has timestamp `GENESIS_TIMESTAMP + 12 * n`.
pub struct MockChain {
    head: Mutex<u64>,
    receipts: Mutex<Vec<ReceiptLog>>,
    windows: Mutex<Vec<(u64, u64)>>,
    failing_log_queries: AtomicU32,
    timestamp_calls: AtomicUsize,
    lists: Mutex<HashMap<Address, Vec<Address>>>,
    list_calls: AtomicUsize,
    tokens: Mutex<HashMap<Address, Token>>,
    balances: Mutex<HashMap<Address, U256>>,
    cancel_on_timestamp: Mutex<Option<CancellationToken>>,
}

impl MockChain {
    pub fn new(head: u64) -> Self {
        Self {
            head: Mutex::new(head),
            receipts: Mutex::new(Vec::new()),
            windows: Mutex::new(Vec::new()),
            failing_log_queries: AtomicU32::new(0),
            timestamp_calls: AtomicUsize::new(0),
            lists: Mutex::new(HashMap::new()),
            list_calls: AtomicUsize::new(0),
            tokens: Mutex::new(HashMap::new()),
            balances: Mutex::new(HashMap::new()),
            cancel_on_timestamp: Mutex::new(None),
        }
    }

    pub fn set_head(&self, head: u64) {
        *self.head.lock().unwrap() = head;
    }

    pub fn push_receipt(&self, receipt: ReceiptLog) {
        self.receipts.lock().unwrap().push(receipt);
    }

    pub fn receipts_in(&self, from: u64, to: u64) -> Vec<ReceiptLog> {
        self.receipts
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.block_number >= from && r.block_number <= to)
            .cloned()
            .collect()
    }

    /// Make the next `count` log queries fail with a transport error.
    pub fn fail_next_log_queries(&self, count: u32) {
        self.failing_log_queries.store(count, Ordering::SeqCst);
    }

    /// Every `(from, to)` passed to `receipt_logs`, failed calls included.
    pub fn scanned_windows(&self) -> Vec<(u64, u64)> {
        self.windows.lock().unwrap().clone()
    }

    pub fn timestamp_calls(&self) -> usize {
        self.timestamp_calls.load(Ordering::SeqCst)
    }

    pub fn set_list(&self, list: Address, items: Vec<Address>) {
        self.lists.lock().unwrap().insert(list, items);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn add_token(&self, token: Token) {
        self.tokens.lock().unwrap().insert(token.address, token);
    }

    pub fn set_balance(&self, token: Address, balance: U256) {
        self.balances.lock().unwrap().insert(token, balance);
    }

    /// Cancel `token` from inside the next `block_timestamp` call, which still succeeds.
    pub fn cancel_on_timestamp(&self, token: CancellationToken) {
        *self.cancel_on_timestamp.lock().unwrap() = Some(token);
    }

    fn token(&self, address: Address) -> Result<Token, ChainError> {
        self.tokens
            .lock()
            .unwrap()
            .get(&address)
            .cloned()
            .ok_or_else(|| ChainError::Rpc {
                op: "eth_call",
                message: "execution reverted".to_string(),
            })
    }
}

#[async_trait::async_trait]
impl ChainClient for MockChain {
    fn network(&self) -> &str {
        "ethereum"
    }

    async fn latest_block_number(&self) -> Result<u64, ChainError> {
        Ok(*self.head.lock().unwrap())
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<u64, ChainError> {
        self.timestamp_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = self.cancel_on_timestamp.lock().unwrap().take() {
            token.cancel();
        }
        Ok(GENESIS_TIMESTAMP + 12 * block_number)
    }

    async fn receipt_logs(
        &self,
        _cashier: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<ReceiptLog>, ChainError> {
        self.windows.lock().unwrap().push((from_block, to_block));

        let failing = self.failing_log_queries.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_log_queries.store(failing - 1, Ordering::SeqCst);
            return Err(ChainError::Rpc {
                op: "eth_getLogs",
                message: "connection reset by peer".to_string(),
            });
        }

        Ok(self.receipts_in(from_block, to_block))
    }

    async fn active_tokens(
        &self,
        list: Address,
        offset: u64,
        limit: u8,
    ) -> Result<TokenPage, ChainError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let lists = self.lists.lock().unwrap();
        let items = lists.get(&list).ok_or_else(|| ChainError::Rpc {
            op: "getActiveItems",
            message: "no contract code".to_string(),
        })?;

        let start = std::cmp::min(offset as usize, items.len());
        let end = std::cmp::min(start + limit as usize, items.len());
        Ok(TokenPage {
            total: items.len() as u64,
            items: items[start..end].to_vec(),
        })
    }

    async fn token_symbol(&self, token: Address) -> Result<String, ChainError> {
        self.token(token).map(|t| t.symbol)
    }

    async fn token_decimals(&self, token: Address) -> Result<u8, ChainError> {
        self.token(token).map(|t| t.decimals)
    }

    async fn balance_of(&self, token: Address, _owner: Address) -> Result<U256, ChainError> {
        self.balances
            .lock()
            .unwrap()
            .get(&token)
            .copied()
            .ok_or_else(|| ChainError::Timeout {
                op: "balanceOf",
                after: Duration::from_secs(2),
            })
    }
}

// ============================================================
// MemoryStore
// ============================================================

/// In-memory [`CheckpointStore`] with the same de-duplication and
/// monotonic-watermark rules as the PostgreSQL store.
#[derive(Default)]
pub struct MemoryStore {
    watermarks: Mutex<HashMap<String, u64>>,
    watermark_history: Mutex<Vec<u64>>,
    transactions: Mutex<Vec<Transaction>>,
    submitted: AtomicUsize,
    tvl: Mutex<Vec<TvlSample>>,
    prices: Mutex<Vec<PriceSample>>,
    fail_record: AtomicBool,
    fail_watermark: AtomicBool,
    fail_tvl: AtomicBool,
}

impl MemoryStore {
    pub fn fail_record_transactions(&self, fail: bool) {
        self.fail_record.store(fail, Ordering::SeqCst);
    }

    pub fn fail_watermark_updates(&self, fail: bool) {
        self.fail_watermark.store(fail, Ordering::SeqCst);
    }

    pub fn fail_record_tvl(&self, fail: bool) {
        self.fail_tvl.store(fail, Ordering::SeqCst);
    }

    pub fn watermark(&self, direction: &str) -> Option<u64> {
        self.watermarks.lock().unwrap().get(direction).copied()
    }

    /// Every successfully stored watermark, in write order.
    pub fn watermark_history(&self) -> Vec<u64> {
        self.watermark_history.lock().unwrap().clone()
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.transactions.lock().unwrap().clone()
    }

    /// Transactions passed to successful `record_transactions` calls, duplicates included.
    pub fn submitted_transactions(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }

    pub fn tvl(&self) -> Vec<TvlSample> {
        self.tvl.lock().unwrap().clone()
    }

    pub fn prices(&self) -> Vec<PriceSample> {
        self.prices.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CheckpointStore for MemoryStore {
    async fn last_checked_block(&self, direction: &str) -> eyre::Result<Option<u64>> {
        Ok(self.watermark(direction))
    }

    async fn record_transactions(&self, transactions: &[Transaction]) -> eyre::Result<()> {
        if self.fail_record.load(Ordering::SeqCst) {
            return Err(eyre::eyre!("connection refused"));
        }

        let mut stored = self.transactions.lock().unwrap();
        for tx in transactions {
            let duplicate = stored.iter().any(|s| {
                s.direction == tx.direction && s.tx_hash == tx.tx_hash && s.log_index == tx.log_index
            });
            if !duplicate {
                stored.push(tx.clone());
            }
        }
        self.submitted.fetch_add(transactions.len(), Ordering::SeqCst);
        Ok(())
    }

    async fn update_last_checked_block(
        &self,
        direction: &str,
        _network: &str,
        block_number: u64,
    ) -> eyre::Result<()> {
        if self.fail_watermark.load(Ordering::SeqCst) {
            return Err(eyre::eyre!("connection refused"));
        }

        let mut watermarks = self.watermarks.lock().unwrap();
        let entry = watermarks.entry(direction.to_string()).or_insert(block_number);
        *entry = std::cmp::max(*entry, block_number);
        self.watermark_history.lock().unwrap().push(*entry);
        Ok(())
    }

    async fn record_tvl(&self, samples: &[TvlSample]) -> eyre::Result<()> {
        if self.fail_tvl.load(Ordering::SeqCst) {
            return Err(eyre::eyre!("connection refused"));
        }
        self.tvl.lock().unwrap().extend_from_slice(samples);
        Ok(())
    }

    async fn record_prices(&self, samples: &[PriceSample]) -> eyre::Result<()> {
        self.prices.lock().unwrap().extend_from_slice(samples);
        Ok(())
    }
}
