use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 1000;

pub fn bytes_to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

// ============================================================
// Query params
// ============================================================

#[derive(Debug, Default, Deserialize)]
pub struct TransactionParams {
    pub direction: Option<String>,
    pub symbol: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TransactionParams {
    /// `(limit, offset)` clamped to sane bounds.
    pub fn page(&self) -> (i64, i64) {
        let limit = self
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

// ============================================================
// Response types
// ============================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub total_transactions: i64,
    pub directions: Vec<DirectionStatus>,
}

#[derive(Debug, Serialize)]
pub struct DirectionStatus {
    pub direction: String,
    pub network: String,
    pub last_checked_block: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<TransactionEntry>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct TransactionEntry {
    pub id: i64,
    pub direction: String,
    pub bridge: String,
    pub bridge_side: String,
    pub destination: String,
    pub block_number: i64,
    pub tx_hash: String,
    pub log_index: i64,
    pub token: String,
    pub symbol: String,
    pub deposit_id: BigDecimal,
    pub sender: String,
    pub recipient: String,
    pub amount: BigDecimal,
    pub fee: BigDecimal,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TvlResponse {
    pub samples: Vec<TvlEntry>,
}

#[derive(Debug, Serialize)]
pub struct TvlEntry {
    pub bridge: String,
    pub network: String,
    pub token: String,
    pub symbol: String,
    pub value: BigDecimal,
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PricesResponse {
    pub prices: Vec<PriceEntry>,
}

#[derive(Debug, Serialize)]
pub struct PriceEntry {
    pub symbol: String,
    pub usd: BigDecimal,
    pub taken_at: DateTime<Utc>,
}
