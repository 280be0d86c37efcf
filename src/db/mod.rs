pub mod repository;

use crate::tracker::types::{PriceSample, Transaction, TvlSample};

/// Persistence for watermarks, transactions and samples.
///
/// Each batch write is all-or-nothing. `last_checked_block` returns the value
/// of the last successful `update_last_checked_block` for that direction.
#[async_trait::async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn last_checked_block(&self, direction: &str) -> eyre::Result<Option<u64>>;

    /// Record a batch of transactions. Re-recording a transaction with the same
    /// `(direction, tx_hash, log_index)` is a no-op.
    async fn record_transactions(&self, transactions: &[Transaction]) -> eyre::Result<()>;

    async fn update_last_checked_block(
        &self,
        direction: &str,
        network: &str,
        block_number: u64,
    ) -> eyre::Result<()>;

    async fn record_tvl(&self, samples: &[TvlSample]) -> eyre::Result<()>;

    async fn record_prices(&self, samples: &[PriceSample]) -> eyre::Result<()>;
}
