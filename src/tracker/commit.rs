use crate::db::CheckpointStore;
use crate::tracker::types::{BridgeDirection, Transaction};

/// How far a window's commit got.
#[derive(Debug)]
pub enum CommitOutcome {
    /// Transactions recorded and watermark advanced.
    Committed { recorded: usize, watermark: u64 },
    /// Transactions recorded, watermark unchanged. The window will be
    /// scanned and submitted again next cycle.
    TransactionsOnly {
        recorded: usize,
        error: eyre::Report,
    },
    /// Nothing written.
    Nothing { error: eyre::Report },
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Record a window's transactions, then advance the watermark to `to`.
///
/// The watermark write is only attempted once the transaction write has
/// succeeded.
pub async fn commit_window(
    store: &dyn CheckpointStore,
    direction: &BridgeDirection,
    transactions: &[Transaction],
    to: u64,
) -> CommitOutcome {
    if let Err(error) = store.record_transactions(transactions).await {
        return CommitOutcome::Nothing { error };
    }

    let recorded = transactions.len();
    match store
        .update_last_checked_block(&direction.name, &direction.source, to)
        .await
    {
        Ok(()) => CommitOutcome::Committed {
            recorded,
            watermark: to,
        },
        Err(error) => CommitOutcome::TransactionsOnly { recorded, error },
    }
}
