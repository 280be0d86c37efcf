use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::commit::{commit_window, CommitOutcome};
use super::decoder::build_transaction;
use super::types::{BridgeDirection, ReceiptLog, Transaction};
use super::window::{safe_head, ScanWindow};
use super::worker::{until_cancelled, PollingTask};
use crate::chain::ChainClient;
use crate::db::CheckpointStore;
use crate::error::TrackerError;
use crate::tokens::registry::TokenRegistry;

/// Result of one successful scan cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No block past the watermark is available yet.
    Skipped {
        watermark: Option<u64>,
        safe_head: u64,
    },
    Committed { window: ScanWindow, recorded: usize },
}

/// Scans one bridge direction's cashier for receipts, window by window,
/// and advances its watermark after each durable write.
pub struct TransactionTracker {
    direction: BridgeDirection,
    client: Arc<dyn ChainClient>,
    store: Arc<dyn CheckpointStore>,
    registry: Arc<TokenRegistry>,
}

impl TransactionTracker {
    pub fn new(
        direction: BridgeDirection,
        client: Arc<dyn ChainClient>,
        store: Arc<dyn CheckpointStore>,
        registry: Arc<TokenRegistry>,
    ) -> Self {
        Self {
            direction,
            client,
            store,
            registry,
        }
    }

    pub fn direction(&self) -> &BridgeDirection {
        &self.direction
    }

    /// Run one cycle: pick the window, fetch and decode its receipts, commit.
    ///
    /// Any failure before the commit leaves the store untouched.
    pub async fn scan_once(
        &self,
        shutdown: &CancellationToken,
    ) -> Result<CycleOutcome, TrackerError> {
        let watermark = self
            .store
            .last_checked_block(&self.direction.name)
            .await
            .map_err(TrackerError::Store)?;

        let head = until_cancelled(shutdown, self.client.latest_block_number()).await?;
        let safe_head = safe_head(head, self.direction.confirmations);

        let Some(window) = ScanWindow::next(
            watermark,
            self.direction.start_block,
            safe_head,
            self.direction.window_size,
        ) else {
            tracing::debug!(
                direction = %self.direction.name,
                watermark = ?watermark,
                safe_head,
                "No new blocks"
            );
            return Ok(CycleOutcome::Skipped {
                watermark,
                safe_head,
            });
        };

        if shutdown.is_cancelled() {
            return Err(TrackerError::Cancelled);
        }

        let receipts = until_cancelled(
            shutdown,
            self.client
                .receipt_logs(self.direction.cashier, window.from, window.to),
        )
        .await?;

        let transactions = self.decode_receipts(&receipts, shutdown).await?;

        match commit_window(
            self.store.as_ref(),
            &self.direction,
            &transactions,
            window.to,
        )
        .await
        {
            CommitOutcome::Committed { recorded, .. } => {
                tracing::info!(
                    direction = %self.direction.name,
                    from = window.from,
                    to = window.to,
                    blocks = window.block_count(),
                    count = recorded,
                    "Committed window"
                );
                Ok(CycleOutcome::Committed { window, recorded })
            }
            CommitOutcome::TransactionsOnly { recorded, error } => {
                tracing::warn!(
                    direction = %self.direction.name,
                    from = window.from,
                    to = window.to,
                    count = recorded,
                    "Transactions recorded but watermark update failed, window will be rescanned"
                );
                Err(TrackerError::WatermarkNotAdvanced { watermark, error })
            }
            CommitOutcome::Nothing { error } => Err(TrackerError::Store(error)),
        }
    }

    /// Normalize every receipt in the window. All or nothing: the first
    /// failure discards the whole window.
    async fn decode_receipts(
        &self,
        receipts: &[ReceiptLog],
        shutdown: &CancellationToken,
    ) -> Result<Vec<Transaction>, TrackerError> {
        let mut block_timestamps: HashMap<u64, DateTime<Utc>> = HashMap::new();
        let mut transactions = Vec::with_capacity(receipts.len());

        for receipt in receipts {
            if shutdown.is_cancelled() {
                return Err(TrackerError::Cancelled);
            }

            let timestamp = match block_timestamps.get(&receipt.block_number) {
                Some(ts) => *ts,
                None => {
                    let secs = until_cancelled(
                        shutdown,
                        self.client.block_timestamp(receipt.block_number),
                    )
                    .await?;
                    let ts = DateTime::from_timestamp(secs as i64, 0).unwrap_or_default();
                    block_timestamps.insert(receipt.block_number, ts);
                    ts
                }
            };

            transactions.push(build_transaction(
                &self.direction,
                &self.registry,
                receipt,
                timestamp,
            )?);
        }

        Ok(transactions)
    }
}

#[async_trait::async_trait]
impl PollingTask for TransactionTracker {
    fn name(&self) -> &str {
        &self.direction.name
    }

    async fn run_cycle(&mut self, shutdown: &CancellationToken) -> Result<(), TrackerError> {
        self.scan_once(shutdown).await.map(|_| ())
    }
}
