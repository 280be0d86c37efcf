use alloy::primitives::Address;
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::decoder::normalize_amount;
use super::types::TvlSample;
use super::worker::{until_cancelled, PollingTask};
use crate::chain::ChainClient;
use crate::db::CheckpointStore;
use crate::error::TrackerError;
use crate::tokens::registry::TokenRegistry;

/// Samples the balance of every registered token held by a bridge's safe.
pub struct TvlTracker {
    name: String,
    bridge: String,
    safe: Address,
    client: Arc<dyn ChainClient>,
    store: Arc<dyn CheckpointStore>,
    registry: Arc<TokenRegistry>,
}

impl TvlTracker {
    pub fn new(
        bridge: String,
        safe: Address,
        client: Arc<dyn ChainClient>,
        store: Arc<dyn CheckpointStore>,
        registry: Arc<TokenRegistry>,
    ) -> Self {
        Self {
            name: format!("{}-tvl", bridge),
            bridge,
            safe,
            client,
            store,
            registry,
        }
    }

    /// Take one sample per token and record the batch.
    ///
    /// A token whose balance cannot be read is skipped for this round only;
    /// the rest of the batch is still recorded. Returns the number recorded.
    pub async fn sample_once(&self, shutdown: &CancellationToken) -> Result<usize, TrackerError> {
        let taken_at = Utc::now();
        let mut samples = Vec::with_capacity(self.registry.len());

        for token in self.registry.iter() {
            let balance =
                until_cancelled(shutdown, self.client.balance_of(token.address, self.safe)).await;
            match balance {
                Ok(balance) => samples.push(TvlSample {
                    bridge: self.bridge.clone(),
                    network: self.client.network().to_string(),
                    token: token.address,
                    symbol: token.symbol.clone(),
                    value: normalize_amount(balance, token.decimals),
                    taken_at,
                }),
                Err(TrackerError::Cancelled) => return Err(TrackerError::Cancelled),
                Err(e) => {
                    tracing::warn!(
                        bridge = %self.bridge,
                        symbol = %token.symbol,
                        token = %token.address,
                        error = %e,
                        "Failed to read safe balance, dropping sample"
                    );
                }
            }
        }

        self.store
            .record_tvl(&samples)
            .await
            .map_err(TrackerError::Store)?;

        tracing::info!(
            bridge = %self.bridge,
            count = samples.len(),
            tokens = self.registry.len(),
            "Recorded TVL samples"
        );
        Ok(samples.len())
    }
}

#[async_trait::async_trait]
impl PollingTask for TvlTracker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_cycle(&mut self, shutdown: &CancellationToken) -> Result<(), TrackerError> {
        self.sample_once(shutdown).await.map(|_| ())
    }
}
