use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::types::PriceSample;
use super::worker::PollingTask;
use crate::config::PriceConfig;
use crate::db::CheckpointStore;
use crate::error::TrackerError;

/// Polls a `simple/price` style quote endpoint for the configured symbols.
pub struct PriceTracker {
    http: reqwest::Client,
    endpoint: String,
    /// Symbol -> quote id.
    ids: BTreeMap<String, String>,
    store: Arc<dyn CheckpointStore>,
}

impl PriceTracker {
    pub fn new(config: &PriceConfig, store: Arc<dyn CheckpointStore>) -> eyre::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| eyre::eyre!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            ids: config.symbols.clone(),
            store,
        })
    }

    pub async fn fetch_once(&self) -> Result<usize, TrackerError> {
        if self.ids.is_empty() {
            return Ok(0);
        }

        let ids = self.ids.values().cloned().collect::<Vec<_>>().join(",");
        let body: JsonValue = self
            .http
            .get(&self.endpoint)
            .query(&[("ids", ids.as_str()), ("vs_currencies", "usd")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let samples = parse_quotes(&body, &self.ids, Utc::now());
        self.store
            .record_prices(&samples)
            .await
            .map_err(TrackerError::Store)?;

        tracing::info!(count = samples.len(), "Recorded prices");
        Ok(samples.len())
    }
}

/// Pull the USD quote for each symbol out of a `{ "<id>": { "usd": <price> } }` body.
/// Symbols whose id is missing or malformed are logged and skipped.
pub fn parse_quotes(
    body: &JsonValue,
    ids: &BTreeMap<String, String>,
    taken_at: DateTime<Utc>,
) -> Vec<PriceSample> {
    let mut samples = Vec::with_capacity(ids.len());

    for (symbol, id) in ids {
        let usd = body
            .get(id)
            .and_then(|quote| quote.get("usd"))
            .and_then(|price| match price {
                JsonValue::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
                JsonValue::String(s) => BigDecimal::from_str(s).ok(),
                _ => None,
            });

        match usd {
            Some(usd) => samples.push(PriceSample {
                symbol: symbol.clone(),
                usd,
                taken_at,
            }),
            None => tracing::warn!(%symbol, %id, "No USD quote in response"),
        }
    }

    samples
}

#[async_trait::async_trait]
impl PollingTask for PriceTracker {
    fn name(&self) -> &str {
        "price"
    }

    async fn run_cycle(&mut self, _shutdown: &CancellationToken) -> Result<(), TrackerError> {
        self.fetch_once().await.map(|_| ())
    }
}
