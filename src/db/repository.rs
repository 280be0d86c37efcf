use sqlx::PgPool;

use super::CheckpointStore;
use crate::tracker::types::{PriceSample, Transaction, TvlSample};

/// [`CheckpointStore`] on PostgreSQL.
#[derive(Clone)]
pub struct PgCheckpointStore {
    pool: PgPool,
}

impl PgCheckpointStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CheckpointStore for PgCheckpointStore {
    /// Get the watermark for a direction. Returns None if never scanned.
    async fn last_checked_block(&self, direction: &str) -> eyre::Result<Option<u64>> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT block_number FROM blockchain WHERE direction = $1")
                .bind(direction)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(b,)| b as u64))
    }

    /// Insert a batch of transactions using multi-row INSERT with ON CONFLICT DO NOTHING.
    /// Chunks into groups of 1000 to stay within PostgreSQL parameter limits; all
    /// chunks share one database transaction.
    async fn record_transactions(&self, transactions: &[Transaction]) -> eyre::Result<()> {
        if transactions.is_empty() {
            return Ok(());
        }

        let mut db_tx = self.pool.begin().await?;
        for chunk in transactions.chunks(1000) {
            let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> = sqlx::QueryBuilder::new(
                "INSERT INTO tx (direction, bridge, bridge_side, destination, block_number, \
                 tx_hash, log_index, token_address, symbol, deposit_id, sender, recipient, \
                 amount, fee, block_timestamp) ",
            );

            query_builder.push_values(chunk, |mut b, t| {
                b.push_bind(&t.direction)
                    .push_bind(&t.bridge)
                    .push_bind(&t.source)
                    .push_bind(&t.destination)
                    .push_bind(t.block_number as i64)
                    .push_bind(t.tx_hash.as_slice().to_vec())
                    .push_bind(t.log_index as i64)
                    .push_bind(t.token.as_slice().to_vec())
                    .push_bind(&t.symbol)
                    .push_bind(&t.deposit_id)
                    .push_bind(t.sender.as_slice().to_vec())
                    .push_bind(t.recipient.as_slice().to_vec())
                    .push_bind(&t.amount)
                    .push_bind(&t.fee)
                    .push_bind(t.timestamp);
            });

            query_builder.push(" ON CONFLICT (direction, tx_hash, log_index) DO NOTHING");
            query_builder.build().execute(&mut *db_tx).await?;
        }
        db_tx.commit().await?;

        Ok(())
    }

    /// Upsert the watermark. GREATEST keeps it from ever moving backwards.
    async fn update_last_checked_block(
        &self,
        direction: &str,
        network: &str,
        block_number: u64,
    ) -> eyre::Result<()> {
        sqlx::query(
            "INSERT INTO blockchain (direction, network, block_number, updated_at)
             VALUES ($1, $2, $3, NOW())
             ON CONFLICT (direction) DO UPDATE
             SET block_number = GREATEST(blockchain.block_number, EXCLUDED.block_number),
                 network = EXCLUDED.network,
                 updated_at = NOW()",
        )
        .bind(direction)
        .bind(network)
        .bind(block_number as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_tvl(&self, samples: &[TvlSample]) -> eyre::Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> = sqlx::QueryBuilder::new(
            "INSERT INTO tvl (bridge, network, token_address, symbol, value, taken_at) ",
        );
        query_builder.push_values(samples, |mut b, s| {
            b.push_bind(&s.bridge)
                .push_bind(&s.network)
                .push_bind(s.token.as_slice().to_vec())
                .push_bind(&s.symbol)
                .push_bind(&s.value)
                .push_bind(s.taken_at);
        });
        query_builder.build().execute(&self.pool).await?;

        Ok(())
    }

    async fn record_prices(&self, samples: &[PriceSample]) -> eyre::Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("INSERT INTO price (symbol, usd, taken_at) ");
        query_builder.push_values(samples, |mut b, s| {
            b.push_bind(&s.symbol).push_bind(&s.usd).push_bind(s.taken_at);
        });
        query_builder.build().execute(&self.pool).await?;

        Ok(())
    }
}
