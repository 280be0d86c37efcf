use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::types::*;

pub async fn get_health(pool: &PgPool) -> eyre::Result<HealthResponse> {
    let (total_transactions,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tx")
        .fetch_one(pool)
        .await?;

    let directions: Vec<(String, String, i64, DateTime<Utc>)> = sqlx::query_as(
        "SELECT direction, network, block_number, updated_at
         FROM blockchain ORDER BY direction",
    )
    .fetch_all(pool)
    .await?;

    Ok(HealthResponse {
        status: "ok".to_string(),
        total_transactions,
        directions: directions
            .into_iter()
            .map(
                |(direction, network, last_checked_block, updated_at)| DirectionStatus {
                    direction,
                    network,
                    last_checked_block,
                    updated_at,
                },
            )
            .collect(),
    })
}

type TransactionRow = (
    i64,
    String,
    String,
    String,
    String,
    i64,
    Vec<u8>,
    i64,
    Vec<u8>,
    String,
    BigDecimal,
    Vec<u8>,
    Vec<u8>,
    BigDecimal,
    BigDecimal,
    DateTime<Utc>,
);

pub async fn get_transactions(
    pool: &PgPool,
    params: &TransactionParams,
) -> eyre::Result<TransactionsResponse> {
    let (limit, offset) = params.page();

    let (total,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM tx t
         WHERE ($1::TEXT IS NULL OR t.direction = $1)
           AND ($2::TEXT IS NULL OR t.symbol = $2)",
    )
    .bind(&params.direction)
    .bind(&params.symbol)
    .fetch_one(pool)
    .await?;

    let rows: Vec<TransactionRow> = sqlx::query_as(
        "SELECT t.id, t.direction, t.bridge, t.bridge_side, t.destination, t.block_number,
                t.tx_hash, t.log_index, t.token_address, t.symbol, t.deposit_id,
                t.sender, t.recipient, t.amount, t.fee, t.block_timestamp
         FROM tx t
         WHERE ($1::TEXT IS NULL OR t.direction = $1)
           AND ($2::TEXT IS NULL OR t.symbol = $2)
         ORDER BY t.block_number DESC, t.log_index DESC
         LIMIT $3 OFFSET $4",
    )
    .bind(&params.direction)
    .bind(&params.symbol)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let transactions = rows
        .into_iter()
        .map(
            |(
                id,
                direction,
                bridge,
                bridge_side,
                destination,
                block_number,
                tx_hash,
                log_index,
                token,
                symbol,
                deposit_id,
                sender,
                recipient,
                amount,
                fee,
                timestamp,
            )| TransactionEntry {
                id,
                direction,
                bridge,
                bridge_side,
                destination,
                block_number,
                tx_hash: bytes_to_hex(&tx_hash),
                log_index,
                token: bytes_to_hex(&token),
                symbol,
                deposit_id,
                sender: bytes_to_hex(&sender),
                recipient: bytes_to_hex(&recipient),
                amount,
                fee,
                timestamp,
            },
        )
        .collect();

    Ok(TransactionsResponse {
        transactions,
        total,
        limit,
        offset,
    })
}

pub async fn get_latest_tvl(pool: &PgPool) -> eyre::Result<TvlResponse> {
    let rows: Vec<(String, String, Vec<u8>, String, BigDecimal, DateTime<Utc>)> = sqlx::query_as(
        "SELECT DISTINCT ON (bridge, symbol)
                bridge, network, token_address, symbol, value, taken_at
         FROM tvl
         ORDER BY bridge, symbol, taken_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(TvlResponse {
        samples: rows
            .into_iter()
            .map(|(bridge, network, token, symbol, value, taken_at)| TvlEntry {
                bridge,
                network,
                token: bytes_to_hex(&token),
                symbol,
                value,
                taken_at,
            })
            .collect(),
    })
}

pub async fn get_latest_prices(pool: &PgPool) -> eyre::Result<PricesResponse> {
    let rows: Vec<(String, BigDecimal, DateTime<Utc>)> = sqlx::query_as(
        "SELECT DISTINCT ON (symbol) symbol, usd, taken_at
         FROM price
         ORDER BY symbol, taken_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(PricesResponse {
        prices: rows
            .into_iter()
            .map(|(symbol, usd, taken_at)| PriceEntry {
                symbol,
                usd,
                taken_at,
            })
            .collect(),
    })
}
