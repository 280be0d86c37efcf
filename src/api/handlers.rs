use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use super::queries;
use super::types::*;
use super::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn internal_error(e: eyre::Report) -> (StatusCode, Json<ErrorResponse>) {
    tracing::error!(error = %e, "API query failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

pub async fn health(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponse> {
    queries::get_health(&state.pool)
        .await
        .map(Json)
        .map_err(internal_error)
}

pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TransactionParams>,
) -> ApiResult<TransactionsResponse> {
    queries::get_transactions(&state.pool, &params)
        .await
        .map(Json)
        .map_err(internal_error)
}

pub async fn latest_tvl(State(state): State<Arc<AppState>>) -> ApiResult<TvlResponse> {
    queries::get_latest_tvl(&state.pool)
        .await
        .map(Json)
        .map_err(internal_error)
}

pub async fn latest_prices(State(state): State<Arc<AppState>>) -> ApiResult<PricesResponse> {
    queries::get_latest_prices(&state.pool)
        .await
        .map(Json)
        .map_err(internal_error)
}
