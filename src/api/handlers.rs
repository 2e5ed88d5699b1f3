use super::models::{ViewResponse, ViewsResponse};
use crate::sink::MemorySink;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

/// GET /health — simple liveness check
pub async fn health() -> &'static str {
    "OK"
}

/// GET /views — every key published so far
pub async fn list_views(State(views): State<MemorySink>) -> Json<ViewsResponse> {
    Json(ViewsResponse { keys: views.keys() })
}

/// GET /views/{key} — latest value published under a key (e.g. bitfinex:BTCUSD:orderbook-buy)
pub async fn get_view(
    State(views): State<MemorySink>,
    Path(key): Path<String>,
) -> Result<Json<ViewResponse>, StatusCode> {
    let value = views.get(&key).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(ViewResponse { key, value }))
}
