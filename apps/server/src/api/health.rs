use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use tickerwatch_market_data::CircuitSnapshot;

use crate::{error::ApiResult, main_lib::AppState};

async fn healthz() -> &'static str {
    "ok"
}

/// Ready once the database answers a query.
async fn readyz(State(state): State<Arc<AppState>>) -> ApiResult<&'static str> {
    state.subscriber_service.list_subscribers()?;
    Ok("ok")
}

async fn breaker(State(state): State<Arc<AppState>>) -> Json<CircuitSnapshot> {
    Json(state.breaker.snapshot())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/breaker", get(breaker))
}
