use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};

use crate::{
    error::ApiResult,
    main_lib::AppState,
    models::{AverageRequest, IdentityRequest, RpcValue},
};

async fn latest(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IdentityRequest>, JsonRejection>,
) -> ApiResult<Json<RpcValue>> {
    let Json(request) = payload?;
    let value = state.price_service.latest_value(&request.identity)?;
    Ok(Json(RpcValue::ok(value)))
}

async fn average(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AverageRequest>, JsonRejection>,
) -> ApiResult<Json<RpcValue>> {
    let Json(request) = payload?;
    let value = state
        .price_service
        .average_value(&request.identity, request.count)?;
    Ok(Json(RpcValue::ok(value)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/latest", post(latest))
        .route("/average", post(average))
}
