use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tickerwatch_core::subscribers::{RegisterSubscriber, UpdateSubscriberSymbol};

use crate::{
    error::ApiResult,
    main_lib::AppState,
    models::{IdentityRequest, RpcMessage},
};

async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IdentityRequest>, JsonRejection>,
) -> ApiResult<Json<RpcMessage>> {
    let Json(request) = payload?;
    let subscriber = state.subscriber_service.login(&request.identity)?;
    Ok(Json(RpcMessage::ok(format!(
        "Welcome back {}, you are tracking {}",
        subscriber.identity, subscriber.symbol
    ))))
}

async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterSubscriber>, JsonRejection>,
) -> ApiResult<Json<RpcMessage>> {
    let Json(request) = payload?;
    let subscriber = state.subscriber_service.register(request).await?;
    tracing::info!("Registered {} for {}", subscriber.identity, subscriber.symbol);
    Ok(Json(RpcMessage::ok(format!(
        "Registered {} tracking {}",
        subscriber.identity, subscriber.symbol
    ))))
}

async fn update(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UpdateSubscriberSymbol>, JsonRejection>,
) -> ApiResult<Json<RpcMessage>> {
    let Json(request) = payload?;
    let subscriber = state.subscriber_service.update_symbol(request).await?;
    tracing::info!("{} now tracks {}", subscriber.identity, subscriber.symbol);
    Ok(Json(RpcMessage::ok(format!(
        "{} now tracks {}",
        subscriber.identity, subscriber.symbol
    ))))
}

async fn delete(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IdentityRequest>, JsonRejection>,
) -> ApiResult<Json<RpcMessage>> {
    let Json(request) = payload?;
    state.subscriber_service.delete(&request.identity).await?;
    tracing::info!("Deleted {}", request.identity);
    Ok(Json(RpcMessage::ok(format!("Deleted {}", request.identity))))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/update", post(update))
        .route("/delete", post(delete))
}
