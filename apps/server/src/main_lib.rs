use std::sync::Arc;

use crate::config::Config;
use tickerwatch_core::{
    idempotency::IdempotencyGuard,
    prices::{MarketHours, PriceRefreshService, PriceService, PriceServiceTrait},
    subscribers::{SubscriberService, SubscriberServiceTrait},
};
use tickerwatch_market_data::{CircuitBreaker, CircuitBreakerConfig, PriceSource, YahooProvider};
use tickerwatch_storage_sqlite::{
    db::{self, write_actor},
    PriceSampleRepository, SubscriberRepository,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub subscriber_service: Arc<dyn SubscriberServiceTrait>,
    pub price_service: Arc<dyn PriceServiceTrait>,
    pub refresh_service: Arc<PriceRefreshService>,
    /// Same breaker the refresh service uses; exposed for `/breaker`.
    pub breaker: Arc<CircuitBreaker>,
}

pub fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// Build the application state with the Yahoo Finance price source.
pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let source: Arc<dyn PriceSource> = Arc::new(YahooProvider::new()?);
    build_state_with_source(config, source).await
}

pub async fn build_state_with_source(
    config: &Config,
    source: Arc<dyn PriceSource>,
) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = write_actor::spawn_writer((*pool).clone());

    let subscriber_repo = Arc::new(SubscriberRepository::new(pool.clone(), writer.clone()));
    let sample_repo = Arc::new(PriceSampleRepository::new(pool.clone(), writer));

    let guard = Arc::new(IdempotencyGuard::rebuild(subscriber_repo.as_ref())?);
    let (registrations, updates) = guard.counts().await;
    tracing::info!(
        "Idempotency cache rebuilt: {} registration and {} update fingerprints",
        registrations,
        updates
    );

    let subscriber_service: Arc<dyn SubscriberServiceTrait> =
        Arc::new(SubscriberService::new(subscriber_repo.clone(), guard));
    let price_service: Arc<dyn PriceServiceTrait> = Arc::new(PriceService::new(
        subscriber_repo.clone(),
        sample_repo.clone(),
    ));

    let breaker = Arc::new(CircuitBreaker::with_config(
        source.id(),
        CircuitBreakerConfig {
            max_failures: config.breaker_max_failures,
            reset_timeout: config.breaker_reset_timeout,
        },
    ));
    let market_hours = MarketHours::from_timezone_name(&config.market_timezone)?;
    let refresh_service = Arc::new(PriceRefreshService::new(
        subscriber_repo,
        sample_repo,
        source,
        breaker.clone(),
        market_hours,
        config.fetch_timeout,
    ));

    Ok(Arc::new(AppState {
        subscriber_service,
        price_service,
        refresh_service,
        breaker,
    }))
}
