//! Background scheduler for the periodic price refresh.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use tickerwatch_core::prices::RefreshReport;

use crate::main_lib::AppState;

/// Starts the refresh loop. The first tick fires immediately.
pub fn start_price_refresh_scheduler(state: Arc<AppState>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Price refresh scheduler started ({:?} interval)", every);

        let mut refresh_interval = interval(every);
        refresh_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            refresh_interval.tick().await;
            run_scheduled_refresh(&state).await;
        }
    })
}

async fn run_scheduled_refresh(state: &Arc<AppState>) {
    match state.refresh_service.run_cycle(Utc::now()).await {
        Ok(RefreshReport::MarketClosed) => debug!("Scheduled refresh skipped: market closed"),
        Ok(RefreshReport::NoSubscribers) => debug!("Scheduled refresh skipped: no subscribers"),
        Ok(RefreshReport::Skipped { retry_in }) => {
            info!(
                "Scheduled refresh skipped: circuit open, retry in {:?}",
                retry_in
            );
        }
        Ok(RefreshReport::Completed {
            symbols,
            samples,
            unavailable,
        }) => {
            if !unavailable.is_empty() {
                warn!("No price for: {}", unavailable.join(", "));
            }
            info!(
                "Scheduled refresh completed: {} samples across {} symbols",
                samples, symbols
            );
        }
        Err(e) => {
            warn!(
                "Scheduled refresh failed: {} (circuit for {} is {})",
                e,
                state.breaker.dependency(),
                state.breaker.state()
            );
        }
    }
}
