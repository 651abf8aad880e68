//! Periodic price collection.
//!
//! One cycle gathers the distinct symbols tracked by all subscribers, fetches
//! them through the circuit breaker and appends one sample per subscriber
//! whose symbol got a price. A rejected or failed fetch writes nothing.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use tickerwatch_market_data::{CallOutcome, CircuitBreaker, MarketDataError, PriceSource};

use super::market_hours::MarketHours;
use super::prices_model::NewPriceSample;
use super::prices_traits::PriceSampleRepositoryTrait;
use crate::errors::Result;
use crate::subscribers::SubscriberRepositoryTrait;

/// What one refresh cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshReport {
    /// Outside the trading session; nothing fetched.
    MarketClosed,
    /// Nobody tracks anything; nothing fetched.
    NoSubscribers,
    /// The circuit refused the fetch.
    Skipped { retry_in: Duration },
    Completed {
        symbols: usize,
        samples: usize,
        unavailable: Vec<String>,
    },
}

pub struct PriceRefreshService {
    subscribers: Arc<dyn SubscriberRepositoryTrait>,
    samples: Arc<dyn PriceSampleRepositoryTrait>,
    source: Arc<dyn PriceSource>,
    breaker: Arc<CircuitBreaker>,
    market_hours: MarketHours,
    fetch_timeout: Duration,
}

impl PriceRefreshService {
    pub fn new(
        subscribers: Arc<dyn SubscriberRepositoryTrait>,
        samples: Arc<dyn PriceSampleRepositoryTrait>,
        source: Arc<dyn PriceSource>,
        breaker: Arc<CircuitBreaker>,
        market_hours: MarketHours,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            subscribers,
            samples,
            source,
            breaker,
            market_hours,
            fetch_timeout,
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Run one cycle as of `now`.
    ///
    /// Errors are dependency failures that got through the breaker, or
    /// storage failures; either way no sample from this cycle was written.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<RefreshReport> {
        if !self.market_hours.is_open(now) {
            debug!("Market closed at {}, skipping refresh", now);
            return Ok(RefreshReport::MarketClosed);
        }

        let subscribers = self.subscribers.list()?;
        if subscribers.is_empty() {
            debug!("No subscribers, skipping refresh");
            return Ok(RefreshReport::NoSubscribers);
        }

        let symbols: Vec<String> = subscribers
            .iter()
            .map(|s| s.symbol.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let source = self.source.clone();
        let fetch_timeout = self.fetch_timeout;
        let outcome = self
            .breaker
            .guarded_call(|| async {
                match tokio::time::timeout(fetch_timeout, source.fetch_all(&symbols)).await {
                    Ok(result) => result,
                    Err(_) => Err(MarketDataError::Timeout {
                        provider: source.id().to_string(),
                        elapsed: fetch_timeout,
                    }),
                }
            })
            .await;

        let batch = match outcome {
            CallOutcome::Success(batch) => batch,
            CallOutcome::Rejected(open) => {
                info!(
                    "Price refresh skipped: {} (retry in {:?})",
                    open, open.retry_in
                );
                return Ok(RefreshReport::Skipped {
                    retry_in: open.retry_in,
                });
            }
            CallOutcome::Failure(err) => {
                warn!("Price fetch for {} symbols failed: {}", symbols.len(), err);
                return Err(err.into());
            }
        };

        let captured_at = now.naive_utc();
        let new_samples: Vec<NewPriceSample> = subscribers
            .iter()
            .filter_map(|subscriber| {
                batch
                    .price_for(&subscriber.symbol)
                    .map(|value| NewPriceSample {
                        subscriber_id: subscriber.id.clone(),
                        symbol: subscriber.symbol.clone(),
                        value,
                        captured_at,
                    })
            })
            .collect();

        let written = if new_samples.is_empty() {
            0
        } else {
            self.samples.append_batch(new_samples).await?
        };
        let unavailable: Vec<String> = batch
            .unavailable()
            .into_iter()
            .map(str::to_string)
            .collect();

        info!(
            "Price refresh stored {} samples for {} symbols ({} unavailable)",
            written,
            symbols.len(),
            unavailable.len()
        );
        Ok(RefreshReport::Completed {
            symbols: symbols.len(),
            samples: written,
            unavailable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::PriceSampleRepositoryTrait;
    use crate::testing::InMemoryStore;
    use crate::Error;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tickerwatch_market_data::{CircuitBreakerConfig, CircuitState};

    /// Price source whose answers can be changed between cycles.
    struct FakeSource {
        prices: Mutex<HashMap<String, f64>>,
        down: Mutex<bool>,
        hang: Mutex<bool>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(prices: &[(&str, f64)]) -> Arc<Self> {
            Arc::new(Self {
                prices: Mutex::new(
                    prices
                        .iter()
                        .map(|(s, p)| (s.to_string(), *p))
                        .collect(),
                ),
                down: Mutex::new(false),
                hang: Mutex::new(false),
                calls: AtomicUsize::new(0),
            })
        }

        fn set_down(&self, down: bool) {
            *self.down.lock().unwrap() = down;
        }

        fn set_hang(&self, hang: bool) {
            *self.hang.lock().unwrap() = hang;
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PriceSource for FakeSource {
        fn id(&self) -> &'static str {
            "FAKE"
        }

        async fn latest_price(&self, symbol: &str) -> std::result::Result<f64, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let hang = *self.hang.lock().unwrap();
            if hang {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if *self.down.lock().unwrap() {
                return Err(MarketDataError::provider("FAKE", "503 Service Unavailable"));
            }
            self.prices
                .lock()
                .unwrap()
                .get(symbol)
                .copied()
                .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))
        }
    }

    /// Wednesday 2024-03-13, 11:00 in Rome.
    fn market_open() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 13, 10, 0, 0).unwrap()
    }

    fn refresh_service(
        store: &Arc<InMemoryStore>,
        source: &Arc<FakeSource>,
        max_failures: u32,
    ) -> PriceRefreshService {
        let breaker = CircuitBreaker::with_config(
            "FAKE",
            CircuitBreakerConfig {
                max_failures,
                reset_timeout: Duration::from_secs(20),
            },
        );
        PriceRefreshService::new(
            store.clone(),
            store.clone(),
            source.clone(),
            Arc::new(breaker),
            MarketHours::default(),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn test_closed_market_does_nothing() {
        let store = InMemoryStore::new();
        store.seed_subscriber("alice@example.com", "AAPL");
        let source = FakeSource::new(&[("AAPL", 190.0)]);
        let service = refresh_service(&store, &source, 5);

        let saturday = Utc.with_ymd_and_hms(2024, 3, 16, 10, 0, 0).unwrap();
        let report = service.run_cycle(saturday).await.unwrap();

        assert_eq!(report, RefreshReport::MarketClosed);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_subscribers_skips_fetch() {
        let store = InMemoryStore::new();
        let source = FakeSource::new(&[]);
        let service = refresh_service(&store, &source, 5);

        let report = service.run_cycle(market_open()).await.unwrap();
        assert_eq!(report, RefreshReport::NoSubscribers);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_cycle_appends_one_sample_per_subscriber_with_a_price() {
        let store = InMemoryStore::new();
        let alice = store.seed_subscriber("alice@example.com", "AAPL");
        let bob = store.seed_subscriber("bob@example.com", "AAPL");
        let carol = store.seed_subscriber("carol@example.com", "NOPE");
        let source = FakeSource::new(&[("AAPL", 190.0)]);
        let service = refresh_service(&store, &source, 5);

        let report = service.run_cycle(market_open()).await.unwrap();

        assert_eq!(
            report,
            RefreshReport::Completed {
                symbols: 2,
                samples: 2,
                unavailable: vec!["NOPE".to_string()],
            }
        );
        // AAPL is fetched once even though two subscribers track it.
        assert_eq!(source.calls(), 2);
        assert_eq!(store.latest(&alice.id).unwrap().unwrap().value, 190.0);
        assert_eq!(store.latest(&bob.id).unwrap().unwrap().value, 190.0);
        assert!(store.latest(&carol.id).unwrap().is_none());
        assert_eq!(
            store.latest(&alice.id).unwrap().unwrap().captured_at,
            market_open().naive_utc()
        );
    }

    #[tokio::test]
    async fn test_outage_opens_circuit_and_later_cycles_are_skipped() {
        let store = InMemoryStore::new();
        let alice = store.seed_subscriber("alice@example.com", "AAPL");
        let source = FakeSource::new(&[("AAPL", 190.0)]);
        source.set_down(true);
        let service = refresh_service(&store, &source, 2);

        for _ in 0..2 {
            let err = service.run_cycle(market_open()).await.unwrap_err();
            assert!(matches!(err, Error::MarketData(_)));
        }
        assert_eq!(service.breaker().state(), CircuitState::Open);

        let calls_before = source.calls();
        let report = service.run_cycle(market_open()).await.unwrap();
        assert!(matches!(report, RefreshReport::Skipped { .. }));
        assert_eq!(source.calls(), calls_before, "open circuit must not call out");
        assert!(store.latest(&alice.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_symbols_do_not_trip_the_breaker() {
        let store = InMemoryStore::new();
        store.seed_subscriber("alice@example.com", "NOPE");
        let source = FakeSource::new(&[]);
        let service = refresh_service(&store, &source, 1);

        for _ in 0..3 {
            let report = service.run_cycle(market_open()).await.unwrap();
            assert!(matches!(report, RefreshReport::Completed { samples: 0, .. }));
        }
        assert_eq!(service.breaker().state(), CircuitState::Closed);
        assert_eq!(service.breaker().failure_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_provider_times_out_as_dependency_failure() {
        let store = InMemoryStore::new();
        store.seed_subscriber("alice@example.com", "AAPL");
        let source = FakeSource::new(&[("AAPL", 190.0)]);
        source.set_hang(true);
        let service = refresh_service(&store, &source, 5);

        let err = service.run_cycle(market_open()).await.unwrap_err();

        assert!(matches!(
            err,
            Error::MarketData(MarketDataError::Timeout { .. })
        ));
        assert_eq!(service.breaker().failure_count(), 1);
    }
}
