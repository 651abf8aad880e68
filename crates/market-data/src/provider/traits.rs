//! Price source trait definition.

use async_trait::async_trait;
use log::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::PriceBatch;
use crate::registry::DependencyFailure;

/// Trait for external price sources.
///
/// Implementors only have to answer for a single symbol; the bulk
/// [`fetch_all`](PriceSource::fetch_all) is provided on top of it.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use tickerwatch_market_data::{MarketDataError, PriceSource};
///
/// struct FixedSource;
///
/// #[async_trait]
/// impl PriceSource for FixedSource {
///     fn id(&self) -> &'static str {
///         "FIXED"
///     }
///
///     async fn latest_price(&self, _symbol: &str) -> Result<f64, MarketDataError> {
///         Ok(42.0)
///     }
/// }
/// ```
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Unique identifier for this source, e.g. "YAHOO".
    ///
    /// Used for logging and as the circuit breaker's dependency name.
    fn id(&self) -> &'static str;

    /// Fetch the most recent traded price for one symbol.
    async fn latest_price(&self, symbol: &str) -> Result<f64, MarketDataError>;

    /// Fetch prices for every symbol in `symbols`.
    ///
    /// A symbol the provider cannot price degrades to `None` in the batch.
    /// The call as a whole only fails when every symbol failed with a
    /// dependency-class error, which means the provider itself is down rather
    /// than a handful of tickers being unknown.
    async fn fetch_all(&self, symbols: &[String]) -> Result<PriceBatch, MarketDataError> {
        let mut batch = PriceBatch::default();
        let mut first_dependency_error: Option<MarketDataError> = None;
        let mut dependency_failures = 0usize;

        for symbol in symbols {
            match self.latest_price(symbol).await {
                Ok(price) => {
                    debug!("{}: {} -> {}", self.id(), symbol, price);
                    batch.insert(symbol.clone(), Some(price));
                }
                Err(e) => {
                    warn!("{}: no price for {}: {}", self.id(), symbol, e);
                    if e.is_dependency_failure() {
                        dependency_failures += 1;
                        first_dependency_error.get_or_insert(e);
                    }
                    batch.insert(symbol.clone(), None);
                }
            }
        }

        if !symbols.is_empty() && dependency_failures == symbols.len() {
            if let Some(e) = first_dependency_error {
                return Err(e);
            }
        }

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct ScriptedSource {
        answers: HashMap<&'static str, Result<f64, fn() -> MarketDataError>>,
    }

    #[async_trait]
    impl PriceSource for ScriptedSource {
        fn id(&self) -> &'static str {
            "SCRIPTED"
        }

        async fn latest_price(&self, symbol: &str) -> Result<f64, MarketDataError> {
            match self.answers.get(symbol) {
                Some(Ok(price)) => Ok(*price),
                Some(Err(make)) => Err(make()),
                None => Err(MarketDataError::SymbolNotFound(symbol.to_string())),
            }
        }
    }

    fn outage() -> MarketDataError {
        MarketDataError::provider("SCRIPTED", "503 Service Unavailable")
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_unknown_symbols_degrade_to_unavailable() {
        let source = ScriptedSource {
            answers: HashMap::from([("AAPL", Ok(190.0))]),
        };

        let batch = source.fetch_all(&symbols(&["AAPL", "NOPE"])).await.unwrap();

        assert_eq!(batch.price_for("AAPL"), Some(190.0));
        assert_eq!(batch.unavailable(), vec!["NOPE"]);
    }

    #[tokio::test]
    async fn test_partial_outage_is_not_a_failure() {
        let source = ScriptedSource {
            answers: HashMap::from([("AAPL", Ok(190.0)), ("MSFT", Err(outage as fn() -> _))]),
        };

        let batch = source.fetch_all(&symbols(&["AAPL", "MSFT"])).await.unwrap();

        assert_eq!(batch.price_for("AAPL"), Some(190.0));
        assert_eq!(batch.price_for("MSFT"), None);
        assert_eq!(batch.unavailable(), vec!["MSFT"]);
    }

    #[tokio::test]
    async fn test_total_outage_fails_the_batch() {
        let source = ScriptedSource {
            answers: HashMap::from([
                ("AAPL", Err(outage as fn() -> _)),
                ("MSFT", Err(outage as fn() -> _)),
            ]),
        };

        let err = source
            .fetch_all(&symbols(&["AAPL", "MSFT"]))
            .await
            .unwrap_err();

        assert!(err.is_dependency_failure());
    }

    #[tokio::test]
    async fn test_empty_request_is_empty_batch() {
        let source = ScriptedSource {
            answers: HashMap::new(),
        };

        let batch = source.fetch_all(&[]).await.unwrap();
        assert!(batch.unavailable().is_empty());
        assert_eq!(batch.price_for("AAPL"), None);
    }
}
