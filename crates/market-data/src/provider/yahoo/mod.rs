//! Yahoo Finance price source.
//!
//! Covers anything Yahoo quotes by ticker: equities/ETFs (AAPL, ENI.MI),
//! cryptocurrencies (BTC-USD) and FX pairs (EURUSD=X).

use async_trait::async_trait;
use tracing::{debug, warn};
use yahoo_finance_api as yahoo;

use crate::errors::MarketDataError;
use crate::provider::PriceSource;

const PROVIDER_ID: &str = "YAHOO";

/// Interval passed to the chart API when asking for the latest quote.
const LATEST_QUOTE_RANGE: &str = "1d";

/// Yahoo Finance price source.
pub struct YahooProvider {
    connector: yahoo::YahooConnector,
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider.
    pub fn new() -> Result<Self, MarketDataError> {
        let connector = yahoo::YahooConnector::new().map_err(|e| {
            MarketDataError::provider(
                PROVIDER_ID,
                format!("Failed to initialize Yahoo connector: {}", e),
            )
        })?;
        Ok(Self { connector })
    }
}

/// Map a Yahoo client error to our taxonomy.
///
/// "No data" answers mean the ticker is unknown, which is the caller's problem;
/// everything else is treated as the provider misbehaving.
fn map_yahoo_error(symbol: &str, err: yahoo::YahooError) -> MarketDataError {
    if matches!(err, yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult) {
        return MarketDataError::SymbolNotFound(symbol.to_string());
    }

    let message = err.to_string();
    if message.contains("429") || message.to_ascii_lowercase().contains("too many requests") {
        MarketDataError::RateLimited {
            provider: PROVIDER_ID.to_string(),
        }
    } else {
        MarketDataError::provider(PROVIDER_ID, message)
    }
}

/// Reject prices that cannot be a traded value.
fn validate_price(symbol: &str, price: f64) -> Result<f64, MarketDataError> {
    if price.is_finite() && price > 0.0 {
        Ok(price)
    } else {
        Err(MarketDataError::ValidationFailed {
            message: format!("Implausible price {} for {}", price, symbol),
        })
    }
}

#[async_trait]
impl PriceSource for YahooProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn latest_price(&self, symbol: &str) -> Result<f64, MarketDataError> {
        let response = self
            .connector
            .get_latest_quotes(symbol, LATEST_QUOTE_RANGE)
            .await
            .map_err(|e| map_yahoo_error(symbol, e))?;

        let quote = response.last_quote().map_err(|e| {
            warn!("No quotes returned for {}: {}", symbol, e);
            MarketDataError::SymbolNotFound(symbol.to_string())
        })?;

        debug!("Yahoo quote for {}: close={}", symbol, quote.close);
        validate_price(symbol, quote.close)
    }
}
