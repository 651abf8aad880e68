use async_trait::async_trait;

use super::prices_model::{NewPriceSample, PriceSample};
use crate::errors::Result;

/// Trait for price sample repository operations
#[async_trait]
pub trait PriceSampleRepositoryTrait: Send + Sync {
    /// Most recent sample for the subscriber, if any.
    fn latest(&self, subscriber_id: &str) -> Result<Option<PriceSample>>;

    /// Up to `limit` samples, newest first.
    fn recent(&self, subscriber_id: &str, limit: i64) -> Result<Vec<PriceSample>>;

    /// Appends a batch in one transaction.
    ///
    /// Samples whose subscriber no longer exists, or no longer tracks the
    /// sample's symbol, are dropped. Returns the number of rows written.
    async fn append_batch(&self, samples: Vec<NewPriceSample>) -> Result<usize>;
}

/// Trait for price query operations
pub trait PriceServiceTrait: Send + Sync {
    fn latest_value(&self, identity: &str) -> Result<f64>;
    fn average_value(&self, identity: &str, count: i64) -> Result<f64>;
}
