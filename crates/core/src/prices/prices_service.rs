use log::debug;
use std::sync::Arc;

use super::prices_traits::{PriceSampleRepositoryTrait, PriceServiceTrait};
use crate::errors::{Error, Result, ValidationError};
use crate::subscribers::{validate_identity, Subscriber, SubscriberRepositoryTrait};

/// Read side over committed price samples.
pub struct PriceService {
    subscribers: Arc<dyn SubscriberRepositoryTrait>,
    samples: Arc<dyn PriceSampleRepositoryTrait>,
}

impl PriceService {
    pub fn new(
        subscribers: Arc<dyn SubscriberRepositoryTrait>,
        samples: Arc<dyn PriceSampleRepositoryTrait>,
    ) -> Self {
        Self {
            subscribers,
            samples,
        }
    }

    fn subscriber(&self, identity: &str) -> Result<Subscriber> {
        validate_identity(identity)?;
        self.subscribers
            .get_by_identity(identity)?
            .ok_or_else(|| Error::NotFound(format!("Subscriber '{}'", identity)))
    }
}

impl PriceServiceTrait for PriceService {
    fn latest_value(&self, identity: &str) -> Result<f64> {
        let subscriber = self.subscriber(identity)?;
        self.samples
            .latest(&subscriber.id)?
            .map(|sample| sample.value)
            .ok_or_else(|| Error::NoData(format!("No samples yet for {}", subscriber.symbol)))
    }

    fn average_value(&self, identity: &str, count: i64) -> Result<f64> {
        if count < 1 {
            return Err(ValidationError::InvalidInput(format!(
                "count must be at least 1, got {}",
                count
            ))
            .into());
        }

        let subscriber = self.subscriber(identity)?;
        let samples = self.samples.recent(&subscriber.id, count)?;
        if samples.is_empty() {
            return Err(Error::NoData(format!(
                "No samples yet for {}",
                subscriber.symbol
            )));
        }

        let total: f64 = samples.iter().map(|s| s.value).sum();
        debug!(
            "Average of {} samples for {} ({} requested)",
            samples.len(),
            subscriber.identity,
            count
        );
        Ok(total / samples.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_at, InMemoryStore};

    fn service_with(store: &Arc<InMemoryStore>) -> PriceService {
        PriceService::new(store.clone(), store.clone())
    }

    #[test]
    fn test_latest_value_picks_newest_sample() {
        let store = InMemoryStore::new();
        let sub = store.seed_subscriber("alice@example.com", "AAPL");
        store.seed_sample(sample_at(&sub, 100.0, 1));
        store.seed_sample(sample_at(&sub, 102.5, 3));
        store.seed_sample(sample_at(&sub, 101.0, 2));

        let service = service_with(&store);
        assert_eq!(service.latest_value("alice@example.com").unwrap(), 102.5);
    }

    #[test]
    fn test_latest_value_without_samples_is_no_data() {
        let store = InMemoryStore::new();
        store.seed_subscriber("alice@example.com", "AAPL");

        let err = service_with(&store)
            .latest_value("alice@example.com")
            .unwrap_err();
        assert!(matches!(err, Error::NoData(_)));
    }

    #[test]
    fn test_unknown_identity_is_not_found() {
        let store = InMemoryStore::new();
        let service = service_with(&store);

        assert!(matches!(
            service.latest_value("ghost@example.com"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            service.average_value("ghost@example.com", 3),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_average_of_most_recent_n() {
        let store = InMemoryStore::new();
        let sub = store.seed_subscriber("alice@example.com", "AAPL");
        for (minute, value) in [(1, 10.0), (2, 20.0), (3, 30.0), (4, 40.0)] {
            store.seed_sample(sample_at(&sub, value, minute));
        }

        let service = service_with(&store);
        assert_eq!(service.average_value("alice@example.com", 2).unwrap(), 35.0);
        assert_eq!(service.average_value("alice@example.com", 4).unwrap(), 25.0);
        // Fewer samples than requested averages what exists.
        assert_eq!(service.average_value("alice@example.com", 10).unwrap(), 25.0);
    }

    #[test]
    fn test_average_rejects_non_positive_count() {
        let store = InMemoryStore::new();
        store.seed_subscriber("alice@example.com", "AAPL");

        let service = service_with(&store);
        assert!(matches!(
            service.average_value("alice@example.com", 0),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            service.average_value("alice@example.com", -3),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_average_without_samples_is_no_data() {
        let store = InMemoryStore::new();
        store.seed_subscriber("alice@example.com", "AAPL");

        assert!(matches!(
            service_with(&store).average_value("alice@example.com", 5),
            Err(Error::NoData(_))
        ));
    }
}
