//! Prices module - samples, queries, market hours and the refresh job.

mod market_hours;
mod prices_model;
mod prices_service;
mod prices_traits;
mod refresh_service;

pub use market_hours::MarketHours;
pub use prices_model::{NewPriceSample, PriceSample};
pub use prices_service::PriceService;
pub use prices_traits::{PriceSampleRepositoryTrait, PriceServiceTrait};
pub use refresh_service::{PriceRefreshService, RefreshReport};
