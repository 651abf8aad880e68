//! Market data models.

mod price_batch;

pub use price_batch::PriceBatch;
