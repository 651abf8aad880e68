//! Price source abstractions and implementations.
//!
//! This module contains:
//! - The `PriceSource` trait every quote provider implements
//! - The Yahoo Finance implementation used in production

mod traits;

pub mod yahoo;

pub use traits::PriceSource;
