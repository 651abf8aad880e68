//! Price sample domain models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One captured price for one subscriber.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceSample {
    pub id: String,
    pub subscriber_id: String,
    pub symbol: String,
    pub value: f64,
    pub captured_at: NaiveDateTime,
}

/// Input model for appending a sample
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPriceSample {
    pub subscriber_id: String,
    pub symbol: String,
    pub value: f64,
    pub captured_at: NaiveDateTime,
}
