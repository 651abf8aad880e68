//! Database models for price samples.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use tickerwatch_core::prices::{NewPriceSample, PriceSample};

use crate::subscribers::SubscriberDB;

#[derive(Queryable, Identifiable, Insertable, Associations, Selectable, PartialEq, Debug, Clone)]
#[diesel(belongs_to(SubscriberDB, foreign_key = subscriber_id))]
#[diesel(table_name = crate::schema::price_samples)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PriceSampleDB {
    pub id: String,
    pub subscriber_id: String,
    pub symbol: String,
    pub value: f64,
    pub captured_at: NaiveDateTime,
}

impl PriceSampleDB {
    pub fn from_new(sample: NewPriceSample, id: String) -> Self {
        Self {
            id,
            subscriber_id: sample.subscriber_id,
            symbol: sample.symbol,
            value: sample.value,
            captured_at: sample.captured_at,
        }
    }
}

impl From<PriceSampleDB> for PriceSample {
    fn from(db: PriceSampleDB) -> Self {
        Self {
            id: db.id,
            subscriber_id: db.subscriber_id,
            symbol: db.symbol,
            value: db.value,
            captured_at: db.captured_at,
        }
    }
}
