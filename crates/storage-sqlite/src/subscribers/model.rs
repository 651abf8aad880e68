//! Database models for subscribers.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use tickerwatch_core::subscribers::Subscriber;

/// Database model for subscribers
#[derive(Queryable, Identifiable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::subscribers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SubscriberDB {
    pub id: String,
    pub identity: String,
    pub symbol: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Database model for inserting a subscriber
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::subscribers)]
pub struct NewSubscriberDB {
    pub id: String,
    pub identity: String,
    pub symbol: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<SubscriberDB> for Subscriber {
    fn from(db: SubscriberDB) -> Self {
        Self {
            id: db.id,
            identity: db.identity,
            symbol: db.symbol,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
