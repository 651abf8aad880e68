use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use tickerwatch_core::prices::{NewPriceSample, PriceSample, PriceSampleRepositoryTrait};
use tickerwatch_core::Result;

use super::model::PriceSampleDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{price_samples, subscribers};

pub struct PriceSampleRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl PriceSampleRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        PriceSampleRepository { pool, writer }
    }
}

#[async_trait]
impl PriceSampleRepositoryTrait for PriceSampleRepository {
    fn latest(&self, subscriber_id: &str) -> Result<Option<PriceSample>> {
        Ok(self.recent(subscriber_id, 1)?.into_iter().next())
    }

    fn recent(&self, subscriber_id: &str, limit: i64) -> Result<Vec<PriceSample>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = price_samples::table
            .filter(price_samples::subscriber_id.eq(subscriber_id))
            .order(price_samples::captured_at.desc())
            .limit(limit)
            .select(PriceSampleDB::as_select())
            .load::<PriceSampleDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(PriceSample::from).collect())
    }

    async fn append_batch(&self, samples: Vec<NewPriceSample>) -> Result<usize> {
        if samples.is_empty() {
            return Ok(0);
        }

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let ids: Vec<&str> = samples.iter().map(|s| s.subscriber_id.as_str()).collect();
                // What each subscriber tracks right now, inside the write transaction.
                let tracked: HashMap<String, String> = subscribers::table
                    .filter(subscribers::id.eq_any(ids))
                    .select((subscribers::id, subscribers::symbol))
                    .load::<(String, String)>(conn)
                    .map_err(StorageError::from)?
                    .into_iter()
                    .collect();

                let requested = samples.len();
                let rows: Vec<PriceSampleDB> = samples
                    .into_iter()
                    .filter(|s| tracked.get(&s.subscriber_id) == Some(&s.symbol))
                    .map(|s| PriceSampleDB::from_new(s, Uuid::new_v4().to_string()))
                    .collect();

                if rows.len() < requested {
                    debug!(
                        "Dropped {} stale samples (subscriber deleted or symbol changed)",
                        requested - rows.len()
                    );
                }
                if rows.is_empty() {
                    return Ok(0);
                }

                let written = diesel::insert_into(price_samples::table)
                    .values(&rows)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(written)
            })
            .await
    }
}
