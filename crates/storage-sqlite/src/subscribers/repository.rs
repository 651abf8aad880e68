use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use log::debug;
use std::sync::Arc;
use uuid::Uuid;

use tickerwatch_core::errors::{Error, Result};
use tickerwatch_core::idempotency::{
    Fingerprint, FingerprintEffects, FingerprintKind, FingerprintRecords, FingerprintStore,
};
use tickerwatch_core::subscribers::{
    Subscriber, SubscriberChange, SubscriberMutation, SubscriberRepositoryTrait,
};

use super::model::{NewSubscriberDB, SubscriberDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{price_samples, registration_fingerprints, subscribers, update_fingerprints};

pub struct SubscriberRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl SubscriberRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        SubscriberRepository { pool, writer }
    }
}

fn purge_samples(conn: &mut SqliteConnection, subscriber_id: &str) -> Result<usize> {
    let purged = diesel::delete(
        price_samples::table.filter(price_samples::subscriber_id.eq(subscriber_id)),
    )
    .execute(conn)
    .map_err(StorageError::from)?;
    Ok(purged)
}

fn revoke_fingerprint(conn: &mut SqliteConnection, fingerprint: &Fingerprint) -> Result<()> {
    match fingerprint.kind() {
        FingerprintKind::Registration => {
            diesel::delete(registration_fingerprints::table.find(fingerprint.digest()))
                .execute(conn)
        }
        FingerprintKind::Update => {
            diesel::delete(update_fingerprints::table.find(fingerprint.digest())).execute(conn)
        }
    }
    .map_err(StorageError::from)?;
    Ok(())
}

fn commit_fingerprint(conn: &mut SqliteConnection, fingerprint: &Fingerprint) -> Result<()> {
    match fingerprint.kind() {
        FingerprintKind::Registration => diesel::insert_into(registration_fingerprints::table)
            .values(registration_fingerprints::fingerprint.eq(fingerprint.digest()))
            .execute(conn),
        FingerprintKind::Update => diesel::insert_into(update_fingerprints::table)
            .values(update_fingerprints::fingerprint.eq(fingerprint.digest()))
            .execute(conn),
    }
    .map_err(StorageError::from)?;
    Ok(())
}

/// Revocations first, so a mutation may revoke and re-commit the same value.
fn persist_effects(conn: &mut SqliteConnection, effects: &FingerprintEffects) -> Result<()> {
    for stale in &effects.revoke {
        revoke_fingerprint(conn, stale)?;
    }
    if let Some(applied) = &effects.commit {
        commit_fingerprint(conn, applied)?;
    }
    Ok(())
}

fn apply_change(conn: &mut SqliteConnection, change: SubscriberChange) -> Result<Option<Subscriber>> {
    let now = Utc::now().naive_utc();
    match change {
        SubscriberChange::Register { identity, symbol } => {
            let row = NewSubscriberDB {
                id: Uuid::new_v4().to_string(),
                identity,
                symbol,
                created_at: now,
                updated_at: now,
            };
            let inserted = diesel::insert_into(subscribers::table)
                .values(&row)
                .returning(SubscriberDB::as_returning())
                .get_result(conn)
                .map_err(StorageError::from)?;
            Ok(Some(inserted.into()))
        }
        SubscriberChange::ChangeSymbol {
            subscriber_id,
            symbol,
        } => {
            let purged = purge_samples(conn, &subscriber_id)?;
            let updated = diesel::update(subscribers::table.find(subscriber_id.as_str()))
                .set((subscribers::symbol.eq(symbol), subscribers::updated_at.eq(now)))
                .returning(SubscriberDB::as_returning())
                .get_result(conn)
                .optional()
                .map_err(StorageError::from)?
                .ok_or_else(|| Error::NotFound(format!("Subscriber {}", subscriber_id)))?;
            debug!(
                "Subscriber {} now tracks {} ({} samples purged)",
                updated.id, updated.symbol, purged
            );
            Ok(Some(updated.into()))
        }
        SubscriberChange::Remove { subscriber_id } => {
            let purged = purge_samples(conn, &subscriber_id)?;
            let deleted = diesel::delete(subscribers::table.find(subscriber_id.as_str()))
                .execute(conn)
                .map_err(StorageError::from)?;
            if deleted == 0 {
                return Err(Error::NotFound(format!("Subscriber {}", subscriber_id)));
            }
            debug!(
                "Removed subscriber {} ({} samples purged)",
                subscriber_id, purged
            );
            Ok(None)
        }
    }
}

impl FingerprintStore for SubscriberRepository {
    fn load_fingerprints(&self) -> Result<FingerprintRecords> {
        let mut conn = get_connection(&self.pool)?;
        let registrations = registration_fingerprints::table
            .select(registration_fingerprints::fingerprint)
            .load::<String>(&mut conn)
            .map_err(StorageError::from)?;
        let updates = update_fingerprints::table
            .select(update_fingerprints::fingerprint)
            .load::<String>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(FingerprintRecords {
            registrations,
            updates,
        })
    }
}

#[async_trait]
impl SubscriberRepositoryTrait for SubscriberRepository {
    fn get_by_identity(&self, identity: &str) -> Result<Option<Subscriber>> {
        let mut conn = get_connection(&self.pool)?;
        let found = subscribers::table
            .filter(subscribers::identity.eq(identity))
            .select(SubscriberDB::as_select())
            .first::<SubscriberDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(found.map(Subscriber::from))
    }

    fn list(&self) -> Result<Vec<Subscriber>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = subscribers::table
            .order(subscribers::created_at.asc())
            .select(SubscriberDB::as_select())
            .load::<SubscriberDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(Subscriber::from).collect())
    }

    async fn apply_mutation(&self, mutation: SubscriberMutation) -> Result<Option<Subscriber>> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Option<Subscriber>> {
                let subscriber = apply_change(conn, mutation.change)?;
                persist_effects(conn, &mutation.effects)?;
                Ok(subscriber)
            })
            .await
    }
}
