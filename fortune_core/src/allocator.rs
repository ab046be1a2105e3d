use std::sync::Arc;

use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{error, info, warn};

use crate::{
    error::{is_unique_violation, ClaimError, StoreError},
    ledger,
    prize::Prize,
    prizes,
    retry::RetryPolicy,
    rng::{choose, RandomSource},
    roles::Identity,
};

/// Hands out the one prize each identity may win.
///
/// A claim is a single transaction: reserve the identity's ledger row, read
/// the active prizes, pick one, write it into the row, commit. Nothing reads
/// the ledger before inserting; the unique key on `identity_id` decides who
/// played. Only the reservation is retried on contention. Once a prize has
/// been picked any failure is returned to the caller and the transaction
/// rolls back, so no outcome is ever chosen twice.
#[derive(Clone)]
pub struct SpinAllocator {
    pool: SqlitePool,
    rng: Arc<dyn RandomSource>,
    retry: RetryPolicy,
}

impl SpinAllocator {
    pub fn new(pool: SqlitePool, rng: Arc<dyn RandomSource>, retry: RetryPolicy) -> Self {
        Self { pool, rng, retry }
    }

    pub async fn claim(&self, identity: &Identity) -> Result<Prize, ClaimError> {
        let mut tx = self
            .retry
            .run(|| self.reserve(identity), ClaimError::is_transient)
            .await
            .map_err(|err| {
                if err.is_transient() {
                    warn!(identity_id = identity.id, %err, "claim reservation gave up after retries");
                }
                err
            })?;

        let active = prizes::fetch_active(&mut tx).await?;
        let Some(prize) = choose(self.rng.as_ref(), &active).cloned() else {
            // bounds keep at least one sector active; reaching this means
            // the prize store was corrupted
            error!(identity_id = identity.id, "claim found no active prizes");
            return Err(ClaimError::NoActivePrizes);
        };

        ledger::fulfil(&mut tx, identity.id, &prize).await?;
        tx.commit().await?;

        info!(identity_id = identity.id, prize_id = prize.id, "prize claimed");
        Ok(prize)
    }

    async fn reserve(&self, identity: &Identity) -> Result<Transaction<'static, Sqlite>, ClaimError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;
        match ledger::reserve(&mut tx, identity).await {
            Ok(()) => Ok(tx),
            Err(err) if is_unique_violation(&err) => Err(ClaimError::AlreadyClaimed),
            Err(err) => Err(StoreError::from(err).into()),
        }
    }
}
