use std::sync::Arc;

use sqlx::SqlitePool;

use crate::{
    admin::AdminMutator,
    allocator::SpinAllocator,
    audit::AuditRecorder,
    config::CoreConfig,
    db,
    error::StoreError,
    ledger::Ledger,
    prizes::PrizeStore,
    rng::{OsRandom, RandomSource},
    roster::Roster,
};

/// The wired-up core: every component shares one pool.
#[derive(Clone)]
pub struct Fortune {
    pub allocator: SpinAllocator,
    pub prizes: PrizeStore,
    pub ledger: Ledger,
    pub admin: AdminMutator,
}

impl Fortune {
    /// Opens the configured database, migrates, seeds and wires the core
    /// with the OS random source.
    pub async fn open(config: &CoreConfig) -> Result<Self, StoreError> {
        let pool = db::open(config).await?;
        Ok(Self::with_pool(pool, config, Arc::new(OsRandom)))
    }

    /// Wires the core over an already migrated pool.
    pub fn with_pool(pool: SqlitePool, config: &CoreConfig, rng: Arc<dyn RandomSource>) -> Self {
        let prizes = PrizeStore::new(pool.clone(), config.bounds);
        let ledger = Ledger::new(pool.clone());
        let roster = Roster::new(pool.clone());
        let audit = AuditRecorder::new(pool.clone());
        Self {
            allocator: SpinAllocator::new(pool, rng, config.claim_retry.clone()),
            admin: AdminMutator::new(prizes.clone(), ledger.clone(), roster, audit),
            prizes,
            ledger,
        }
    }
}
