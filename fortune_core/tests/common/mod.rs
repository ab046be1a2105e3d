#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use fortune_core::{db, CoreConfig, Fortune, Identity, OsRandom, RandomSource, RetryPolicy};
use sqlx::SqlitePool;

pub const ROOT_ADMIN: i64 = 1;

pub fn config() -> CoreConfig {
    CoreConfig {
        admin_ids: vec![ROOT_ADMIN],
        ..CoreConfig::default()
    }
}

pub fn root() -> Identity {
    Identity::new(ROOT_ADMIN, "Root")
}

pub fn user(id: i64) -> Identity {
    Identity::new(id, format!("user-{id}"))
}

/// Migrated, seeded in-memory database with the six default prizes.
pub async fn seeded() -> (Fortune, SqlitePool) {
    seeded_with(Arc::new(OsRandom)).await
}

pub async fn seeded_with(rng: Arc<dyn RandomSource>) -> (Fortune, SqlitePool) {
    let cfg = config();
    let pool = db::connect_in_memory().await.unwrap();
    db::migrate(&pool).await.unwrap();
    db::seed(&pool, &cfg).await.unwrap();
    (Fortune::with_pool(pool.clone(), &cfg, rng), pool)
}

/// Migrated database without any prizes.
pub async fn empty() -> SqlitePool {
    let pool = db::connect_in_memory().await.unwrap();
    db::migrate(&pool).await.unwrap();
    pool
}

/// Always returns the same index, clamped to the range.
pub struct FixedIndex(pub usize);

impl RandomSource for FixedIndex {
    fn uniform_index(&self, n: usize) -> usize {
        self.0.min(n - 1)
    }
}

/// Migrated, seeded WAL database in `dir`, opened the way production opens
/// it but with the given busy timeout and claim retry budget.
pub async fn on_disk(
    dir: &tempfile::TempDir,
    busy_timeout: Duration,
    claim_retry: RetryPolicy,
) -> (Fortune, SqlitePool, String) {
    let url = format!("sqlite://{}", dir.path().join("fortune.db").display());
    let cfg = CoreConfig {
        database_url: url.clone(),
        claim_retry,
        ..config()
    };
    let pool = db::connect_with_busy_timeout(&url, busy_timeout).await.unwrap();
    db::migrate(&pool).await.unwrap();
    db::seed(&pool, &cfg).await.unwrap();
    (Fortune::with_pool(pool.clone(), &cfg, Arc::new(OsRandom)), pool, url)
}
