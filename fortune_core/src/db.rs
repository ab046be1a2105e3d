use std::{str::FromStr, time::Duration};

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::{config::CoreConfig, error::StoreError, prize::DEFAULT_PRIZES};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_CONNECTIONS: u32 = 5;

/// Opens (creating if needed) a file-backed database in WAL mode.
pub async fn connect(url: &str) -> Result<SqlitePool, StoreError> {
    connect_with_busy_timeout(url, BUSY_TIMEOUT).await
}

/// Like [`connect`], with a custom wait for a locked database before SQLite
/// reports it busy.
pub async fn connect_with_busy_timeout(url: &str, busy_timeout: Duration) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(busy_timeout);
    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Private in-memory database. The single connection is never recycled,
/// since the data lives only as long as it does.
pub async fn connect_in_memory() -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Inserts the default prizes into an empty prize table and makes sure every
/// configured admin id is on the roster. Safe to run on every start.
pub async fn seed(pool: &SqlitePool, config: &CoreConfig) -> Result<(), StoreError> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM prizes")
        .fetch_one(pool)
        .await?;
    if existing == 0 {
        let now = Utc::now();
        let mut tx = pool.begin().await?;
        for (idx, prize) in DEFAULT_PRIZES.iter().enumerate() {
            sqlx::query(
                "INSERT INTO prizes (label, icon, color, position, is_active, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, 1, ?, ?)",
            )
            .bind(prize.label)
            .bind(prize.icon)
            .bind(prize.color)
            .bind(idx as i64 + 1)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        info!(count = DEFAULT_PRIZES.len(), "seeded default prizes");
    }

    for identity_id in &config.admin_ids {
        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO admins (identity_id, role, created_at) VALUES (?, 'admin', ?)",
        )
        .bind(*identity_id)
        .bind(Utc::now())
        .execute(pool)
        .await?
        .rows_affected();
        if inserted > 0 {
            info!(identity_id, "seeded initial admin");
        }
    }
    Ok(())
}

/// `connect` + `migrate` + `seed`.
pub async fn open(config: &CoreConfig) -> Result<SqlitePool, StoreError> {
    let pool = connect(&config.database_url).await?;
    migrate(&pool).await?;
    seed(&pool, config).await?;
    Ok(pool)
}
