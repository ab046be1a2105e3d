use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    error::StoreError,
    prize::{Prize, PrizeId},
    roles::Identity,
};

pub const FALLBACK_ICON: &str = "🎁";
pub const FALLBACK_COLOR: &str = "#ffd700";

const RECORD_COLUMNS: &str = "id, identity_id, display_name, prize_id, prize_label, created_at";

/// The single committed outcome for one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SpinRecord {
    pub id: i64,
    pub identity_id: i64,
    pub display_name: Option<String>,
    pub prize_id: PrizeId,
    /// Label at award time; survives later edits of the prize.
    pub prize_label: String,
    pub created_at: DateTime<Utc>,
}

/// Answer to "has this identity played, and what did it win".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimedPrize {
    pub prize_id: PrizeId,
    pub label: String,
    pub icon: String,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetScope {
    All,
    Identity(i64),
}

/// Read side of the allocation ledger. Records are written only by the
/// spin allocator and removed only through an admin reset.
#[derive(Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn check_claimed(&self, identity_id: i64) -> Result<Option<ClaimedPrize>, StoreError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            prize_id: PrizeId,
            prize_label: String,
            icon: Option<String>,
            color: Option<String>,
        }

        let row = sqlx::query_as::<_, Row>(
            "SELECT s.prize_id, s.prize_label, p.icon, p.color \
             FROM spins s LEFT JOIN prizes p ON p.id = s.prize_id \
             WHERE s.identity_id = ? AND s.prize_id IS NOT NULL",
        )
        .bind(identity_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| ClaimedPrize {
            prize_id: r.prize_id,
            label: r.prize_label,
            icon: r.icon.unwrap_or_else(|| FALLBACK_ICON.into()),
            color: r.color.unwrap_or_else(|| FALLBACK_COLOR.into()),
        }))
    }

    /// All committed records, newest first.
    pub async fn records(&self) -> Result<Vec<SpinRecord>, StoreError> {
        let records = sqlx::query_as::<_, SpinRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM spins WHERE prize_id IS NOT NULL ORDER BY id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM spins WHERE prize_id IS NOT NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }

    pub(crate) async fn reset_all(&self) -> Result<u64, StoreError> {
        let removed = sqlx::query("DELETE FROM spins")
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(removed)
    }

    pub(crate) async fn reset_identity(&self, identity_id: i64) -> Result<Option<SpinRecord>, StoreError> {
        let removed = sqlx::query_as::<_, SpinRecord>(&format!(
            "DELETE FROM spins WHERE identity_id = ? RETURNING {RECORD_COLUMNS}"
        ))
        .bind(identity_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(removed)
    }
}

/// Reserves the identity's row. A unique-constraint violation here is the
/// one and only signal that the identity already played.
pub(crate) async fn reserve(conn: &mut SqliteConnection, identity: &Identity) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO spins (identity_id, display_name, created_at) VALUES (?, ?, ?)")
        .bind(identity.id)
        .bind(&identity.display_name)
        .bind(Utc::now())
        .execute(conn)
        .await?;
    Ok(())
}

/// Writes the selected prize into the reserved row.
pub(crate) async fn fulfil(conn: &mut SqliteConnection, identity_id: i64, prize: &Prize) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE spins SET prize_id = ?, prize_label = ? WHERE identity_id = ?")
        .bind(prize.id)
        .bind(&prize.label)
        .bind(identity_id)
        .execute(conn)
        .await?;
    Ok(())
}
