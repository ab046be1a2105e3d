use std::sync::Arc;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tokio::sync::Mutex;

use crate::{
    config::SectorBounds,
    error::{MutationError, StoreError},
    prize::{check_permutation, NewPrize, Prize, PrizeId, PrizeUpdate},
};

const PRIZE_COLUMNS: &str = "id, label, icon, color, position, is_active";

/// Ordered prize sectors and the active-count bounds over them.
///
/// Every mutation runs in one transaction under a per-store writer lock and
/// issues its first write before reading anything it decides on, so SQLite
/// hands it the database write lock up front. Bounds are checked against the
/// state the mutation leaves behind; a violation drops the transaction.
#[derive(Clone)]
pub struct PrizeStore {
    pool: SqlitePool,
    bounds: SectorBounds,
    writer: Arc<Mutex<()>>,
}

impl PrizeStore {
    pub fn new(pool: SqlitePool, bounds: SectorBounds) -> Self {
        Self {
            pool,
            bounds,
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub async fn list_active(&self) -> Result<Vec<Prize>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(fetch_active(&mut conn).await?)
    }

    /// Every prize, inactive included, in wheel order.
    pub async fn list_all(&self) -> Result<Vec<Prize>, StoreError> {
        let prizes = sqlx::query_as::<_, Prize>(&format!(
            "SELECT {PRIZE_COLUMNS} FROM prizes ORDER BY position, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(prizes)
    }

    pub async fn get(&self, id: PrizeId) -> Result<Option<Prize>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(fetch_one(&mut conn, id).await?)
    }

    pub async fn create(&self, new: NewPrize) -> Result<Prize, MutationError> {
        new.validate()?;
        let _guard = self.writer.lock().await;
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let id = sqlx::query(
            "INSERT INTO prizes (label, icon, color, position, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, 0, ?, ?, ?)",
        )
        .bind(&new.label)
        .bind(&new.icon)
        .bind(&new.color)
        .bind(new.active)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let total = count_all(&mut tx).await?;
        let slot = new.position.unwrap_or(total).clamp(1, total);
        sqlx::query("UPDATE prizes SET position = position + 1 WHERE position >= ? AND id != ?")
            .bind(slot)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE prizes SET position = ? WHERE id = ?")
            .bind(slot)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let after = count_active(&mut tx).await?;
        let before = after - usize::from(new.active);
        self.bounds.check_transition(before, after)?;

        let prize = fetch_one(&mut tx, id)
            .await?
            .ok_or_else(|| MutationError::prize_not_found(id))?;
        tx.commit().await?;
        Ok(prize)
    }

    pub async fn update(&self, id: PrizeId, patch: PrizeUpdate) -> Result<Prize, MutationError> {
        patch.validate()?;
        let _guard = self.writer.lock().await;
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE prizes SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if touched == 0 {
            return Err(MutationError::prize_not_found(id));
        }

        let before = count_active(&mut tx).await?;
        let current = fetch_one(&mut tx, id)
            .await?
            .ok_or_else(|| MutationError::prize_not_found(id))?;
        let next = patch.apply(&current);
        sqlx::query("UPDATE prizes SET label = ?, icon = ?, color = ?, is_active = ? WHERE id = ?")
            .bind(&next.label)
            .bind(&next.icon)
            .bind(&next.color)
            .bind(next.active)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let after = count_active(&mut tx).await?;
        self.bounds.check_transition(before, after)?;
        tx.commit().await?;
        Ok(next)
    }

    pub async fn delete(&self, id: PrizeId) -> Result<Prize, MutationError> {
        let _guard = self.writer.lock().await;
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query_as::<_, Prize>(&format!(
            "DELETE FROM prizes WHERE id = ? RETURNING {PRIZE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| MutationError::prize_not_found(id))?;

        let after = count_active(&mut tx).await?;
        let before = after + usize::from(removed.active);
        self.bounds.check_transition(before, after)?;

        sqlx::query("UPDATE prizes SET position = position - 1 WHERE position > ?")
            .bind(removed.position)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(removed)
    }

    /// Rewrites positions to `1..=N` following `order`, which must be a full
    /// permutation of the stored ids. Readers see either the old or the new
    /// order, never a mix.
    pub async fn reorder(&self, order: &[PrizeId]) -> Result<(), MutationError> {
        let _guard = self.writer.lock().await;
        let mut tx = self.pool.begin().await?;

        // park every row on a negative slot; also takes the write lock
        sqlx::query("UPDATE prizes SET position = -position")
            .execute(&mut *tx)
            .await?;

        let existing: Vec<PrizeId> = sqlx::query_scalar("SELECT id FROM prizes ORDER BY id")
            .fetch_all(&mut *tx)
            .await?;
        check_permutation(&existing, order)?;

        for (idx, id) in order.iter().enumerate() {
            sqlx::query("UPDATE prizes SET position = ?, updated_at = ? WHERE id = ?")
                .bind(idx as i64 + 1)
                .bind(Utc::now())
                .bind(*id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

pub(crate) async fn fetch_active(conn: &mut SqliteConnection) -> Result<Vec<Prize>, sqlx::Error> {
    sqlx::query_as::<_, Prize>(&format!(
        "SELECT {PRIZE_COLUMNS} FROM prizes WHERE is_active = 1 ORDER BY position, id"
    ))
    .fetch_all(conn)
    .await
}

async fn fetch_one(conn: &mut SqliteConnection, id: PrizeId) -> Result<Option<Prize>, sqlx::Error> {
    sqlx::query_as::<_, Prize>(&format!("SELECT {PRIZE_COLUMNS} FROM prizes WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await
}

async fn count_active(conn: &mut SqliteConnection) -> Result<usize, sqlx::Error> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM prizes WHERE is_active = 1")
        .fetch_one(conn)
        .await?;
    Ok(n as usize)
}

async fn count_all(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM prizes")
        .fetch_one(conn)
        .await
}
