use std::sync::Arc;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tokio::sync::Mutex;

use crate::{
    error::{is_unique_violation, MutationError, StoreError},
    roles::{check_self_change, Member, Role},
};

const MEMBER_COLUMNS: &str = "id, identity_id, display_name, role, added_by, created_at";

/// Who may use the admin surface, and with which role. Removals and
/// demotions delete or rewrite first and then count the remaining admins,
/// rolling back when none would be left.
#[derive(Clone)]
pub struct Roster {
    pool: SqlitePool,
    writer: Arc<Mutex<()>>,
}

impl Roster {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub async fn resolve(&self, identity_id: i64) -> Result<Option<Member>, StoreError> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM admins WHERE identity_id = ?"
        ))
        .bind(identity_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    pub async fn list(&self) -> Result<Vec<Member>, StoreError> {
        let members = sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM admins ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    pub async fn add(
        &self,
        added_by: i64,
        identity_id: i64,
        display_name: Option<String>,
        role: Role,
    ) -> Result<Member, MutationError> {
        if identity_id <= 0 {
            return Err(MutationError::Invalid {
                field: "identity_id",
                reason: "must be positive".into(),
            });
        }
        let inserted = sqlx::query_as::<_, Member>(&format!(
            "INSERT INTO admins (identity_id, display_name, role, added_by, created_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(identity_id)
        .bind(display_name)
        .bind(role)
        .bind(added_by)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(member) => Ok(member),
            Err(err) if is_unique_violation(&err) => Err(MutationError::AlreadyExists { identity_id }),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn remove(&self, actor: i64, identity_id: i64) -> Result<Member, MutationError> {
        check_self_change(actor, identity_id, None)?;
        let _guard = self.writer.lock().await;
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query_as::<_, Member>(&format!(
            "DELETE FROM admins WHERE identity_id = ? RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(identity_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(MutationError::NotFound {
            what: "member",
            id: identity_id,
        })?;

        ensure_an_admin_remains(&mut tx).await?;
        tx.commit().await?;
        Ok(removed)
    }

    pub async fn change_role(&self, actor: i64, identity_id: i64, role: Role) -> Result<Member, MutationError> {
        check_self_change(actor, identity_id, Some(role))?;
        let _guard = self.writer.lock().await;
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Member>(&format!(
            "UPDATE admins SET role = ? WHERE identity_id = ? RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(role)
        .bind(identity_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(MutationError::NotFound {
            what: "member",
            id: identity_id,
        })?;

        ensure_an_admin_remains(&mut tx).await?;
        tx.commit().await?;
        Ok(updated)
    }
}

async fn ensure_an_admin_remains(conn: &mut SqliteConnection) -> Result<(), MutationError> {
    let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admins WHERE role = 'admin'")
        .fetch_one(conn)
        .await?;
    if admins == 0 {
        return Err(MutationError::LastAdmin);
    }
    Ok(())
}
