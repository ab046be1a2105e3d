use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::error;

use crate::{error::StoreError, roles::Identity};

pub const MAX_AUDIT_PAGE: i64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AuditAction {
    CreatePrize,
    UpdatePrize,
    DeletePrize,
    ReorderPrizes,
    ResetAll,
    ResetOne,
    AddMember,
    RemoveMember,
    ChangeRole,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::CreatePrize => "create_prize",
            AuditAction::UpdatePrize => "update_prize",
            AuditAction::DeletePrize => "delete_prize",
            AuditAction::ReorderPrizes => "reorder_prizes",
            AuditAction::ResetAll => "reset_all",
            AuditAction::ResetOne => "reset_one",
            AuditAction::AddMember => "add_member",
            AuditAction::RemoveMember => "remove_member",
            AuditAction::ChangeRole => "change_role",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEntry {
    pub id: i64,
    pub actor_id: i64,
    pub actor_name: Option<String>,
    pub action: AuditAction,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Append-only log of admin mutations. Writes are best effort: a failure is
/// logged and swallowed so it never changes the outcome of the mutation
/// that triggered it.
#[derive(Clone)]
pub struct AuditRecorder {
    pool: SqlitePool,
}

impl AuditRecorder {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, actor: &Identity, action: AuditAction, details: impl Into<String>) {
        let details = details.into();
        if let Err(err) = self.append(actor, action, &details).await {
            error!(actor_id = actor.id, ?action, %err, "failed to write audit entry");
        }
    }

    async fn append(&self, actor: &Identity, action: AuditAction, details: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO audit_log (actor_id, actor_name, action, details, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(actor.id)
        .bind(&actor.display_name)
        .bind(action)
        .bind(details)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent entries first. `limit` is capped at [`MAX_AUDIT_PAGE`];
    /// callers reject non-positive limits before getting here.
    pub async fn recent(&self, limit: i64) -> Result<Vec<AuditEntry>, StoreError> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            "SELECT id, actor_id, actor_name, action, details, created_at FROM audit_log \
             ORDER BY id DESC LIMIT ?",
        )
        .bind(limit.min(MAX_AUDIT_PAGE))
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
