use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PrizeOut {
    pub id: i64,
    pub label: String,
    pub icon: String,
    pub color: String,
    pub position: i64,
    pub is_active: bool,
}

/// Result of a successful claim, and the prize part of a check.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SpinOut {
    pub prize_id: i64,
    pub prize_label: String,
    pub prize_icon: String,
    pub prize_color: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CheckOut {
    pub has_played: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize: Option<SpinOut>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SpinResultOut {
    pub id: i64,
    pub identity_id: i64,
    pub display_name: Option<String>,
    pub prize_id: i64,
    pub prize_label: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PrizeCreateRequest {
    pub label: String,
    pub icon: String,
    pub color: String,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PrizeUpdateRequest {
    pub label: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReorderRequest {
    pub order: Vec<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MemberCreateRequest {
    pub identity_id: i64,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RoleChangeRequest {
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MemberOut {
    pub id: i64,
    pub identity_id: i64,
    pub display_name: Option<String>,
    pub role: String,
    pub added_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AuditEntryOut {
    pub id: i64,
    pub actor_id: i64,
    pub actor_name: Option<String>,
    pub action: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ResetOut {
    pub removed: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StatusOut {
    pub status: String,
}

impl StatusOut {
    pub fn ok() -> Self {
        Self {
            status: "ok".into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

fn default_true() -> bool {
    true
}

fn default_role() -> String {
    "admin".into()
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("missing or invalid caller identity")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("service temporarily unavailable, retry later")]
    Unavailable,
    #[error("internal server error")]
    Internal,
}
