use thiserror::Error;

use crate::prize::PrizeId;

/// SQLite primary result codes that indicate contention rather than a fault.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage busy: {0}")]
    Busy(#[source] sqlx::Error),
    #[error("storage error: {0}")]
    Database(#[source] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Busy/locked database or an exhausted pool; worth retrying later.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Busy(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if is_contention(&err) {
            StoreError::Busy(err)
        } else {
            StoreError::Database(err)
        }
    }
}

fn is_contention(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db) => db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
            .unwrap_or(false),
        _ => false,
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("identity has already claimed a prize")]
    AlreadyClaimed,
    #[error("no active prizes to allocate")]
    NoActivePrizes,
    #[error("storage temporarily unavailable, try again")]
    StoreUnavailable(#[source] StoreError),
    #[error(transparent)]
    Store(StoreError),
}

impl ClaimError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ClaimError::StoreUnavailable(_))
    }
}

impl From<StoreError> for ClaimError {
    fn from(err: StoreError) -> Self {
        if err.is_transient() {
            ClaimError::StoreUnavailable(err)
        } else {
            ClaimError::Store(err)
        }
    }
}

impl From<sqlx::Error> for ClaimError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::from(err).into()
    }
}

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("caller is not permitted to do this")]
    Forbidden,
    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: i64 },
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("at most {max} prizes may be active")]
    TooManyActive { max: usize },
    #[error("at least {min} prizes must stay active")]
    TooFewActive { min: usize },
    #[error("reorder must list every prize exactly once: {reason}")]
    InvalidPermutation { reason: String },
    #[error("you cannot remove your own access")]
    SelfRemoval,
    #[error("the last admin cannot be removed")]
    LastAdmin,
    #[error("identity {identity_id} already has access")]
    AlreadyExists { identity_id: i64 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MutationError {
    pub(crate) fn prize_not_found(id: PrizeId) -> Self {
        MutationError::NotFound { what: "prize", id }
    }
}

impl From<sqlx::Error> for MutationError {
    fn from(err: sqlx::Error) -> Self {
        MutationError::Store(err.into())
    }
}
