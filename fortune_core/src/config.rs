use std::env;

use thiserror::Error;

use crate::{error::MutationError, retry::RetryPolicy};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://fortune.db";
pub const DEFAULT_MIN_ACTIVE: usize = 2;
pub const DEFAULT_MAX_ACTIVE: usize = 12;
const DEFAULT_CLAIM_ATTEMPTS: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid admin id {value:?} in ADMIN_IDS")]
    InvalidAdminId { value: String },
    #[error("{key} must be a non-negative integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("active sector bounds {min}..={max} are invalid")]
    InvalidBounds { min: usize, max: usize },
}

/// Allowed range for the number of active sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorBounds {
    pub min_active: usize,
    pub max_active: usize,
}

impl SectorBounds {
    pub fn new(min_active: usize, max_active: usize) -> Result<Self, ConfigError> {
        if min_active == 0 || min_active > max_active {
            return Err(ConfigError::InvalidBounds {
                min: min_active,
                max: max_active,
            });
        }
        Ok(Self {
            min_active,
            max_active,
        })
    }

    /// Validates a mutation by the active count it leaves behind. A change
    /// that does not move the count in the offending direction is allowed,
    /// so a store that is already out of range can still be repaired.
    pub fn check_transition(&self, before: usize, after: usize) -> Result<(), MutationError> {
        if after > before && after > self.max_active {
            return Err(MutationError::TooManyActive {
                max: self.max_active,
            });
        }
        if after < before && after < self.min_active {
            return Err(MutationError::TooFewActive {
                min: self.min_active,
            });
        }
        Ok(())
    }
}

impl Default for SectorBounds {
    fn default() -> Self {
        Self {
            min_active: DEFAULT_MIN_ACTIVE,
            max_active: DEFAULT_MAX_ACTIVE,
        }
    }
}

/// Process-wide settings, built once at start-up and handed to constructors.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub database_url: String,
    pub admin_ids: Vec<i64>,
    pub bounds: SectorBounds,
    pub claim_retry: RetryPolicy,
}

impl CoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
        let admin_ids = parse_admin_ids(&lookup("ADMIN_IDS").unwrap_or_default())?;
        let min = parse_usize(&lookup, "MIN_ACTIVE_SECTORS", DEFAULT_MIN_ACTIVE)?;
        let max = parse_usize(&lookup, "MAX_ACTIVE_SECTORS", DEFAULT_MAX_ACTIVE)?;
        let attempts = parse_usize(&lookup, "CLAIM_RETRY_ATTEMPTS", DEFAULT_CLAIM_ATTEMPTS)?;
        Ok(Self {
            database_url,
            admin_ids,
            bounds: SectorBounds::new(min, max)?,
            claim_retry: RetryPolicy::new(attempts, RetryPolicy::default().pause),
        })
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.into(),
            admin_ids: Vec::new(),
            bounds: SectorBounds::default(),
            claim_retry: RetryPolicy::default(),
        }
    }
}

fn parse_admin_ids(raw: &str) -> Result<Vec<i64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map_err(|_| ConfigError::InvalidAdminId {
                value: s.to_string(),
            })
        })
        .collect()
}

fn parse_usize<F>(lookup: &F, key: &'static str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
    }
}
