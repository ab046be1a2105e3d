pub mod admin;
pub mod allocator;
pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod prize;
pub mod prizes;
pub mod retry;
pub mod rng;
pub mod roles;
pub mod roster;
pub mod service;

pub use sqlx;

pub use crate::admin::{AdminMutator, PrizeAck, PrizeOp};
pub use crate::allocator::SpinAllocator;
pub use crate::audit::{AuditAction, AuditEntry, AuditRecorder};
pub use crate::config::{ConfigError, CoreConfig, SectorBounds};
pub use crate::error::{ClaimError, MutationError, StoreError};
pub use crate::ledger::{ClaimedPrize, Ledger, ResetScope, SpinRecord};
pub use crate::prize::{NewPrize, Prize, PrizeId, PrizeUpdate, DEFAULT_PRIZES};
pub use crate::prizes::PrizeStore;
pub use crate::retry::RetryPolicy;
pub use crate::rng::{OsRandom, RandomSource, SeededRandom};
pub use crate::roles::{Identity, Member, Role};
pub use crate::roster::Roster;
pub use crate::service::Fortune;
