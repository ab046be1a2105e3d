use tracing::info;

use crate::{
    audit::{AuditAction, AuditEntry, AuditRecorder},
    error::MutationError,
    ledger::{Ledger, ResetScope, SpinRecord},
    prize::{NewPrize, Prize, PrizeId, PrizeUpdate},
    prizes::PrizeStore,
    roles::{Identity, Member, Role},
    roster::Roster,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrizeOp {
    Create(NewPrize),
    Update { id: PrizeId, patch: PrizeUpdate },
    Delete(PrizeId),
    Reorder(Vec<PrizeId>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrizeAck {
    Created(Prize),
    Updated(Prize),
    Deleted(Prize),
    Reordered { count: usize },
}

/// Entry point for everything an operator can do. Each call resolves the
/// caller against the roster before touching any state and, after a
/// successful mutation, appends one audit entry.
#[derive(Clone)]
pub struct AdminMutator {
    prizes: PrizeStore,
    ledger: Ledger,
    roster: Roster,
    audit: AuditRecorder,
}

impl AdminMutator {
    pub fn new(prizes: PrizeStore, ledger: Ledger, roster: Roster, audit: AuditRecorder) -> Self {
        Self {
            prizes,
            ledger,
            roster,
            audit,
        }
    }

    /// The caller's roster entry, provided it grants `required`.
    pub async fn authorize(&self, actor: &Identity, required: Role) -> Result<Member, MutationError> {
        match self.roster.resolve(actor.id).await? {
            Some(member) if member.role.grants(required) => Ok(member),
            _ => Err(MutationError::Forbidden),
        }
    }

    pub async fn prizes(&self, actor: &Identity) -> Result<Vec<Prize>, MutationError> {
        self.authorize(actor, Role::Viewer).await?;
        Ok(self.prizes.list_all().await?)
    }

    pub async fn results(&self, actor: &Identity) -> Result<Vec<SpinRecord>, MutationError> {
        self.authorize(actor, Role::Viewer).await?;
        Ok(self.ledger.records().await?)
    }

    /// Newest entries first. `limit` must be positive and is capped at
    /// [`crate::audit::MAX_AUDIT_PAGE`].
    pub async fn audit_log(&self, actor: &Identity, limit: i64) -> Result<Vec<AuditEntry>, MutationError> {
        self.authorize(actor, Role::Admin).await?;
        if limit < 1 {
            return Err(MutationError::Invalid {
                field: "limit",
                reason: format!("must be at least 1, got {limit}"),
            });
        }
        Ok(self.audit.recent(limit).await?)
    }

    pub async fn members(&self, actor: &Identity) -> Result<Vec<Member>, MutationError> {
        self.authorize(actor, Role::Admin).await?;
        Ok(self.roster.list().await?)
    }

    /// Runs any prize operation; the typed methods below do the same for a
    /// single kind of operation.
    pub async fn mutate_prize(&self, actor: &Identity, op: PrizeOp) -> Result<PrizeAck, MutationError> {
        match op {
            PrizeOp::Create(new) => self.create_prize(actor, new).await.map(PrizeAck::Created),
            PrizeOp::Update { id, patch } => self.update_prize(actor, id, patch).await.map(PrizeAck::Updated),
            PrizeOp::Delete(id) => self.delete_prize(actor, id).await.map(PrizeAck::Deleted),
            PrizeOp::Reorder(order) => self
                .reorder_prizes(actor, &order)
                .await
                .map(|count| PrizeAck::Reordered { count }),
        }
    }

    pub async fn create_prize(&self, actor: &Identity, new: NewPrize) -> Result<Prize, MutationError> {
        self.authorize(actor, Role::Admin).await?;
        let prize = self.prizes.create(new).await?;
        let details = format!("#{}: {} {}", prize.id, prize.icon, prize.label);
        self.prize_store_changed(actor, AuditAction::CreatePrize, details).await;
        Ok(prize)
    }

    pub async fn update_prize(
        &self,
        actor: &Identity,
        id: PrizeId,
        patch: PrizeUpdate,
    ) -> Result<Prize, MutationError> {
        self.authorize(actor, Role::Admin).await?;
        let prize = self.prizes.update(id, patch).await?;
        let details = format!("#{}: {} (active={})", prize.id, prize.label, prize.active);
        self.prize_store_changed(actor, AuditAction::UpdatePrize, details).await;
        Ok(prize)
    }

    pub async fn delete_prize(&self, actor: &Identity, id: PrizeId) -> Result<Prize, MutationError> {
        self.authorize(actor, Role::Admin).await?;
        let prize = self.prizes.delete(id).await?;
        let details = format!("#{}: {}", prize.id, prize.label);
        self.prize_store_changed(actor, AuditAction::DeletePrize, details).await;
        Ok(prize)
    }

    /// Returns how many prizes were placed.
    pub async fn reorder_prizes(&self, actor: &Identity, order: &[PrizeId]) -> Result<usize, MutationError> {
        self.authorize(actor, Role::Admin).await?;
        self.prizes.reorder(order).await?;
        let details = format!("{} prizes", order.len());
        self.prize_store_changed(actor, AuditAction::ReorderPrizes, details).await;
        Ok(order.len())
    }

    async fn prize_store_changed(&self, actor: &Identity, action: AuditAction, details: String) {
        info!(actor_id = actor.id, %action, %details, "prize store changed");
        self.audit.record(actor, action, details).await;
    }

    /// Deletes ledger records so the affected identities can claim again.
    /// Returns how many records were removed. Prizes are left untouched.
    pub async fn reset_spins(&self, actor: &Identity, scope: ResetScope) -> Result<u64, MutationError> {
        self.authorize(actor, Role::Admin).await?;
        match scope {
            ResetScope::All => {
                let removed = self.ledger.reset_all().await?;
                info!(actor_id = actor.id, removed, "all spins reset");
                self.audit
                    .record(actor, AuditAction::ResetAll, format!("{removed} records"))
                    .await;
                Ok(removed)
            }
            ResetScope::Identity(identity_id) => {
                let record = self
                    .ledger
                    .reset_identity(identity_id)
                    .await?
                    .ok_or(MutationError::NotFound {
                        what: "spin for identity",
                        id: identity_id,
                    })?;
                info!(actor_id = actor.id, identity_id, "spin reset");
                self.audit
                    .record(
                        actor,
                        AuditAction::ResetOne,
                        format!("identity={identity_id}, prize={}", record.prize_label),
                    )
                    .await;
                Ok(1)
            }
        }
    }

    pub async fn add_member(
        &self,
        actor: &Identity,
        identity_id: i64,
        display_name: Option<String>,
        role: Role,
    ) -> Result<Member, MutationError> {
        self.authorize(actor, Role::Admin).await?;
        let member = self.roster.add(actor.id, identity_id, display_name, role).await?;
        info!(actor_id = actor.id, identity_id, %role, "member added");
        self.audit
            .record(actor, AuditAction::AddMember, format!("identity={identity_id}, role={role}"))
            .await;
        Ok(member)
    }

    pub async fn remove_member(&self, actor: &Identity, identity_id: i64) -> Result<Member, MutationError> {
        self.authorize(actor, Role::Admin).await?;
        let member = self.roster.remove(actor.id, identity_id).await?;
        info!(actor_id = actor.id, identity_id, "member removed");
        self.audit
            .record(
                actor,
                AuditAction::RemoveMember,
                format!("identity={identity_id}, role={}", member.role),
            )
            .await;
        Ok(member)
    }

    pub async fn change_role(&self, actor: &Identity, identity_id: i64, role: Role) -> Result<Member, MutationError> {
        self.authorize(actor, Role::Admin).await?;
        let member = self.roster.change_role(actor.id, identity_id, role).await?;
        info!(actor_id = actor.id, identity_id, %role, "member role changed");
        self.audit
            .record(actor, AuditAction::ChangeRole, format!("identity={identity_id}, role={role}"))
            .await;
        Ok(member)
    }
}
