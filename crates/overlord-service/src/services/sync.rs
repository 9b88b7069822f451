//! Sync service
//!
//! Role and user synchronization passes that move the state machine forward,
//! and the invalidation path driven by structural role changes.

use futures::StreamExt;
use overlord_core::entities::{EventKind, MemberSnapshot, NewEvent, Role, User};
use overlord_core::traits::Notice;
use tracing::{debug, info, instrument, warn};

use crate::dto::{RoleSyncReport, StatusResponse, UserSyncReport};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::gate::GateGuard;
use super::state::SyncState;

/// Sync service
pub struct SyncService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> SyncService<'a> {
    /// Create a new SyncService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Current state and gate occupancy. Does not take the gate.
    pub fn status(&self) -> StatusResponse {
        StatusResponse {
            state: self.ctx.sync_state().state(),
            busy: self.ctx.gate().is_busy(),
            roles: self.ctx.snapshot().role_count(),
            ranks: self.ctx.rank_table().ranks().len(),
        }
    }

    /// Roles, then users, in one gate acquisition
    pub async fn resync(&self) -> ServiceResult<(RoleSyncReport, UserSyncReport)> {
        let gate = self.ctx.gate().acquire().await;
        let roles = self.sync_roles_locked(&gate).await?;
        let users = self.sync_users_locked(&gate).await?;
        Ok((roles, users))
    }

    pub async fn sync_roles(&self) -> ServiceResult<RoleSyncReport> {
        let gate = self.ctx.gate().acquire().await;
        self.sync_roles_locked(&gate).await
    }

    /// Rebuild the role index from the platform and diff it into the role table.
    ///
    /// On a platform failure the state is left as it was.
    #[instrument(skip_all)]
    pub async fn sync_roles_locked(&self, _gate: &GateGuard<'_>) -> ServiceResult<RoleSyncReport> {
        info!("Syncing roles");

        let snapshots = self.ctx.platform().fetch_roles().await.map_err(|e| {
            warn!(error = %e, "Role sync failed: platform unavailable");
            ServiceError::from(e)
        })?;
        let roles = Role::index_roles(&snapshots);

        let summary = self.ctx.role_repo().sync_all(&roles).await?;
        self.ctx.snapshot().load_roles(roles);
        self.ctx.sync_state().roles_synced();

        info!(
            inserted = summary.inserted,
            updated = summary.updated,
            removed = summary.removed,
            "Syncing roles done"
        );
        Ok(summary.into())
    }

    pub async fn sync_users(&self) -> ServiceResult<UserSyncReport> {
        let gate = self.ctx.gate().acquire().await;
        self.sync_users_locked(&gate).await
    }

    /// Clear every user, reload all members as present, repair join events.
    #[instrument(skip_all)]
    pub async fn sync_users_locked(&self, _gate: &GateGuard<'_>) -> ServiceResult<UserSyncReport> {
        self.ctx
            .require_state("sync users", SyncState::RolesSynced)
            .await?;

        info!("Syncing users");
        let cleared = self.ctx.user_repo().mark_all_absent().await?;
        debug!(cleared, "Cleared user rows");

        let mut report = UserSyncReport::default();
        let mut members = self.ctx.platform().fetch_members();
        while let Some(member) = members.next().await {
            let member = member?;
            if member.bot {
                self.ctx.snapshot().mark_bot(member.id);
                report.bots += 1;
                continue;
            }

            let mask = self.ctx.snapshot().mask_for(&member.role_ids);
            self.ctx
                .user_repo()
                .upsert(&User::from_member(&member, mask))
                .await?;
            if self.repair_join(&member).await? {
                report.joins_repaired += 1;
            }
            report.members += 1;
        }

        if !self.ctx.config().user.leave.keep {
            report.purged = self.ctx.user_repo().purge_absent().await?;
        }

        self.ctx.sync_state().users_synced();
        info!(
            members = report.members,
            bots = report.bots,
            joins_repaired = report.joins_repaired,
            purged = report.purged,
            "Syncing users done"
        );
        Ok(report)
    }

    /// The latest member event must be a join stamped with the platform's
    /// join time. Returns `true` when a join had to be added.
    async fn repair_join(&self, member: &MemberSnapshot) -> ServiceResult<bool> {
        let events = self.ctx.event_repo();
        match events.last_member_event(member.id).await? {
            Some(join) if join.kind == EventKind::MemberJoin => {
                if join.created_at != member.joined_at {
                    events.set_created_at(join.id, member.joined_at).await?;
                }
                Ok(false)
            }
            _ => {
                debug!(user_id = %member.id, "Adding missing join event");
                events
                    .append(&NewEvent::member(
                        EventKind::MemberJoin,
                        member.id,
                        member.joined_at,
                    ))
                    .await?;
                Ok(true)
            }
        }
    }

    pub async fn invalidate(&self, reason: &str) {
        let gate = self.ctx.gate().acquire().await;
        self.invalidate_locked(&gate, reason).await;
    }

    /// Structural role change: drop to `UNSYNCED` and warn operators once.
    pub async fn invalidate_locked(&self, _gate: &GateGuard<'_>, reason: &str) {
        if !self.ctx.sync_state().invalidate() {
            debug!(reason, "Already awaiting synchronization");
            return;
        }
        warn!(reason, "Snapshot invalidated");
        self.ctx.sync_state().claim_notice();
        self.ctx
            .notify(Notice::warning(format!(
                "{reason}. Awaiting role synchronization"
            )))
            .await;
    }
}
