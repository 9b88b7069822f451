//! Ranking service
//!
//! Reconciles a member's rank roles with the rank resolved from their stats,
//! and edits the rank table at runtime.

use futures::StreamExt;
use overlord_common::config::RankRoleConfig;
use overlord_common::BotConfig;
use overlord_core::entities::{MemberSnapshot, Rank, RankTable};
use overlord_core::ranking::{plan, resolve};
use overlord_core::{DomainError, Snowflake};
use tracing::{debug, info, instrument, warn};

use crate::dto::{RankResponse, RankSweepReport};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::gate::GateGuard;
use super::state::SyncState;

/// What one reconciliation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankOutcome {
    /// Already at the resolved rank, no platform call
    Unchanged,
    /// Rank roles were removed and/or added
    Updated {
        removed: Vec<String>,
        added: Option<String>,
    },
    /// Holds an ignored role or lacks a required one
    Excluded,
    /// Not in the user table
    UnknownUser,
    /// No longer a guild member
    NotInGuild,
}

impl RankOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}

/// Ranking service
pub struct RankingService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> RankingService<'a> {
    /// Create a new RankingService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn update_rank(&self, user_id: Snowflake) -> ServiceResult<RankOutcome> {
        let gate = self.ctx.gate().acquire().await;
        self.update_rank_locked(&gate, user_id).await
    }

    /// Reconcile one user, fetching their current member state
    #[instrument(skip(self, gate))]
    pub async fn update_rank_locked(
        &self,
        gate: &GateGuard<'_>,
        user_id: Snowflake,
    ) -> ServiceResult<RankOutcome> {
        self.ctx
            .require_state("update rank", SyncState::FullySynced)
            .await?;

        let Some(member) = self.ctx.platform().fetch_member(user_id).await? else {
            debug!(%user_id, "Member left, skipping rank update");
            return Ok(RankOutcome::NotInGuild);
        };
        if member.bot {
            self.ctx.snapshot().mark_bot(member.id);
            return Ok(RankOutcome::Excluded);
        }
        self.reconcile_locked(gate, member).await
    }

    pub async fn update_all_ranks(&self) -> ServiceResult<RankSweepReport> {
        let gate = self.ctx.gate().acquire().await;
        self.update_all_ranks_locked(&gate).await
    }

    /// Reconcile every guild member, holding the gate for the whole pass
    #[instrument(skip_all)]
    pub async fn update_all_ranks_locked(&self, gate: &GateGuard<'_>) -> ServiceResult<RankSweepReport> {
        self.ctx
            .require_state("update ranks", SyncState::FullySynced)
            .await?;

        info!("Updating user ranks");
        let mut report = RankSweepReport::default();
        let mut members = self.ctx.platform().fetch_members();
        while let Some(member) = members.next().await {
            let member = member?;
            if member.bot {
                self.ctx.snapshot().mark_bot(member.id);
                continue;
            }
            report.checked += 1;
            match self.reconcile_locked(gate, member).await? {
                RankOutcome::Updated { .. } => report.updated += 1,
                RankOutcome::Unchanged => {}
                _ => report.skipped += 1,
            }
        }

        info!(
            checked = report.checked,
            updated = report.updated,
            skipped = report.skipped,
            "Done updating user ranks"
        );
        Ok(report)
    }

    /// Diff held rank roles against the resolved rank and apply the minimal
    /// change: removals first, then the addition.
    async fn reconcile_locked(
        &self,
        _gate: &GateGuard<'_>,
        mut member: MemberSnapshot,
    ) -> ServiceResult<RankOutcome> {
        let Some(mut user) = self.ctx.user_repo().find_by_id(member.id).await? else {
            warn!(user_id = %member.id, tag = %member.tag(), "User does not exist, skipping rank update");
            return Ok(RankOutcome::UnknownUser);
        };

        let table = self.ctx.rank_table();
        let held = self.ctx.snapshot().role_names(&member.role_ids);
        let held: Vec<&str> = held.iter().map(String::as_str).collect();
        if table.excludes(held.iter().copied()) {
            return Ok(RankOutcome::Excluded);
        }

        let stats = self.ctx.stat_repo().load(member.id).await?;
        let resolved = resolve(&stats, &table, &held);
        let plan = plan(&table, &held, resolved);
        if plan.is_noop() {
            debug!(user_id = %member.id, rank = ?resolved.map(|r| &r.name), "No rank update required");
            return Ok(RankOutcome::Unchanged);
        }

        let removed_ids = self.ctx.snapshot().role_ids(&plan.remove);
        if !removed_ids.is_empty() {
            info!(user_id = %member.id, roles = ?plan.remove, "Removing rank roles");
            self.ctx.platform().remove_roles(member.id, &removed_ids).await?;
        }

        let mut added_ids = Vec::new();
        if let Some(name) = &plan.add {
            let role_id = self
                .ctx
                .snapshot()
                .role_id(name)
                .ok_or_else(|| DomainError::RoleNotFound(name.clone()))?;
            info!(user_id = %member.id, role = %name, "Adding rank role");
            self.ctx.platform().add_roles(member.id, &[role_id]).await?;
            added_ids.push(role_id);
        }

        member.apply_role_changes(&removed_ids, &added_ids);
        user.set_roles(self.ctx.snapshot().mask_for(&member.role_ids));
        self.ctx.user_repo().upsert(&user).await?;

        Ok(RankOutcome::Updated {
            removed: plan.remove,
            added: plan.add,
        })
    }

    /// Every role the live configuration names must exist in the snapshot
    pub fn validate_config(&self) -> ServiceResult<()> {
        self.check_roles(&self.ctx.config(), &self.ctx.rank_table())
    }

    fn check_roles(&self, config: &BotConfig, table: &RankTable) -> ServiceResult<()> {
        let snapshot = self.ctx.snapshot();
        table.validate_roles(|name| snapshot.has_role(name))?;

        for (i, name) in config.control.roles.iter().enumerate() {
            if !snapshot.has_role(name) {
                return Err(DomainError::InvalidConfig {
                    path: format!("control.roles[{i}]"),
                    reason: format!("role '{name}' does not exist"),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Configured ranks, lowest weight first
    pub fn list_ranks(&self) -> Vec<RankResponse> {
        self.ctx
            .rank_table()
            .ranks()
            .iter()
            .map(RankResponse::from)
            .collect()
    }

    pub async fn add_rank(&self, rank: Rank) -> ServiceResult<()> {
        let gate = self.ctx.gate().acquire().await;
        self.add_rank_locked(&gate, rank).await
    }

    /// Add a rank for a role that has none yet
    #[instrument(skip(self, gate, rank), fields(rank = %rank.name))]
    pub async fn add_rank_locked(&self, gate: &GateGuard<'_>, rank: Rank) -> ServiceResult<()> {
        let mut config = BotConfig::clone(&self.ctx.config());
        if config.rank.role.contains_key(&rank.name) {
            return Err(ServiceError::validation(format!(
                "rank {} already exists",
                rank.name
            )));
        }
        config
            .rank
            .role
            .insert(rank.name.clone(), RankRoleConfig::from(&rank));
        self.apply_config_locked(gate, "add rank", config).await
    }

    pub async fn edit_rank(&self, rank: Rank) -> ServiceResult<()> {
        let gate = self.ctx.gate().acquire().await;
        self.edit_rank_locked(&gate, rank).await
    }

    /// Replace the weight and thresholds of an existing rank
    #[instrument(skip(self, gate, rank), fields(rank = %rank.name))]
    pub async fn edit_rank_locked(&self, gate: &GateGuard<'_>, rank: Rank) -> ServiceResult<()> {
        let mut config = BotConfig::clone(&self.ctx.config());
        let Some(entry) = config.rank.role.get_mut(&rank.name) else {
            return Err(ServiceError::not_found("Rank", rank.name));
        };
        *entry = RankRoleConfig::from(&rank);
        self.apply_config_locked(gate, "edit rank", config).await
    }

    pub async fn remove_rank(&self, name: &str) -> ServiceResult<()> {
        let gate = self.ctx.gate().acquire().await;
        self.remove_rank_locked(&gate, name).await
    }

    /// Drop a rank. Members keep the role until their next reconciliation.
    #[instrument(skip(self, gate))]
    pub async fn remove_rank_locked(&self, gate: &GateGuard<'_>, name: &str) -> ServiceResult<()> {
        let mut config = BotConfig::clone(&self.ctx.config());
        if config.rank.role.remove(name).is_none() {
            return Err(ServiceError::not_found("Rank", name));
        }
        self.apply_config_locked(gate, "remove rank", config).await
    }

    /// Check a candidate configuration, persist it, then make it live.
    ///
    /// Any failure leaves the live configuration and the file untouched.
    async fn apply_config_locked(
        &self,
        _gate: &GateGuard<'_>,
        operation: &'static str,
        config: BotConfig,
    ) -> ServiceResult<()> {
        self.ctx
            .require_state(operation, SyncState::RolesSynced)
            .await?;

        config.check()?;
        let table = config.rank_table()?;
        self.check_roles(&config, &table)?;

        if let Some(path) = self.ctx.config_path() {
            config.save(path)?;
        }
        info!(ranks = table.ranks().len(), "Rank configuration updated");
        self.ctx.replace_config(config, table);
        Ok(())
    }
}
