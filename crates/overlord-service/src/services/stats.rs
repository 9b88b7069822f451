//! Stat service
//!
//! Batch rebuild of event-derived stats, and manual stat overrides. Runs
//! under the gate like every other mutation, so it never races the aggregator.

use chrono::{DateTime, Utc};
use overlord_core::entities::StatKind;
use overlord_core::Snowflake;
use tracing::{info, instrument};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::gate::GateGuard;
use super::state::SyncState;

/// Stat service
pub struct StatService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> StatService<'a> {
    /// Create a new StatService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn rebuild_membership(&self) -> ServiceResult<usize> {
        let gate = self.ctx.gate().acquire().await;
        self.rebuild_membership_locked(&gate, Utc::now()).await
    }

    /// Membership = whole days since each present user's latest join.
    ///
    /// Idempotent for a fixed `now`.
    #[instrument(skip(self, _gate))]
    pub async fn rebuild_membership_locked(
        &self,
        _gate: &GateGuard<'_>,
        now: DateTime<Utc>,
    ) -> ServiceResult<usize> {
        info!("Scheduled stat update");

        let values: Vec<_> = self
            .ctx
            .event_repo()
            .latest_joins()
            .await?
            .into_iter()
            .map(|(user_id, joined_at)| (user_id, membership_days(joined_at, now)))
            .collect();

        self.ctx
            .stat_repo()
            .set_many(StatKind::Membership, &values)
            .await?;

        info!(users = values.len(), "Done scheduled stat update");
        Ok(values.len())
    }

    pub async fn set_stat(&self, user_id: Snowflake, kind: StatKind, value: i64) -> ServiceResult<()> {
        let gate = self.ctx.gate().acquire().await;
        self.set_stat_locked(&gate, user_id, kind, value).await
    }

    /// Overwrite one stat of a tracked user, e.g. a weight override
    #[instrument(skip(self, _gate))]
    pub async fn set_stat_locked(
        &self,
        _gate: &GateGuard<'_>,
        user_id: Snowflake,
        kind: StatKind,
        value: i64,
    ) -> ServiceResult<()> {
        self.ctx
            .require_state("set stat", SyncState::FullySynced)
            .await?;

        if value < 0 {
            return Err(ServiceError::validation(format!(
                "{kind} must not be negative (got {value})"
            )));
        }
        if self.ctx.user_repo().find_by_id(user_id).await?.is_none() {
            return Err(ServiceError::not_found("User", user_id.to_string()));
        }

        self.ctx
            .stat_repo()
            .set_many(kind, &[(user_id, value)])
            .await?;
        info!(%user_id, %kind, value, "Stat overridden");
        Ok(())
    }
}

/// Whole days between a join and `now`, never negative
pub fn membership_days(joined_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - joined_at).num_days().max(0)
}
