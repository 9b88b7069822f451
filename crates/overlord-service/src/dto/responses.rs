//! Operation reports

use std::fmt;

use overlord_core::entities::Rank;
use overlord_core::traits::SyncSummary;
use serde::Serialize;

use crate::services::SyncState;

/// Read-only status, served without taking the gate
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub state: SyncState,
    pub busy: bool,
    pub roles: usize,
    pub ranks: usize,
}

impl fmt::Display for StatusResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "state: {}, {}, {} roles, {} ranks",
            self.state,
            if self.busy { "busy" } else { "ready" },
            self.roles,
            self.ranks
        )
    }
}

/// One configured rank
#[derive(Debug, Clone, Serialize)]
pub struct RankResponse {
    pub name: String,
    pub weight: i64,
    pub membership: i64,
    pub messages: i64,
    pub vc: i64,
}

impl From<&Rank> for RankResponse {
    fn from(rank: &Rank) -> Self {
        Self {
            name: rank.name.clone(),
            weight: rank.weight,
            membership: rank.membership,
            messages: rank.messages,
            vc: rank.vc,
        }
    }
}

impl fmt::Display for RankResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (weight {}): {} days, {} messages or {}s in voice",
            self.name, self.weight, self.membership, self.messages, self.vc
        )
    }
}

/// Result of a role sync pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoleSyncReport {
    pub inserted: u64,
    pub updated: u64,
    pub removed: u64,
}

impl From<SyncSummary> for RoleSyncReport {
    fn from(summary: SyncSummary) -> Self {
        Self {
            inserted: summary.inserted,
            updated: summary.updated,
            removed: summary.removed,
        }
    }
}

/// Result of a user sync pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserSyncReport {
    pub members: u64,
    pub bots: u64,
    pub joins_repaired: u64,
    pub purged: u64,
}

/// Result of a full rank recompute
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RankSweepReport {
    pub checked: u64,
    pub updated: u64,
    pub skipped: u64,
}

impl fmt::Display for RankSweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} members checked, {} updated, {} skipped",
            self.checked, self.updated, self.skipped
        )
    }
}
