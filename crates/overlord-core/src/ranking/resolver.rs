//! Rank resolution and reconciliation planning
//!
//! Both functions are pure: they read stats, the rank table and the role
//! names a member currently holds, and never touch storage or the platform.

use crate::entities::{Rank, RankTable, UserStats};

/// Resolve the effective rank of a member.
///
/// Returns `None` when the member is excluded by the ignored/required role
/// filters or when no rank is eligible. Among eligible ranks the highest
/// weight wins; weights are unique so the choice is deterministic.
pub fn resolve<'t>(stats: &UserStats, table: &'t RankTable, held: &[&str]) -> Option<&'t Rank> {
    if table.excludes(held.iter().copied()) {
        return None;
    }

    if stats.exact_weight > 0 {
        return table.find_by_weight(stats.exact_weight);
    }

    let messages = stats.messages();
    table
        .ranks()
        .iter()
        .filter(|r| stats.min_weight <= 0 || r.weight >= stats.min_weight)
        .filter(|r| stats.max_weight <= 0 || r.weight <= stats.max_weight)
        .filter(|r| r.is_eligible(messages, stats.vc_time, stats.membership))
        .max_by_key(|r| r.weight)
}

/// Role changes needed to bring a member to their resolved rank
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankPlan {
    /// Rank roles to remove, issued first
    pub remove: Vec<String>,
    /// Rank role to add afterwards
    pub add: Option<String>,
}

impl RankPlan {
    /// Nothing to send to the platform
    #[inline]
    pub fn is_noop(&self) -> bool {
        self.remove.is_empty() && self.add.is_none()
    }
}

/// Diff the rank roles a member holds against the resolved rank.
///
/// Every held rank role other than the resolved one is removed, even when the
/// resolved rank is `None`. The resolved role is added only if missing.
pub fn plan(table: &RankTable, held: &[&str], resolved: Option<&Rank>) -> RankPlan {
    let target = resolved.map(|r| r.name.as_str());

    let remove = held
        .iter()
        .filter(|name| table.is_rank_role(name) && Some(**name) != target)
        .map(|name| name.to_string())
        .collect();

    let add = target
        .filter(|name| !held.contains(name))
        .map(str::to_string);

    RankPlan { remove, add }
}
