//! Rank definitions and the configured rank table

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A rank, identified by the name of the role it grants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rank {
    pub name: String,
    pub weight: i64,
    /// Minimum membership in days
    pub membership: i64,
    /// Minimum net message count
    pub messages: i64,
    /// Minimum voice time in seconds
    pub vc: i64,
}

impl Rank {
    /// `(messages OR vc) AND membership`
    pub fn is_eligible(&self, messages: i64, vc: i64, membership: i64) -> bool {
        (messages >= self.messages || vc >= self.vc) && membership >= self.membership
    }
}

/// "Holds any of these roles" predicate over a member's role names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleFilter(Vec<String>);

impl RoleFilter {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn matches_any<'a, I>(&self, held: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        held.into_iter().any(|name| self.0.iter().any(|n| n == name))
    }
}

/// The validated set of ranks plus the role filters that exclude members
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankTable {
    ranks: Vec<Rank>,
    pub ignored: RoleFilter,
    pub required: RoleFilter,
}

impl RankTable {
    /// Build a table, rejecting duplicate weights and negative thresholds.
    ///
    /// Ranks are kept ordered by weight.
    pub fn new(
        mut ranks: Vec<Rank>,
        ignored: RoleFilter,
        required: RoleFilter,
    ) -> Result<Self, DomainError> {
        let mut seen: HashMap<i64, &str> = HashMap::new();
        for rank in &ranks {
            for (field, value) in [
                ("membership", rank.membership),
                ("messages", rank.messages),
                ("vc", rank.vc),
            ] {
                if value < 0 {
                    return Err(DomainError::InvalidConfig {
                        path: format!("rank.role.{}.{}", rank.name, field),
                        reason: format!("must not be negative (got {value})"),
                    });
                }
            }
            if let Some(first) = seen.insert(rank.weight, &rank.name) {
                return Err(DomainError::InvalidConfig {
                    path: format!("rank.role.{}.weight", rank.name),
                    reason: format!("weight {} already used by rank {}", rank.weight, first),
                });
            }
        }

        ranks.sort_by_key(|r| r.weight);
        Ok(Self {
            ranks,
            ignored,
            required,
        })
    }

    pub fn ranks(&self) -> &[Rank] {
        &self.ranks
    }

    pub fn find(&self, name: &str) -> Option<&Rank> {
        self.ranks.iter().find(|r| r.name == name)
    }

    pub fn find_by_weight(&self, weight: i64) -> Option<&Rank> {
        self.ranks.iter().find(|r| r.weight == weight)
    }

    #[inline]
    pub fn is_rank_role(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Members holding an ignored role, or none of the required ones, are never ranked
    pub fn excludes<'a, I>(&self, held: I) -> bool
    where
        I: IntoIterator<Item = &'a str> + Clone,
    {
        self.ignored.matches_any(held.clone())
            || (!self.required.is_empty() && !self.required.matches_any(held))
    }

    /// Check every referenced role name against the role snapshot
    pub fn validate_roles<F>(&self, role_exists: F) -> Result<(), DomainError>
    where
        F: Fn(&str) -> bool,
    {
        for rank in &self.ranks {
            if !role_exists(&rank.name) {
                return Err(DomainError::InvalidConfig {
                    path: format!("rank.role.{}", rank.name),
                    reason: format!("role '{}' does not exist", rank.name),
                });
            }
        }
        for (section, filter) in [("rank.ignored", &self.ignored), ("rank.required", &self.required)] {
            if let Some((i, name)) = filter.names().iter().enumerate().find(|(_, n)| !role_exists(n)) {
                return Err(DomainError::InvalidConfig {
                    path: format!("{section}[{i}]"),
                    reason: format!("role '{name}' does not exist"),
                });
            }
        }
        Ok(())
    }
}
