//! Role entity - a platform role plus its dense index

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Role as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSnapshot {
    pub id: Snowflake,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl RoleSnapshot {
    pub fn new(id: Snowflake, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            created_at: id.created_at(),
        }
    }
}

/// Stored role row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: Snowflake,
    pub name: String,
    /// Position of this role in every user's role mask
    pub idx: i32,
    pub created_at: DateTime<Utc>,
}

impl Role {
    /// Assign dense indices to a platform role list.
    ///
    /// Roles are ordered by id so the index is stable for an unchanged role set.
    pub fn index_roles(roles: &[RoleSnapshot]) -> Vec<Role> {
        let mut sorted: Vec<&RoleSnapshot> = roles.iter().collect();
        sorted.sort_by_key(|r| r.id);
        sorted
            .into_iter()
            .enumerate()
            .map(|(idx, r)| Role {
                id: r.id,
                name: r.name.clone(),
                idx: idx as i32,
                created_at: r.created_at,
            })
            .collect()
    }
}
