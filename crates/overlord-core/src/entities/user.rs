//! User entity - a community member as tracked in the stat store

use chrono::{DateTime, Utc};

use crate::entities::MemberSnapshot;
use crate::value_objects::{RoleMask, Snowflake};

/// Stored user row.
///
/// A user is *present* while `display_name` and `roles` are set. Leaving the
/// guild (or the start of a full user sync) clears both without deleting the
/// row, so stats and history survive a rejoin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Snowflake,
    pub name: String,
    pub discriminator: String,
    pub display_name: Option<String>,
    pub roles: Option<RoleMask>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a present user row from a member snapshot
    pub fn from_member(member: &MemberSnapshot, roles: RoleMask) -> Self {
        Self {
            id: member.id,
            name: member.name.clone(),
            discriminator: member.discriminator.clone(),
            display_name: Some(member.display_name.clone()),
            roles: Some(roles),
            created_at: member.joined_at,
            updated_at: Utc::now(),
        }
    }

    /// Get the full tag: name#discriminator
    pub fn tag(&self) -> String {
        format!("{}#{}", self.name, self.discriminator)
    }

    /// Check if the user has left (or has not been seen by the last sync)
    #[inline]
    pub fn is_absent(&self) -> bool {
        self.display_name.is_none() && self.roles.is_none()
    }

    /// Clear the mutable fields, keeping identity and history
    pub fn mark_absent(&mut self) {
        self.display_name = None;
        self.roles = None;
        self.updated_at = Utc::now();
    }

    /// Replace the stored role mask
    pub fn set_roles(&mut self, roles: RoleMask) {
        self.roles = Some(roles);
        self.updated_at = Utc::now();
    }
}
