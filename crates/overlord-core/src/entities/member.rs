//! Member snapshot - a guild member as reported by the platform

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Guild member as seen by the platform client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSnapshot {
    pub id: Snowflake,
    pub name: String,
    pub discriminator: String,
    pub display_name: String,
    #[serde(default)]
    pub role_ids: Vec<Snowflake>,
    #[serde(default)]
    pub bot: bool,
    pub joined_at: DateTime<Utc>,
}

impl MemberSnapshot {
    /// Create a member with no roles that joined now
    pub fn new(id: Snowflake, name: impl Into<String>, discriminator: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            display_name: name.clone(),
            name,
            discriminator: discriminator.into(),
            role_ids: Vec::new(),
            bot: false,
            joined_at: Utc::now(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_roles(mut self, role_ids: Vec<Snowflake>) -> Self {
        self.role_ids = role_ids;
        self
    }

    pub fn with_joined_at(mut self, joined_at: DateTime<Utc>) -> Self {
        self.joined_at = joined_at;
        self
    }

    pub fn as_bot(mut self) -> Self {
        self.bot = true;
        self
    }

    /// Get the full tag: name#discriminator
    pub fn tag(&self) -> String {
        format!("{}#{}", self.name, self.discriminator)
    }

    /// Check if member has a specific role
    #[inline]
    pub fn has_role(&self, role_id: Snowflake) -> bool {
        self.role_ids.contains(&role_id)
    }

    /// Apply role changes locally after the platform accepted them
    pub fn apply_role_changes(&mut self, removed: &[Snowflake], added: &[Snowflake]) {
        self.role_ids.retain(|id| !removed.contains(id));
        for id in added {
            if !self.has_role(*id) {
                self.role_ids.push(*id);
            }
        }
    }

    /// True when any of the fields we persist differ
    pub fn differs_from(&self, other: &MemberSnapshot) -> bool {
        self.role_ids != other.role_ids
            || self.display_name != other.display_name
            || self.name != other.name
            || self.discriminator != other.discriminator
    }
}
