//! Bot configuration (TOML)
//!
//! Deserialized once with `toml` into typed sections, then checked with
//! `validator` and the rank table's own rules. Every error carries the path of
//! the offending field, e.g. `rank.role.Silver.weight`. Rank edits made at
//! runtime are written back with [`BotConfig::save`].

use std::collections::BTreeMap;
use std::path::Path;

use overlord_core::{DomainError, Rank, RankTable, RoleFilter};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use super::ConfigError;

/// Root of the bot configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BotConfig {
    pub user: UserSection,
    pub event: EventToggles,
    pub rank: RankSection,
    #[validate(nested)]
    pub stats: StatsSection,
    #[validate(nested)]
    pub control: ControlSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSection {
    pub leave: LeaveSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaveSection {
    /// Keep users (cleared) when they leave instead of deleting them
    pub keep: bool,
}

impl Default for LeaveSection {
    fn default() -> Self {
        Self { keep: true }
    }
}

/// Per-event tracking switches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventToggles {
    pub message_new: bool,
    pub message_edit: bool,
    pub message_delete: bool,
    pub member_join: bool,
    pub member_leave: bool,
    pub member_update: bool,
    pub voice_join: bool,
    pub voice_leave: bool,
    /// Treat the AFK channel as not being in voice
    pub voice_afk_ignore: bool,
}

impl Default for EventToggles {
    fn default() -> Self {
        Self {
            message_new: true,
            message_edit: true,
            message_delete: true,
            member_join: true,
            member_leave: true,
            member_update: true,
            voice_join: true,
            voice_leave: true,
            voice_afk_ignore: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RankSection {
    pub ignored: Vec<String>,
    pub required: Vec<String>,
    pub role: BTreeMap<String, RankRoleConfig>,
}

/// Thresholds of one rank, keyed by role name
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankRoleConfig {
    pub weight: i64,
    /// Days
    pub membership: i64,
    pub messages: i64,
    /// Seconds
    pub vc: i64,
}

impl From<&Rank> for RankRoleConfig {
    fn from(rank: &Rank) -> Self {
        Self {
            weight: rank.weight,
            membership: rank.membership,
            messages: rank.messages,
            vc: rank.vc,
        }
    }
}

impl Default for RankRoleConfig {
    fn default() -> Self {
        Self {
            weight: 0,
            membership: 1,
            messages: 1,
            vc: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StatsSection {
    #[validate(range(min = 1, max = 8760, message = "must be between 1 and 8760 hours"))]
    pub rebuild_interval_hours: u64,
}

impl Default for StatsSection {
    fn default() -> Self {
        Self {
            rebuild_interval_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ControlSection {
    #[validate(length(min = 1, max = 8, message = "must be 1-8 characters"))]
    pub prefix: String,
    /// Roles allowed to run admin commands
    pub roles: Vec<String>,
}

impl Default for ControlSection {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            roles: Vec::new(),
        }
    }
}

impl BotConfig {
    /// Load and validate a TOML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or any section is invalid
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// Returns an error if the text is not valid TOML or any section is invalid
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: BotConfig = toml::from_str(raw)?;
        config.check()?;
        Ok(config)
    }

    /// Write the configuration back as TOML.
    ///
    /// The file is replaced by renaming a sibling temporary file, so readers
    /// never see a partial write.
    ///
    /// # Errors
    /// Returns an error if serialization or any file operation fails
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let raw = toml::to_string_pretty(self)?;
        let write_err = |source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        };

        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, raw).map_err(write_err)?;
        std::fs::rename(&tmp, path).map_err(write_err)
    }

    /// Field-level validation plus the rank table rules
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|e| first_violation("", &e))?;
        self.rank_table()?;
        Ok(())
    }

    /// Build the rank table described by `[rank]`
    pub fn rank_table(&self) -> Result<RankTable, ConfigError> {
        let ranks = self
            .rank
            .role
            .iter()
            .map(|(name, r)| Rank {
                name: name.clone(),
                weight: r.weight,
                membership: r.membership,
                messages: r.messages,
                vc: r.vc,
            })
            .collect();

        RankTable::new(
            ranks,
            RoleFilter::new(self.rank.ignored.clone()),
            RoleFilter::new(self.rank.required.clone()),
        )
        .map_err(ConfigError::from)
    }
}

impl From<DomainError> for ConfigError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidConfig { path, reason } => ConfigError::Invalid { path, reason },
            other => ConfigError::Invalid {
                path: "root".to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// Turn validator output into a single `path: reason` error
fn first_violation(prefix: &str, errors: &ValidationErrors) -> ConfigError {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                let reason = list
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "invalid value".to_string());
                return ConfigError::Invalid { path, reason };
            }
            ValidationErrorsKind::Struct(inner) => return first_violation(&path, inner),
            ValidationErrorsKind::List(items) => {
                if let Some((idx, inner)) = items.iter().next() {
                    return first_violation(&format!("{path}[{idx}]"), inner);
                }
            }
        }
    }
    ConfigError::Invalid {
        path: prefix.to_string(),
        reason: "invalid value".to_string(),
    }
}
