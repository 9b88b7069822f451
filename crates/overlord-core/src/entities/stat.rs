//! Per-user stats

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of a per-user stat row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    /// Whole days since the latest member join
    Membership,
    NewMessageCount,
    EditMessageCount,
    DeleteMessageCount,
    /// Seconds spent in voice channels
    VcTime,
    /// Forces the rank with exactly this weight (0 = unset)
    ExactWeight,
    /// Lower bound on the resolved rank weight (0 = unset)
    MinWeight,
    /// Upper bound on the resolved rank weight (0 = unset)
    MaxWeight,
}

impl StatKind {
    pub const ALL: [StatKind; 8] = [
        StatKind::Membership,
        StatKind::NewMessageCount,
        StatKind::EditMessageCount,
        StatKind::DeleteMessageCount,
        StatKind::VcTime,
        StatKind::ExactWeight,
        StatKind::MinWeight,
        StatKind::MaxWeight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Membership => "membership",
            Self::NewMessageCount => "new_message_count",
            Self::EditMessageCount => "edit_message_count",
            Self::DeleteMessageCount => "delete_message_count",
            Self::VcTime => "vc_time",
            Self::ExactWeight => "exact_weight",
            Self::MinWeight => "min_weight",
            Self::MaxWeight => "max_weight",
        }
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown stat kind: {s}"))
    }
}

/// A change to a single stat, applied together with an event append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatDelta {
    Add(StatKind, i64),
    Set(StatKind, i64),
}

impl StatDelta {
    pub fn kind(&self) -> StatKind {
        match self {
            Self::Add(kind, _) | Self::Set(kind, _) => *kind,
        }
    }
}

/// All stats of one user. Missing rows read as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserStats {
    pub membership: i64,
    pub new_message_count: i64,
    pub edit_message_count: i64,
    pub delete_message_count: i64,
    pub vc_time: i64,
    pub exact_weight: i64,
    pub min_weight: i64,
    pub max_weight: i64,
}

impl UserStats {
    pub fn get(&self, kind: StatKind) -> i64 {
        match kind {
            StatKind::Membership => self.membership,
            StatKind::NewMessageCount => self.new_message_count,
            StatKind::EditMessageCount => self.edit_message_count,
            StatKind::DeleteMessageCount => self.delete_message_count,
            StatKind::VcTime => self.vc_time,
            StatKind::ExactWeight => self.exact_weight,
            StatKind::MinWeight => self.min_weight,
            StatKind::MaxWeight => self.max_weight,
        }
    }

    pub fn set(&mut self, kind: StatKind, value: i64) {
        let slot = match kind {
            StatKind::Membership => &mut self.membership,
            StatKind::NewMessageCount => &mut self.new_message_count,
            StatKind::EditMessageCount => &mut self.edit_message_count,
            StatKind::DeleteMessageCount => &mut self.delete_message_count,
            StatKind::VcTime => &mut self.vc_time,
            StatKind::ExactWeight => &mut self.exact_weight,
            StatKind::MinWeight => &mut self.min_weight,
            StatKind::MaxWeight => &mut self.max_weight,
        };
        *slot = value;
    }

    pub fn apply(&mut self, delta: StatDelta) {
        match delta {
            StatDelta::Add(kind, amount) => self.set(kind, self.get(kind) + amount),
            StatDelta::Set(kind, value) => self.set(kind, value),
        }
    }

    /// Net message count. Not clamped; may go negative.
    #[inline]
    pub fn messages(&self) -> i64 {
        self.new_message_count - self.delete_message_count
    }
}
