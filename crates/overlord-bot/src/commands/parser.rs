//! Admin command parsing
//!
//! Commands are plain messages in the control channel: `<prefix><name> [args]`.

use std::fmt;
use std::str::SplitWhitespace;

use overlord_core::entities::{Rank, StatKind};
use overlord_core::Snowflake;

/// A parsed admin command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Help,
    /// Roles, then users
    Resync,
    UpdateRank(UserRef),
    UpdateAllRanks,
    RebuildStats,
    /// Sync state and gate occupancy
    Status,
    ListRanks,
    AddRank(Rank),
    EditRank(Rank),
    RemoveRank(String),
    SetStat {
        user: UserRef,
        kind: StatKind,
        value: i64,
    },
}

impl AdminCommand {
    /// Name and usage of every command, for `help`
    pub const USAGE: [(&'static str, &'static str); 11] = [
        ("help", "List available commands"),
        ("resync", "Sync roles, then users"),
        ("update_rank <user>", "Update one user's rank"),
        ("update_all_ranks", "Update every member's rank"),
        ("rebuild_stats", "Recompute membership stats now"),
        ("status", "Show synchronization state"),
        ("list_ranks", "Show configured ranks"),
        (
            "add_rank <role> <weight> <membership> <messages> <vc>",
            "Create a rank for a role",
        ),
        (
            "edit_rank <role> <weight> <membership> <messages> <vc>",
            "Change a rank's weight and thresholds",
        ),
        ("remove_rank <role>", "Delete a rank"),
        ("set_stat <user> <stat> <value>", "Overwrite a user's stat and update their rank"),
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Resync => "resync",
            Self::UpdateRank(_) => "update_rank",
            Self::UpdateAllRanks => "update_all_ranks",
            Self::RebuildStats => "rebuild_stats",
            Self::Status => "status",
            Self::ListRanks => "list_ranks",
            Self::AddRank(_) => "add_rank",
            Self::EditRank(_) => "edit_rank",
            Self::RemoveRank(_) => "remove_rank",
            Self::SetStat { .. } => "set_stat",
        }
    }

    /// Answered without the gate, ahead of queued events
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::Help | Self::Status | Self::ListRanks)
    }
}

/// How a command names a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    /// Mention (`<@id>`, `<@!id>`) or raw id
    Id(Snowflake),
    /// `name#discriminator`
    Tag { name: String, discriminator: String },
}

impl UserRef {
    pub fn parse(raw: &str) -> Option<Self> {
        let id = raw
            .strip_prefix("<@")
            .and_then(|s| s.strip_suffix('>'))
            .map(|s| s.trim_start_matches('!'))
            .unwrap_or(raw);
        if let Ok(id) = Snowflake::parse(id) {
            return Some(Self::Id(id));
        }

        let (name, discriminator) = raw.rsplit_once('#')?;
        if name.is_empty() || discriminator.is_empty() {
            return None;
        }
        Some(Self::Tag {
            name: name.to_string(),
            discriminator: discriminator.to_string(),
        })
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "<@{id}>"),
            Self::Tag {
                name,
                discriminator,
            } => write!(f, "{name}#{discriminator}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Missing argument for {command}: {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("Invalid argument for {command}: {value}")]
    InvalidArgument { command: &'static str, value: String },
}

/// `None` when the message is not a command at all
pub fn parse(prefix: &str, content: &str) -> Option<Result<AdminCommand, CommandError>> {
    let body = content.trim().strip_prefix(prefix)?;
    let mut argv = body.split_whitespace();
    let name = argv.next()?;

    let command = match name {
        "help" => Ok(AdminCommand::Help),
        "resync" => Ok(AdminCommand::Resync),
        "update_all_ranks" => Ok(AdminCommand::UpdateAllRanks),
        "rebuild_stats" => Ok(AdminCommand::RebuildStats),
        "status" => Ok(AdminCommand::Status),
        "list_ranks" => Ok(AdminCommand::ListRanks),
        "update_rank" => user_arg(&mut argv, "update_rank").map(AdminCommand::UpdateRank),
        "add_rank" => rank_args(&mut argv, "add_rank").map(AdminCommand::AddRank),
        "edit_rank" => rank_args(&mut argv, "edit_rank").map(AdminCommand::EditRank),
        "remove_rank" => arg(&mut argv, "remove_rank", "role")
            .map(|role| AdminCommand::RemoveRank(role.to_string())),
        "set_stat" => set_stat_args(&mut argv),
        other => Err(CommandError::Unknown(other.to_string())),
    };
    Some(command)
}

fn arg<'a>(
    argv: &mut SplitWhitespace<'a>,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, CommandError> {
    argv.next().ok_or(CommandError::MissingArgument { command, argument })
}

fn invalid(command: &'static str, raw: &str) -> CommandError {
    CommandError::InvalidArgument {
        command,
        value: raw.to_string(),
    }
}

fn int_arg(
    argv: &mut SplitWhitespace<'_>,
    command: &'static str,
    argument: &'static str,
) -> Result<i64, CommandError> {
    let raw = arg(argv, command, argument)?;
    raw.parse().map_err(|_| invalid(command, raw))
}

fn user_arg(argv: &mut SplitWhitespace<'_>, command: &'static str) -> Result<UserRef, CommandError> {
    let raw = arg(argv, command, "user")?;
    UserRef::parse(raw).ok_or_else(|| invalid(command, raw))
}

/// `<role> <weight> <membership> <messages> <vc>`
fn rank_args(argv: &mut SplitWhitespace<'_>, command: &'static str) -> Result<Rank, CommandError> {
    Ok(Rank {
        name: arg(argv, command, "role")?.to_string(),
        weight: int_arg(argv, command, "weight")?,
        membership: int_arg(argv, command, "membership")?,
        messages: int_arg(argv, command, "messages")?,
        vc: int_arg(argv, command, "vc")?,
    })
}

fn set_stat_args(argv: &mut SplitWhitespace<'_>) -> Result<AdminCommand, CommandError> {
    const COMMAND: &str = "set_stat";
    let user = user_arg(argv, COMMAND)?;
    let raw = arg(argv, COMMAND, "stat")?;
    let kind = raw.parse::<StatKind>().map_err(|_| invalid(COMMAND, raw))?;
    let value = int_arg(argv, COMMAND, "value")?;
    Ok(AdminCommand::SetStat { user, kind, value })
}
