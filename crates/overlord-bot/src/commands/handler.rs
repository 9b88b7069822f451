//! Admin command execution
//!
//! Every mutating command goes through the service layer, which takes the
//! gate. `status`, `list_ranks` and `help` only read, so the dispatcher
//! answers them without queueing.

use overlord_core::Snowflake;
use overlord_service::{
    RankOutcome, RankingService, ServiceContext, ServiceError, ServiceResult, StatService,
    SyncService,
};
use tracing::{info, instrument};

use super::parser::{AdminCommand, UserRef};

/// Runs admin commands and renders a reply
pub struct CommandHandler<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> CommandHandler<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip_all, fields(command = command.name()))]
    pub async fn execute(&self, command: AdminCommand) -> ServiceResult<String> {
        info!("Running admin command");
        match command {
            AdminCommand::Help => Ok(self.help()),
            AdminCommand::Status => Ok(SyncService::new(self.ctx).status().to_string()),
            AdminCommand::ListRanks => Ok(self.list_ranks()),
            AdminCommand::Resync => {
                let (roles, users) = SyncService::new(self.ctx).resync().await?;
                Ok(format!(
                    "Synced roles ({} new, {} changed, {} removed) and {} members",
                    roles.inserted, roles.updated, roles.removed, users.members
                ))
            }
            AdminCommand::UpdateAllRanks => {
                let report = RankingService::new(self.ctx).update_all_ranks().await?;
                Ok(format!("Done: {report}"))
            }
            AdminCommand::UpdateRank(user) => {
                let user_id = self.resolve_user(&user).await?;
                let outcome = RankingService::new(self.ctx).update_rank(user_id).await?;
                Ok(describe(&user, &outcome))
            }
            AdminCommand::RebuildStats => {
                let count = StatService::new(self.ctx).rebuild_membership().await?;
                Ok(format!("Rebuilt membership for {count} users"))
            }
            AdminCommand::AddRank(rank) => {
                let name = rank.name.clone();
                RankingService::new(self.ctx).add_rank(rank).await?;
                Ok(format!("Added rank {name}"))
            }
            AdminCommand::EditRank(rank) => {
                let name = rank.name.clone();
                RankingService::new(self.ctx).edit_rank(rank).await?;
                Ok(format!("Updated rank {name}"))
            }
            AdminCommand::RemoveRank(name) => {
                RankingService::new(self.ctx).remove_rank(&name).await?;
                Ok(format!("Removed rank {name}"))
            }
            AdminCommand::SetStat { user, kind, value } => {
                let user_id = self.resolve_user(&user).await?;
                StatService::new(self.ctx)
                    .set_stat(user_id, kind, value)
                    .await?;
                let outcome = RankingService::new(self.ctx).update_rank(user_id).await?;
                Ok(format!("{kind} set to {value}\n{}", describe(&user, &outcome)))
            }
        }
    }

    async fn resolve_user(&self, user: &UserRef) -> ServiceResult<Snowflake> {
        match user {
            UserRef::Id(id) => Ok(*id),
            UserRef::Tag {
                name,
                discriminator,
            } => self
                .ctx
                .user_repo()
                .find_by_tag(name, discriminator)
                .await?
                .map(|u| u.id)
                .ok_or_else(|| ServiceError::not_found("User", user.to_string())),
        }
    }

    fn help(&self) -> String {
        let config = self.ctx.config();
        let prefix = &config.control.prefix;
        let mut lines = vec!["Available commands:".to_string()];
        lines.extend(
            AdminCommand::USAGE
                .iter()
                .map(|(usage, about)| format!("{prefix}{usage} - {about}")),
        );
        lines.join("\n")
    }

    fn list_ranks(&self) -> String {
        let ranks = RankingService::new(self.ctx).list_ranks();
        if ranks.is_empty() {
            return "No ranks configured".to_string();
        }
        ranks
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn describe(user: &UserRef, outcome: &RankOutcome) -> String {
    match outcome {
        RankOutcome::Unchanged => format!("{user}: rank unchanged"),
        RankOutcome::Updated { removed, added } => {
            let mut parts = Vec::new();
            if !removed.is_empty() {
                parts.push(format!("removed {}", removed.join(", ")));
            }
            if let Some(added) = added {
                parts.push(format!("added {added}"));
            }
            format!("{user}: {}", parts.join("; "))
        }
        RankOutcome::Excluded => format!("{user}: excluded from ranking"),
        RankOutcome::UnknownUser => format!("{user}: not tracked"),
        RankOutcome::NotInGuild => format!("{user}: not a guild member"),
    }
}
