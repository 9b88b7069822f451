//! Service context - dependency container for services
//!
//! Holds the repositories, the platform client, configuration, and the shared
//! synchronization primitives (gate, snapshot cache, sync state).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use overlord_common::{BotConfig, GuildConfig};
use overlord_core::entities::RankTable;
use parking_lot::RwLock;
use overlord_core::traits::{
    EventRepository, Notice, NoticeLevel, Platform, RoleRepository, StatRepository, UserRepository,
};
use tracing::{error, info, warn};

use super::error::{ServiceError, ServiceResult};
use super::gate::Gate;
use super::snapshot::Snapshot;
use super::state::{SyncState, SyncStateMachine};

/// Service context containing all dependencies
///
/// Cloning is cheap; every clone shares the same gate, snapshot and state.
#[derive(Clone)]
pub struct ServiceContext {
    // Repositories
    user_repo: Arc<dyn UserRepository>,
    role_repo: Arc<dyn RoleRepository>,
    event_repo: Arc<dyn EventRepository>,
    stat_repo: Arc<dyn StatRepository>,

    // Platform client
    platform: Arc<dyn Platform>,

    // Configuration
    settings: Arc<RwLock<Settings>>,
    config_path: Option<PathBuf>,
    guild: GuildConfig,

    // Shared state
    gate: Gate,
    snapshot: Arc<Snapshot>,
    sync_state: Arc<SyncStateMachine>,
}

/// The live bot configuration and the rank table built from it.
/// Swapped as a whole so readers never see one without the other.
struct Settings {
    config: Arc<BotConfig>,
    rank_table: Arc<RankTable>,
}

impl ServiceContext {
    /// Create a new service context with all dependencies
    ///
    /// # Errors
    /// Returns `ServiceError::Config` if the rank table is invalid
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        role_repo: Arc<dyn RoleRepository>,
        event_repo: Arc<dyn EventRepository>,
        stat_repo: Arc<dyn StatRepository>,
        platform: Arc<dyn Platform>,
        config: BotConfig,
        config_path: Option<PathBuf>,
        guild: GuildConfig,
    ) -> ServiceResult<Self> {
        let rank_table = config.rank_table()?;

        Ok(Self {
            user_repo,
            role_repo,
            event_repo,
            stat_repo,
            platform,
            settings: Arc::new(RwLock::new(Settings {
                config: Arc::new(config),
                rank_table: Arc::new(rank_table),
            })),
            config_path,
            guild,
            gate: Gate::new(),
            snapshot: Arc::new(Snapshot::new()),
            sync_state: Arc::new(SyncStateMachine::new()),
        })
    }

    // === Repositories ===

    /// Get the user repository
    pub fn user_repo(&self) -> &dyn UserRepository {
        self.user_repo.as_ref()
    }

    /// Get the role repository
    pub fn role_repo(&self) -> &dyn RoleRepository {
        self.role_repo.as_ref()
    }

    /// Get the event repository
    pub fn event_repo(&self) -> &dyn EventRepository {
        self.event_repo.as_ref()
    }

    /// Get the stat repository
    pub fn stat_repo(&self) -> &dyn StatRepository {
        self.stat_repo.as_ref()
    }

    // === Platform ===

    /// Get the platform client
    pub fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }

    // === Configuration ===

    /// The live bot configuration
    pub fn config(&self) -> Arc<BotConfig> {
        self.settings.read().config.clone()
    }

    pub fn guild(&self) -> &GuildConfig {
        &self.guild
    }

    pub fn rank_table(&self) -> Arc<RankTable> {
        self.settings.read().rank_table.clone()
    }

    /// Where rank edits are persisted; `None` keeps them in memory only
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Make a checked configuration live. `rank_table` must be built from `config`.
    pub(crate) fn replace_config(&self, config: BotConfig, rank_table: RankTable) {
        *self.settings.write() = Settings {
            config: Arc::new(config),
            rank_table: Arc::new(rank_table),
        };
    }

    // === Shared state ===

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn sync_state(&self) -> &SyncStateMachine {
        &self.sync_state
    }

    /// Post a notice to the operators. Delivery failures are only logged.
    pub async fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => info!(message = %notice.message, "Operator notice"),
            NoticeLevel::Warning => warn!(message = %notice.message, "Operator notice"),
            NoticeLevel::Error => error!(message = %notice.message, "Operator notice"),
        }
        if let Err(e) = self.platform.notify(notice).await {
            warn!(error = %e, "Failed to deliver operator notice");
        }
    }

    /// Fail with `PrerequisiteNotMet` unless `minimum` has been reached.
    ///
    /// Every refusal is logged; the operator notice goes out once per state.
    pub async fn require_state(
        &self,
        operation: &'static str,
        minimum: SyncState,
    ) -> ServiceResult<()> {
        let state = self.sync_state.state();
        if state >= minimum {
            return Ok(());
        }

        warn!(operation, %state, "Skipping operation: awaiting synchronization");
        if self.sync_state.claim_notice() {
            self.notify(Notice::warning(format!(
                "Cannot {operation}: awaiting synchronization"
            )))
            .await;
        }
        Err(ServiceError::PrerequisiteNotMet { operation, state })
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("guild", &self.guild)
            .field("sync_state", &self.sync_state.state())
            .field("repositories", &"...")
            .field("platform", &"...")
            .finish()
    }
}

/// Builder for creating ServiceContext with custom configuration
pub struct ServiceContextBuilder {
    user_repo: Option<Arc<dyn UserRepository>>,
    role_repo: Option<Arc<dyn RoleRepository>>,
    event_repo: Option<Arc<dyn EventRepository>>,
    stat_repo: Option<Arc<dyn StatRepository>>,
    platform: Option<Arc<dyn Platform>>,
    config: Option<BotConfig>,
    config_path: Option<PathBuf>,
    guild: Option<GuildConfig>,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self {
            user_repo: None,
            role_repo: None,
            event_repo: None,
            stat_repo: None,
            platform: None,
            config: None,
            config_path: None,
            guild: None,
        }
    }

    pub fn user_repo(mut self, repo: Arc<dyn UserRepository>) -> Self {
        self.user_repo = Some(repo);
        self
    }

    pub fn role_repo(mut self, repo: Arc<dyn RoleRepository>) -> Self {
        self.role_repo = Some(repo);
        self
    }

    pub fn event_repo(mut self, repo: Arc<dyn EventRepository>) -> Self {
        self.event_repo = Some(repo);
        self
    }

    pub fn stat_repo(mut self, repo: Arc<dyn StatRepository>) -> Self {
        self.stat_repo = Some(repo);
        self
    }

    pub fn platform(mut self, platform: Arc<dyn Platform>) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn config(mut self, config: BotConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// File that rank edits are written back to
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn guild(mut self, guild: GuildConfig) -> Self {
        self.guild = Some(guild);
        self
    }

    /// Build the ServiceContext
    ///
    /// A missing bot config falls back to the defaults.
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any required dependency is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        ServiceContext::new(
            self.user_repo.ok_or_else(|| ServiceError::validation("user_repo is required"))?,
            self.role_repo.ok_or_else(|| ServiceError::validation("role_repo is required"))?,
            self.event_repo.ok_or_else(|| ServiceError::validation("event_repo is required"))?,
            self.stat_repo.ok_or_else(|| ServiceError::validation("stat_repo is required"))?,
            self.platform.ok_or_else(|| ServiceError::validation("platform is required"))?,
            self.config.unwrap_or_default(),
            self.config_path,
            self.guild.ok_or_else(|| ServiceError::validation("guild is required"))?,
        )
    }
}

impl Default for ServiceContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
