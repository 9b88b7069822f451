//! Startup sequence
//!
//! Connect storage, then, holding the gate: sync roles, sync users, and check
//! the configuration against the fresh role snapshot. Any failure here is
//! fatal. Only then do the dispatcher and the scheduled stat job start.

use std::sync::Arc;

use overlord_common::{AppConfig, AppError, AppResult, BotConfig};
use overlord_core::traits::Platform;
use overlord_db::{
    create_pool, run_migrations, DatabaseConfig, PgEventRepository, PgRoleRepository,
    PgStatRepository, PgUserRepository,
};
use overlord_service::{RankingService, ServiceContext, ServiceContextBuilder, SyncService};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::dispatch::{self, DispatcherHandle, DEFAULT_CAPACITY};
use crate::jobs;

/// Build a service context backed by PostgreSQL
pub async fn connect(
    config: &AppConfig,
    bot_config: BotConfig,
    platform: Arc<dyn Platform>,
) -> AppResult<ServiceContext> {
    info!("Connecting to PostgreSQL...");
    let pool = create_pool(&DatabaseConfig::from(&config.database))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    run_migrations(&pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!("PostgreSQL connection established");

    let context = ServiceContextBuilder::new()
        .user_repo(Arc::new(PgUserRepository::new(pool.clone())))
        .role_repo(Arc::new(PgRoleRepository::new(pool.clone())))
        .event_repo(Arc::new(PgEventRepository::new(pool.clone())))
        .stat_repo(Arc::new(PgStatRepository::new(pool)))
        .platform(platform)
        .config(bot_config)
        .config_path(config.bot_config_path.clone())
        .guild(config.guild)
        .build()?;
    Ok(context)
}

/// A bot that has not reached ready state yet
pub struct Bot {
    ctx: ServiceContext,
}

impl Bot {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Run the startup sequence and launch the workers
    pub async fn start(self) -> AppResult<RunningBot> {
        self.prepare().await.map_err(|e| {
            error!(code = e.error_code(), error = %e, "Startup failed");
            e
        })?;

        let (handle, dispatcher) = dispatch::channel(self.ctx.clone(), DEFAULT_CAPACITY);
        let worker = tokio::spawn(dispatcher.run());
        let interval = jobs::rebuild_interval(self.ctx.config().stats.rebuild_interval_hours);
        let stat_job = jobs::spawn_stat_rebuild(self.ctx.clone(), interval);

        info!("Bot ready");
        Ok(RunningBot {
            ctx: self.ctx,
            handle,
            worker,
            stat_job,
        })
    }

    async fn prepare(&self) -> AppResult<()> {
        let gate = self.ctx.gate().acquire().await;
        let sync = SyncService::new(&self.ctx);
        sync.sync_roles_locked(&gate).await?;
        sync.sync_users_locked(&gate).await?;
        RankingService::new(&self.ctx).validate_config()?;
        Ok(())
    }
}

/// Handles to the running workers
pub struct RunningBot {
    ctx: ServiceContext,
    handle: DispatcherHandle,
    worker: JoinHandle<()>,
    stat_job: JoinHandle<()>,
}

impl RunningBot {
    pub fn context(&self) -> &ServiceContext {
        &self.ctx
    }

    /// Queue for platform events
    pub fn handle(&self) -> DispatcherHandle {
        self.handle.clone()
    }

    /// Stop the stat job and drain the queue. The worker exits once every
    /// cloned handle has been dropped too.
    pub async fn shutdown(self) {
        self.stat_job.abort();
        drop(self.handle);
        if let Err(e) = self.worker.await {
            error!(error = %e, "Dispatcher task failed");
        }
        info!("Bot stopped");
    }
}
