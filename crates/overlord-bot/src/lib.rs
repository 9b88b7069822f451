//! # overlord-bot
//!
//! Bot runtime: connects storage, runs the startup synchronization, then
//! feeds platform events through a single dispatcher worker.
//!
//! The platform client itself lives outside this crate. It implements
//! [`overlord_core::Platform`] and pushes [`overlord_core::PlatformEvent`]s:
//!
//! ```rust,ignore
//! overlord_bot::run(platform, events).await?;
//! ```

pub mod commands;
pub mod dispatch;
pub mod jobs;
pub mod startup;

use std::sync::Arc;

use futures::{Stream, StreamExt};
use overlord_common::{
    try_init_tracing_with_config, AppConfig, AppResult, BotConfig, TracingConfig,
};
use overlord_core::{Platform, PlatformEvent};
use tracing::{info, warn};

pub use dispatch::{DispatchError, Dispatcher, DispatcherHandle};
pub use startup::{connect, Bot, RunningBot};

/// Load configuration from the environment, start the bot, and pump `events`
/// into it until the stream ends.
pub async fn run<S>(platform: Arc<dyn Platform>, events: S) -> AppResult<()>
where
    S: Stream<Item = PlatformEvent> + Send,
{
    let config = AppConfig::from_env()?;
    if let Err(e) = try_init_tracing_with_config(&TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }
    info!(env = ?config.app.env, guild_id = %config.guild.guild_id, "Configuration loaded");

    let bot_config = BotConfig::load(&config.bot_config_path)?;
    let ctx = connect(&config, bot_config, platform).await?;
    let running = Bot::new(ctx).start().await?;

    let handle = running.handle();
    let mut events = std::pin::pin!(events);
    while let Some(event) = events.next().await {
        if handle.send(event).await.is_err() {
            warn!("Dispatcher stopped, no longer accepting events");
            break;
        }
    }
    drop(handle);

    running.shutdown().await;
    Ok(())
}
