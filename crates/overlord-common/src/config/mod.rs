//! Configuration structs

mod app_config;
mod bot_config;

pub use app_config::{AppConfig, AppSettings, ConfigError, DatabaseConfig, Environment, GuildConfig};
pub use bot_config::{
    BotConfig, ControlSection, EventToggles, LeaveSection, RankRoleConfig, RankSection,
    StatsSection, UserSection,
};
