//! Scheduled jobs

use std::time::Duration;

use overlord_service::{ServiceContext, StatService};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Rebuild membership stats every `every`, starting immediately.
///
/// Each run takes the gate, so it queues behind in-flight events.
pub fn spawn_stat_rebuild(ctx: ServiceContext, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(every_secs = every.as_secs(), "Stat rebuild job started");
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = StatService::new(&ctx).rebuild_membership().await {
                error!(code = e.error_code(), error = %e, "Scheduled stat update failed");
            }
        }
    })
}

/// Interval for `rebuild_interval_hours`
pub fn rebuild_interval(hours: u64) -> Duration {
    Duration::from_secs(hours.saturating_mul(3600))
}
