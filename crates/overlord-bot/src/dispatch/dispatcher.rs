//! Event dispatcher
//!
//! A single worker drains the inbound queue and handles one event at a time,
//! so events reach the aggregator in arrival order. Control-channel messages
//! are routed to the admin commands instead. Read-only commands never touch
//! the gate and are answered by the handle before anything is queued, so
//! `status` can report a busy gate.

use overlord_core::events::{MessageCreatedEvent, PlatformEvent};
use overlord_core::traits::Notice;
use overlord_service::{EventAggregator, ServiceContext, ServiceError};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::commands::{self, AdminCommand, CommandError, CommandHandler};

/// Inbound queue capacity used by [`channel`] callers that have no preference
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Dispatcher has stopped")]
    Closed,
}

/// Sending side, handed to the platform client
#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    ctx: ServiceContext,
    tx: mpsc::Sender<PlatformEvent>,
}

impl DispatcherHandle {
    /// Queue an event; waits while the queue is full.
    ///
    /// Read-only admin commands are answered here instead.
    pub async fn send(&self, event: PlatformEvent) -> Result<(), DispatchError> {
        if let PlatformEvent::MessageCreated(message) = &event {
            if let Some(parsed) = read_only_command(&self.ctx, message) {
                debug!(user_id = %message.author_id, "Answering command ahead of the queue");
                run_command(&self.ctx, message, parsed).await;
                return Ok(());
            }
        }
        self.tx.send(event).await.map_err(|_| DispatchError::Closed)
    }
}

/// The single logical worker
pub struct Dispatcher {
    ctx: ServiceContext,
    rx: mpsc::Receiver<PlatformEvent>,
}

/// Create a dispatcher and its handle
pub fn channel(ctx: ServiceContext, capacity: usize) -> (DispatcherHandle, Dispatcher) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        DispatcherHandle {
            ctx: ctx.clone(),
            tx,
        },
        Dispatcher { ctx, rx },
    )
}

impl Dispatcher {
    /// Run until every handle is dropped
    pub async fn run(mut self) {
        info!("Dispatcher started");
        while let Some(event) = self.rx.recv().await {
            self.dispatch(event).await;
        }
        info!("Dispatcher stopped");
    }

    /// Handle one event. Errors abort only this event.
    pub async fn dispatch(&self, event: PlatformEvent) {
        if let PlatformEvent::MessageCreated(message) = &event {
            if is_control_message(&self.ctx, message) {
                if message.author_bot {
                    return;
                }
                let config = self.ctx.config();
                if let Some(parsed) = commands::parse(&config.control.prefix, &message.content) {
                    run_command(&self.ctx, message, parsed).await;
                }
                return;
            }
        }

        match EventAggregator::new(&self.ctx).handle(&event).await {
            Ok(outcome) => debug!(event = event.event_type(), ?outcome, "Event handled"),
            Err(e) => report(&self.ctx, event.event_type(), &e).await,
        }
    }
}

fn is_control_message(ctx: &ServiceContext, message: &MessageCreatedEvent) -> bool {
    ctx.guild().control_channel_id == Some(message.channel_id)
}

/// A control-channel command that can be answered without the gate.
/// Unparsable commands count too, since their reply is only an error.
fn read_only_command(
    ctx: &ServiceContext,
    message: &MessageCreatedEvent,
) -> Option<Result<AdminCommand, CommandError>> {
    if message.author_bot || !is_control_message(ctx, message) {
        return None;
    }
    let parsed = commands::parse(&ctx.config().control.prefix, &message.content)?;
    match &parsed {
        Ok(command) if !command.is_read_only() => None,
        _ => Some(parsed),
    }
}

async fn run_command(
    ctx: &ServiceContext,
    message: &MessageCreatedEvent,
    parsed: Result<AdminCommand, CommandError>,
) {
    match is_admin(ctx, message).await {
        Ok(true) => {}
        Ok(false) => {
            debug!(user_id = %message.author_id, "Ignoring command from non-admin");
            return;
        }
        Err(e) => {
            report(ctx, "admin check", &e).await;
            return;
        }
    }

    let command = match parsed {
        Ok(command) => command,
        Err(e) => {
            ctx.notify(Notice::info(e.to_string())).await;
            return;
        }
    };
    let name = command.name();
    match CommandHandler::new(ctx).execute(command).await {
        Ok(reply) => ctx.notify(Notice::info(reply)).await,
        Err(e) => report(ctx, name, &e).await,
    }
}

/// Holds one of the configured control roles
async fn is_admin(ctx: &ServiceContext, message: &MessageCreatedEvent) -> Result<bool, ServiceError> {
    let Some(member) = ctx.platform().fetch_member(message.author_id).await? else {
        return Ok(false);
    };
    let held = ctx.snapshot().role_names(&member.role_ids);
    Ok(ctx
        .config()
        .control
        .roles
        .iter()
        .any(|role| held.contains(role)))
}

/// Prerequisite failures were already surfaced by the service layer
async fn report(ctx: &ServiceContext, what: &str, err: &ServiceError) {
    if err.is_prerequisite() {
        debug!(what, error = %err, "Skipped");
        return;
    }
    if err.is_recoverable() {
        warn!(what, code = err.error_code(), error = %err, "Handler aborted");
    } else {
        error!(what, code = err.error_code(), error = %err, "Handler failed");
    }
    ctx.notify(Notice::error(format!("{what}: {err}"))).await;
}
