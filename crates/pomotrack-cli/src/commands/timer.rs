//! Foreground work sessions.
//!
//! `timer start` keeps the process alive for the work session and the break
//! that follows it, printing every event as one JSON line. Ctrl-C pauses the
//! session and saves before exiting; the paused remainder is stored with the
//! task and `timer resume` picks it up in a later run.

use std::sync::Arc;

use clap::Subcommand;
use pomotrack_core::{BreakKind, Event, EventChannel, Notifier, SessionManager, TaskId};
use tokio::sync::mpsc::UnboundedReceiver;

use super::{open_manager, print_json, resolve_task, CliResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run a work session on a task, then its break
    Start {
        /// Task id or name
        task: String,
        /// Session length in seconds (default: work_interval)
        #[arg(long)]
        secs: Option<u64>,
    },
    /// Continue a paused work session, then its break
    Resume {
        /// Task id or name
        task: String,
    },
    /// Run a break on its own
    Break {
        /// Take a long break
        #[arg(long)]
        long: bool,
        /// Break length in seconds (default: from settings)
        #[arg(long)]
        secs: Option<u64>,
    },
    /// Print scheduler state as JSON
    Status,
}

pub async fn run(action: TimerAction) -> CliResult {
    let notifier = Arc::new(Notifier::new());
    let manager = open_manager(notifier.clone())?;
    // Subscribed after loading, so the initial load notifications are skipped.
    let (channel, events) = EventChannel::new();
    notifier.subscribe_channel(channel);

    let result = match action {
        TimerAction::Start { task, secs } => start(&manager, events, &task, secs).await,
        TimerAction::Resume { task } => resume(&manager, events, &task).await,
        TimerAction::Break { long, secs } => {
            let kind = if long { BreakKind::Long } else { BreakKind::Short };
            take_break(&manager, events, kind, secs).await
        }
        TimerAction::Status => print_json(&manager.status().await?),
    };
    manager.shutdown().await?;
    result
}

async fn start(
    manager: &SessionManager,
    events: UnboundedReceiver<Event>,
    key: &str,
    secs: Option<u64>,
) -> CliResult {
    let task = resolve_task(manager, key).await?;
    manager.start_task(task.id, secs).await?;
    follow(manager, events, Some(task.id)).await
}

async fn resume(
    manager: &SessionManager,
    events: UnboundedReceiver<Event>,
    key: &str,
) -> CliResult {
    let task = resolve_task(manager, key).await?;
    manager.resume_task(task.id).await?;
    follow(manager, events, Some(task.id)).await
}

async fn take_break(
    manager: &SessionManager,
    events: UnboundedReceiver<Event>,
    kind: BreakKind,
    secs: Option<u64>,
) -> CliResult {
    manager.start_break(kind, secs).await?;
    follow(manager, events, None).await
}

/// Print events until a break ends or the user interrupts.
async fn follow(
    manager: &SessionManager,
    mut events: UnboundedReceiver<Event>,
    task: Option<TaskId>,
) -> CliResult {
    let mut interrupt = std::pin::pin!(tokio::signal::ctrl_c());
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { return Ok(()) };
                println!("{}", serde_json::to_string(&event)?);
                if matches!(event, Event::BreakEnded { .. }) {
                    return Ok(());
                }
            }
            signal = &mut interrupt => {
                signal?;
                interrupted(manager, task).await?;
                return Ok(());
            }
        }
    }
}

async fn interrupted(manager: &SessionManager, task: Option<TaskId>) -> CliResult {
    if let Some(id) = task {
        match manager.pause_task(id).await {
            Ok(paused) => eprintln!("paused '{}'", paused.name),
            // Already completed; only the break is left to stop.
            Err(e) => tracing::debug!(error = %e, "nothing to pause"),
        }
    }
    manager.end_break().await?;
    Ok(())
}
