//! Session scheduler.
//!
//! [`SessionManager`] is a cloneable handle to a single worker task that owns
//! the task registry, the active-task pointer, the break state, the settings
//! and the analytics aggregator. Every operation is a message to that
//! worker, and expiring timers post messages to it as well, so all mutations
//! are applied one at a time.
//!
//! ## States
//!
//! ```text
//!            start                 timer / complete
//!   Idle ─────────────> WorkRunning ────────────────> OnBreak ──timer / end──> Idle
//!    ^                   |      ^                         |
//!    |                 pause  resume                   start (ends break)
//!    |                   v      |                         v
//!    +──── reset ────  WorkPaused                    WorkRunning
//! ```
//!
//! Listeners are called on the worker. They must not wait on the manager.

mod worker;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use self::worker::SessionCore;
use crate::error::{CoreError, Result};
use crate::events::Notifier;
use crate::stats::AnalyticsSnapshot;
use crate::storage::{PersistenceGateway, Settings};
use crate::task::{Priority, SortCriterion, Task, TaskFilter, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakKind {
    Short,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    WorkRunning,
    /// The active task is held with its remaining time preserved.
    WorkPaused,
    OnBreak,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BreakState {
    pub on_break: bool,
    pub kind: Option<BreakKind>,
    /// Seconds; zero when not on break.
    pub remaining_break_time: i64,
    pub break_started_at: Option<DateTime<Utc>>,
}

/// Point-in-time view of the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub state: SchedulerState,
    pub active_task: Option<Task>,
    /// Seconds; zero when no task is active.
    pub remaining_task_time: i64,
    #[serde(rename = "break")]
    pub breaks: BreakState,
    pub completions_since_long_break: u32,
}

type Job = Box<dyn FnOnce(&mut SessionCore) + Send>;

enum Command {
    Run(Job),
    TimerFired { generation: u64 },
    Shutdown(oneshot::Sender<Result<()>>),
}

#[derive(Clone)]
pub struct SessionManager {
    tx: mpsc::UnboundedSender<Command>,
    notifier: Arc<Notifier>,
}

impl SessionManager {
    /// Load state through `gateway` and start the worker.
    ///
    /// Listeners already registered on `notifier` receive the initial
    /// task-list and stats notifications. Must be called inside a tokio
    /// runtime.
    pub fn spawn(gateway: Arc<dyn PersistenceGateway>, notifier: Arc<Notifier>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let core = SessionCore::load(gateway, notifier.clone(), tx.downgrade());
        tokio::spawn(run_worker(core, rx));
        Self { tx, notifier }
    }

    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    async fn call<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SessionCore) -> T + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |core| {
            let _ = reply_tx.send(f(core));
        });
        self.tx
            .send(Command::Run(job))
            .map_err(|_| CoreError::ManagerStopped)?;
        reply_rx.await.map_err(|_| CoreError::ManagerStopped)
    }

    // ── Task registry ────────────────────────────────────────────────

    pub async fn add_task(&self, name: impl Into<String>, priority: Priority) -> Result<Task> {
        let name = name.into();
        self.call(move |core| core.add_task(name, priority)).await
    }

    pub async fn all_tasks(&self) -> Result<Vec<Task>> {
        self.call(|core| core.all_tasks()).await
    }

    pub async fn filtered_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        self.call(move |core| core.filtered_tasks(filter)).await
    }

    pub async fn sort_tasks(&self, criterion: SortCriterion) -> Result<()> {
        self.call(move |core| core.sort_tasks(criterion)).await
    }

    pub async fn task(&self, id: TaskId) -> Result<Option<Task>> {
        self.call(move |core| core.task(id)).await
    }

    pub async fn find_task_by_name(&self, name: impl Into<String>) -> Result<Option<Task>> {
        let name = name.into();
        self.call(move |core| core.find_task_by_name(&name)).await
    }

    /// Task at a list position.
    pub async fn task_by_index(&self, index: usize) -> Result<Option<Task>> {
        self.call(move |core| core.task_by_index(index)).await
    }

    pub async fn update_task(
        &self,
        id: TaskId,
        name: impl Into<String>,
        priority: Priority,
    ) -> Result<Task> {
        let name = name.into();
        self.call(move |core| core.update_task(id, name, priority)).await?
    }

    /// Fails if the task is in progress or is the active task.
    pub async fn delete_task(&self, id: TaskId) -> Result<Task> {
        self.call(move |core| core.delete_task(id)).await?
    }

    // ── Work sessions ────────────────────────────────────────────────

    /// Start a work session; `None` uses the configured work interval.
    pub async fn start_task(&self, id: TaskId, duration_secs: Option<u64>) -> Result<Task> {
        self.call(move |core| core.start_task(id, duration_secs)).await?
    }

    pub async fn pause_task(&self, id: TaskId) -> Result<Task> {
        self.call(move |core| core.pause_task(id)).await?
    }

    pub async fn resume_task(&self, id: TaskId) -> Result<Task> {
        self.call(move |core| core.resume_task(id)).await?
    }

    pub async fn complete_task(&self, id: TaskId) -> Result<Task> {
        self.call(move |core| core.complete_task(id)).await?
    }

    pub async fn reset_task(&self, id: TaskId) -> Result<Task> {
        self.call(move |core| core.reset_task(id)).await?
    }

    pub async fn active_task(&self) -> Result<Option<Task>> {
        self.call(|core| core.active_task()).await
    }

    pub async fn remaining_task_time(&self) -> Result<i64> {
        self.call(|core| core.remaining_task_time()).await
    }

    // ── Breaks ───────────────────────────────────────────────────────

    /// Start a break; `None` uses the configured interval for `kind`.
    pub async fn start_break(&self, kind: BreakKind, duration_secs: Option<u64>) -> Result<BreakState> {
        self.call(move |core| core.start_break(kind, duration_secs)).await
    }

    pub async fn end_break(&self) -> Result<()> {
        self.call(|core| core.end_break()).await
    }

    pub async fn is_on_break(&self) -> Result<bool> {
        self.call(|core| core.break_state().on_break).await
    }

    pub async fn remaining_break_time(&self) -> Result<i64> {
        self.call(|core| core.remaining_break_time()).await
    }

    pub async fn break_state(&self) -> Result<BreakState> {
        self.call(|core| core.break_state()).await
    }

    pub async fn state(&self) -> Result<SchedulerState> {
        self.call(|core| core.state()).await
    }

    pub async fn status(&self) -> Result<SessionStatus> {
        self.call(|core| core.status()).await
    }

    // ── Settings and analytics ───────────────────────────────────────

    pub async fn settings(&self) -> Result<Settings> {
        self.call(|core| core.settings()).await
    }

    pub async fn update_settings(&self, settings: Settings) -> Result<()> {
        self.call(move |core| core.update_settings(settings))
            .await?
            .map_err(CoreError::from)
    }

    pub async fn task_stats(&self) -> Result<AnalyticsSnapshot> {
        self.call(|core| core.analytics()).await
    }

    pub async fn total_pomodoros(&self) -> Result<u64> {
        self.call(|core| core.total_pomodoros()).await
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Persist tasks, settings and analytics.
    pub async fn save(&self) -> Result<()> {
        self.call(|core| core.save()).await?
    }

    /// Save, cancel pending timers and stop the worker. Later calls on any
    /// clone fail with [`CoreError::ManagerStopped`].
    pub async fn shutdown(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Shutdown(reply_tx))
            .map_err(|_| CoreError::ManagerStopped)?;
        reply_rx.await.map_err(|_| CoreError::ManagerStopped)?
    }
}

async fn run_worker(mut core: SessionCore, mut rx: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Run(job) => job(&mut core),
            Command::TimerFired { generation } => core.timer_fired(generation),
            Command::Shutdown(reply) => {
                core.cancel_timers();
                let result = core.save();
                if let Err(e) = &result {
                    tracing::warn!(error = %e, "save on shutdown failed");
                }
                let _ = reply.send(result);
                break;
            }
        }
    }
    tracing::debug!("session worker stopped");
}
