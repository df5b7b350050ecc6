//! State owned by the session worker.
//!
//! Everything here runs on the single worker task, one command at a time.
//! Timers never call in directly; they post `TimerFired` and the worker
//! hands the generation to [`SessionCore::timer_fired`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;

use super::{BreakKind, BreakState, Command, SchedulerState, SessionStatus};
use crate::error::{CoreError, InvalidOperation, Result, ValidationError};
use crate::events::Notifier;
use crate::stats::{AnalyticsAggregator, AnalyticsSnapshot};
use crate::storage::{PersistenceGateway, Settings};
use crate::task::{Priority, SortCriterion, Task, TaskFilter, TaskId, TaskRegistry};
use crate::timer::{Countdown, TimerKind, TimerSlot};

#[derive(Debug, Clone, Copy)]
enum WorkClock {
    Running(Countdown),
    Paused { remaining: u64 },
}

#[derive(Debug, Clone, Copy)]
struct ActiveWork {
    task: TaskId,
    clock: WorkClock,
}

#[derive(Debug, Clone, Copy)]
struct ActiveBreak {
    kind: BreakKind,
    countdown: Countdown,
}

pub(super) struct SessionCore {
    registry: TaskRegistry,
    aggregator: AnalyticsAggregator,
    settings: Settings,
    gateway: Arc<dyn PersistenceGateway>,
    notifier: Arc<Notifier>,
    timer: TimerSlot,
    commands: mpsc::WeakUnboundedSender<Command>,
    active: Option<ActiveWork>,
    on_break: Option<ActiveBreak>,
    completions_since_long_break: u32,
    /// Registry revision at load when the stored task list could not be
    /// read. Saving is skipped until the list changes.
    held_tasks: Option<u64>,
    /// Stored settings could not be used; keep the file until replaced.
    held_settings: bool,
}

impl SessionCore {
    /// Load tasks, settings and analytics, degrading to defaults on failure.
    ///
    /// A document that failed to load is not written back until it is
    /// changed, so unreadable files are left for the user to recover.
    pub(super) fn load(
        gateway: Arc<dyn PersistenceGateway>,
        notifier: Arc<Notifier>,
        commands: mpsc::WeakUnboundedSender<Command>,
    ) -> Self {
        let (tasks, tasks_failed) = match gateway.load_tasks() {
            Ok(tasks) => (tasks, false),
            Err(e) => {
                tracing::warn!(error = %e, "tasks unavailable, starting with an empty list");
                (Vec::new(), true)
            }
        };
        let (settings, held_settings) = match gateway.load_settings() {
            Ok(settings) => match settings.validate() {
                Ok(()) => (settings, false),
                Err(e) => {
                    tracing::warn!(error = %e, "stored settings are invalid, using defaults");
                    (Settings::default(), true)
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "settings unavailable, using defaults");
                (Settings::default(), true)
            }
        };
        let aggregator = AnalyticsAggregator::load(gateway.clone(), notifier.clone());
        let registry = TaskRegistry::from_tasks(tasks);
        let held_tasks = tasks_failed.then(|| registry.revision());
        let active = registry.paused().map(|(task, remaining)| ActiveWork {
            task,
            clock: WorkClock::Paused { remaining },
        });
        tracing::debug!(tasks = registry.len(), paused = active.is_some(), "session state loaded");
        notifier.task_list_changed();

        Self {
            registry,
            aggregator,
            settings,
            gateway,
            notifier,
            timer: TimerSlot::new(),
            commands,
            active,
            on_break: None,
            completions_since_long_break: 0,
            held_tasks,
            held_settings,
        }
    }

    // ── Registry ─────────────────────────────────────────────────────

    pub(super) fn add_task(&mut self, name: String, priority: Priority) -> Task {
        let task = self.registry.add(name, priority);
        tracing::debug!(task = %task.name, id = %task.id, "task added");
        self.notifier.task_list_changed();
        task
    }

    pub(super) fn all_tasks(&self) -> Vec<Task> {
        self.registry.all()
    }

    pub(super) fn filtered_tasks(&self, filter: TaskFilter) -> Vec<Task> {
        self.registry.filtered(filter)
    }

    pub(super) fn sort_tasks(&mut self, criterion: SortCriterion) {
        self.registry.sort(criterion);
        self.notifier.task_list_changed();
    }

    pub(super) fn task(&self, id: TaskId) -> Option<Task> {
        self.registry.get(id).cloned()
    }

    pub(super) fn find_task_by_name(&self, name: &str) -> Option<Task> {
        self.registry.find_by_name(name).cloned()
    }

    pub(super) fn task_by_index(&self, index: usize) -> Option<Task> {
        self.registry.by_index(index).cloned()
    }

    pub(super) fn update_task(&mut self, id: TaskId, name: String, priority: Priority) -> Result<Task> {
        let task = self.registry.update(id, name, priority)?;
        self.notifier.task_status_changed(&task);
        Ok(task)
    }

    pub(super) fn delete_task(&mut self, id: TaskId) -> Result<Task> {
        let task = self.registry.delete(id, self.active_id())?;
        tracing::debug!(task = %task.name, "task deleted");
        self.notifier.task_list_changed();
        Ok(task)
    }

    // ── Work sessions ────────────────────────────────────────────────

    pub(super) fn start_task(&mut self, id: TaskId, duration: Option<u64>) -> Result<Task> {
        let duration = duration.unwrap_or(self.settings.work_interval);
        let task = self.registry.require(id)?;
        if task.completed {
            return Err(InvalidOperation::TaskCompleted {
                name: task.name.clone(),
            }
            .into());
        }
        if let Some(active) = self.active_id().filter(|active| *active != id) {
            return Err(InvalidOperation::AnotherTaskActive {
                active: self.task_name(active),
            }
            .into());
        }

        self.end_break();
        let task = self.registry.require_mut(id)?;
        task.in_progress = true;
        task.completed = false;
        task.planned_duration = duration;
        task.paused_remaining = None;
        let task = task.clone();

        self.run_work(id, duration);
        tracing::debug!(task = %task.name, duration, "work session started");
        self.notifier.task_status_changed(&task);
        Ok(task)
    }

    /// Stop the countdown and keep the remainder for [`Self::resume_task`].
    pub(super) fn pause_task(&mut self, id: TaskId) -> Result<Task> {
        let name = self.registry.require(id)?.name.clone();
        let remaining = match self.active {
            Some(ActiveWork {
                task,
                clock: WorkClock::Running(countdown),
            }) if task == id => countdown.remaining_clamped(),
            _ => return Err(InvalidOperation::NotRunning { name }.into()),
        };

        self.timer.cancel_if(TimerKind::Work(id));
        self.active = Some(ActiveWork {
            task: id,
            clock: WorkClock::Paused { remaining },
        });
        let task = self.registry.require_mut(id)?;
        task.in_progress = false;
        task.paused_remaining = Some(remaining);
        let task = task.clone();

        tracing::debug!(task = %task.name, remaining, "work session paused");
        self.notifier.task_status_changed(&task);
        Ok(task)
    }

    pub(super) fn resume_task(&mut self, id: TaskId) -> Result<Task> {
        let name = self.registry.require(id)?.name.clone();
        let remaining = match self.active {
            Some(ActiveWork {
                task,
                clock: WorkClock::Paused { remaining },
            }) if task == id => remaining,
            _ => return Err(InvalidOperation::NotPaused { name }.into()),
        };

        self.end_break();
        let task = self.registry.require_mut(id)?;
        task.in_progress = true;
        task.paused_remaining = None;
        let task = task.clone();

        self.run_work(id, remaining);
        tracing::debug!(task = %task.name, remaining, "work session resumed");
        self.notifier.task_status_changed(&task);
        Ok(task)
    }

    pub(super) fn complete_task(&mut self, id: TaskId) -> Result<Task> {
        let task = self.registry.require_mut(id)?;
        if task.completed {
            return Err(InvalidOperation::AlreadyCompleted {
                name: task.name.clone(),
            }
            .into());
        }
        task.completed = true;
        task.in_progress = false;
        task.paused_remaining = None;
        task.completion_time = Some(Utc::now());
        let task = task.clone();

        if self.active_id() == Some(id) {
            self.active = None;
            self.timer.cancel_if(TimerKind::Work(id));
        }
        tracing::debug!(task = %task.name, planned = task.planned_duration, "task completed");
        self.notifier.task_status_changed(&task);
        self.aggregator.record_pomodoro(&task, task.planned_duration);

        self.completions_since_long_break = self.completions_since_long_break.saturating_add(1);
        // A break would cancel another task's running timer, so it only
        // follows when no work remains active.
        if self.active.is_none() {
            let kind = self.next_break_kind();
            let duration = self.settings.break_interval(kind);
            self.begin_break(kind, duration);
        }
        Ok(task)
    }

    pub(super) fn reset_task(&mut self, id: TaskId) -> Result<Task> {
        let task = self.registry.require_mut(id)?;
        task.in_progress = false;
        task.completed = false;
        task.completion_time = None;
        task.paused_remaining = None;
        let task = task.clone();

        if self.active_id() == Some(id) {
            self.active = None;
            self.timer.cancel_if(TimerKind::Work(id));
        }
        tracing::debug!(task = %task.name, "task reset");
        self.notifier.task_status_changed(&task);
        Ok(task)
    }

    // ── Breaks ───────────────────────────────────────────────────────

    /// Start a break on request. A running task is paused first, since only
    /// one timer may be pending.
    pub(super) fn start_break(&mut self, kind: BreakKind, duration: Option<u64>) -> BreakState {
        if let Some(ActiveWork {
            task,
            clock: WorkClock::Running(_),
        }) = self.active
        {
            if let Err(e) = self.pause_task(task) {
                tracing::warn!(error = %e, "could not pause running task before break");
            }
        }
        let duration = duration.unwrap_or_else(|| self.settings.break_interval(kind));
        if kind == BreakKind::Long {
            self.completions_since_long_break = 0;
        }
        self.begin_break(kind, duration);
        self.break_state()
    }

    /// End the current break, if any. Idempotent.
    pub(super) fn end_break(&mut self) {
        if self.on_break.take().is_some() {
            self.timer.cancel_if(TimerKind::Break);
            tracing::debug!("break ended");
            self.notifier.break_ended();
        }
    }

    fn next_break_kind(&mut self) -> BreakKind {
        let threshold = self.settings.sessions_until_long_break;
        if threshold > 0 && self.completions_since_long_break >= threshold {
            self.completions_since_long_break = 0;
            BreakKind::Long
        } else {
            BreakKind::Short
        }
    }

    fn begin_break(&mut self, kind: BreakKind, duration: u64) {
        self.end_break();
        self.on_break = Some(ActiveBreak {
            kind,
            countdown: Countdown::start(duration),
        });
        self.arm(TimerKind::Break, duration);
        tracing::debug!(?kind, duration, "break started");
        self.notifier.break_started(kind, duration);
    }

    // ── Timers ───────────────────────────────────────────────────────

    fn run_work(&mut self, id: TaskId, duration: u64) {
        self.active = Some(ActiveWork {
            task: id,
            clock: WorkClock::Running(Countdown::start(duration)),
        });
        self.arm(TimerKind::Work(id), duration);
    }

    fn arm(&mut self, kind: TimerKind, duration: u64) {
        let commands = self.commands.clone();
        self.timer.arm(kind, Duration::from_secs(duration), move |generation| {
            if let Some(tx) = commands.upgrade() {
                let _ = tx.send(Command::TimerFired { generation });
            }
        });
    }

    pub(super) fn timer_fired(&mut self, generation: u64) {
        match self.timer.accept(generation) {
            Some(TimerKind::Work(id)) => {
                if let Err(e) = self.complete_task(id) {
                    tracing::warn!(error = %e, "work timer fired but completion was refused");
                }
            }
            Some(TimerKind::Break) => self.end_break(),
            None => tracing::debug!(generation, "ignoring stale timer"),
        }
    }

    pub(super) fn cancel_timers(&mut self) {
        self.timer.cancel();
    }

    // ── Queries ──────────────────────────────────────────────────────

    fn active_id(&self) -> Option<TaskId> {
        self.active.map(|a| a.task)
    }

    fn task_name(&self, id: TaskId) -> String {
        self.registry
            .get(id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub(super) fn active_task(&self) -> Option<Task> {
        self.active_id().and_then(|id| self.task(id))
    }

    pub(super) fn state(&self) -> SchedulerState {
        match (self.on_break, self.active.map(|a| a.clock)) {
            (Some(_), _) => SchedulerState::OnBreak,
            (None, Some(WorkClock::Running(_))) => SchedulerState::WorkRunning,
            (None, Some(WorkClock::Paused { .. })) => SchedulerState::WorkPaused,
            (None, None) => SchedulerState::Idle,
        }
    }

    pub(super) fn remaining_task_time(&self) -> i64 {
        match self.active.map(|a| a.clock) {
            Some(WorkClock::Running(countdown)) => countdown.remaining_secs(),
            Some(WorkClock::Paused { remaining }) => i64::try_from(remaining).unwrap_or(i64::MAX),
            None => 0,
        }
    }

    pub(super) fn remaining_break_time(&self) -> i64 {
        self.on_break
            .map(|b| b.countdown.remaining_secs())
            .unwrap_or(0)
    }

    pub(super) fn break_state(&self) -> BreakState {
        match self.on_break {
            Some(b) => BreakState {
                on_break: true,
                kind: Some(b.kind),
                remaining_break_time: b.countdown.remaining_secs(),
                break_started_at: Some(b.countdown.started_at()),
            },
            None => BreakState::default(),
        }
    }

    pub(super) fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state(),
            active_task: self.active_task(),
            remaining_task_time: self.remaining_task_time(),
            breaks: self.break_state(),
            completions_since_long_break: self.completions_since_long_break,
        }
    }

    // ── Settings, analytics, persistence ─────────────────────────────

    pub(super) fn settings(&self) -> Settings {
        self.settings
    }

    /// Replace settings as a whole. Invalid settings are rejected untouched.
    pub(super) fn update_settings(&mut self, settings: Settings) -> Result<(), ValidationError> {
        settings.validate()?;
        self.settings = settings;
        self.held_settings = false;
        if let Err(e) = self.gateway.save_settings(&self.settings) {
            tracing::warn!(error = %e, "failed to persist settings");
        }
        Ok(())
    }

    pub(super) fn analytics(&self) -> AnalyticsSnapshot {
        self.aggregator.snapshot()
    }

    pub(super) fn total_pomodoros(&self) -> u64 {
        self.aggregator.total_pomodoros()
    }

    /// Save everything, reporting the first failure after trying all three.
    ///
    /// Documents that failed to load and have not changed since are skipped.
    pub(super) fn save(&self) -> Result<()> {
        let tasks = if self.held_tasks == Some(self.registry.revision()) {
            tracing::debug!("tasks unchanged since a failed load, not saving");
            Ok(())
        } else {
            self.gateway.save_tasks(&self.registry.all())
        };
        let settings = if self.held_settings {
            tracing::debug!("settings unchanged since a failed load, not saving");
            Ok(())
        } else {
            self.gateway.save_settings(&self.settings)
        };
        for result in [tasks, settings, self.aggregator.save()] {
            result.map_err(CoreError::from)?;
        }
        Ok(())
    }
}
