//! Change notification.
//!
//! Observers register through [`Notifier`] and are called synchronously, in
//! registration order, by whichever component applied the mutation. A
//! listener that panics is logged and skipped; the rest still receive the
//! event.
//!
//! [`EventChannel`] adapts the listener traits into a stream of serialisable
//! [`Event`] values for consumers that would rather poll.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::session::BreakKind;
use crate::stats::AnalyticsSnapshot;
use crate::task::{Task, TaskId};

pub trait TaskChangeListener: Send + Sync {
    /// Fired after add, delete and sort.
    fn on_task_list_changed(&self);

    /// Fired after any per-task mutation.
    fn on_task_status_changed(&self, task: &Task);
}

pub trait AnalyticsListener: Send + Sync {
    fn on_stats_updated(&self, snapshot: &AnalyticsSnapshot);
}

/// Receives break transitions. Breaks have no task attached, so they get
/// their own contract.
pub trait BreakListener: Send + Sync {
    fn on_break_started(&self, kind: BreakKind, duration_secs: u64);

    fn on_break_ended(&self);
}

/// Subscription lists for every observer contract.
#[derive(Default)]
pub struct Notifier {
    task_listeners: RwLock<Vec<Arc<dyn TaskChangeListener>>>,
    analytics_listeners: RwLock<Vec<Arc<dyn AnalyticsListener>>>,
    break_listeners: RwLock<Vec<Arc<dyn BreakListener>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe_tasks(&self, listener: Arc<dyn TaskChangeListener>) {
        write_list(&self.task_listeners).push(listener);
    }

    pub fn subscribe_analytics(&self, listener: Arc<dyn AnalyticsListener>) {
        write_list(&self.analytics_listeners).push(listener);
    }

    pub fn subscribe_breaks(&self, listener: Arc<dyn BreakListener>) {
        write_list(&self.break_listeners).push(listener);
    }

    /// Register one [`EventChannel`] for every contract.
    pub fn subscribe_channel(&self, channel: Arc<EventChannel>) {
        self.subscribe_tasks(channel.clone());
        self.subscribe_analytics(channel.clone());
        self.subscribe_breaks(channel);
    }

    pub fn task_list_changed(&self) {
        dispatch(&self.task_listeners, "task_list_changed", |l| {
            l.on_task_list_changed()
        });
    }

    pub fn task_status_changed(&self, task: &Task) {
        dispatch(&self.task_listeners, "task_status_changed", |l| {
            l.on_task_status_changed(task)
        });
    }

    pub fn stats_updated(&self, snapshot: &AnalyticsSnapshot) {
        dispatch(&self.analytics_listeners, "stats_updated", |l| {
            l.on_stats_updated(snapshot)
        });
    }

    pub fn break_started(&self, kind: BreakKind, duration_secs: u64) {
        dispatch(&self.break_listeners, "break_started", |l| {
            l.on_break_started(kind, duration_secs)
        });
    }

    pub fn break_ended(&self) {
        dispatch(&self.break_listeners, "break_ended", |l| l.on_break_ended());
    }
}

fn write_list<T: ?Sized>(
    list: &RwLock<Vec<Arc<T>>>,
) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<T>>> {
    // A poisoned list only means a subscribe call panicked; the Vec is intact.
    list.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn dispatch<T: ?Sized>(list: &RwLock<Vec<Arc<T>>>, event: &'static str, call: impl Fn(&T)) {
    // Clone the list so a listener may subscribe others without deadlocking.
    let listeners: Vec<Arc<T>> = list
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();
    for (position, listener) in listeners.iter().enumerate() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| call(listener.as_ref())));
        if outcome.is_err() {
            tracing::error!(event, position, "listener panicked; continuing with the rest");
        }
    }
}

/// Every observable change, as a serialisable value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TaskListChanged {
        at: DateTime<Utc>,
    },
    TaskStatusChanged {
        task_id: TaskId,
        name: String,
        status: crate::task::TaskStatus,
        at: DateTime<Utc>,
    },
    StatsUpdated {
        total_pomodoros: u64,
        tracked_tasks: usize,
        at: DateTime<Utc>,
    },
    BreakStarted {
        kind: BreakKind,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    BreakEnded {
        at: DateTime<Utc>,
    },
}

/// Listener that forwards everything it hears as [`Event`]s over a channel.
pub struct EventChannel {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventChannel {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }

    fn send(&self, event: Event) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.tx.send(event);
    }
}

impl TaskChangeListener for EventChannel {
    fn on_task_list_changed(&self) {
        self.send(Event::TaskListChanged { at: Utc::now() });
    }

    fn on_task_status_changed(&self, task: &Task) {
        self.send(Event::TaskStatusChanged {
            task_id: task.id,
            name: task.name.clone(),
            status: task.status(),
            at: Utc::now(),
        });
    }
}

impl AnalyticsListener for EventChannel {
    fn on_stats_updated(&self, snapshot: &AnalyticsSnapshot) {
        self.send(Event::StatsUpdated {
            total_pomodoros: snapshot.total_pomodoros,
            tracked_tasks: snapshot.task_stats.len(),
            at: Utc::now(),
        });
    }
}

impl BreakListener for EventChannel {
    fn on_break_started(&self, kind: BreakKind, duration_secs: u64) {
        self.send(Event::BreakStarted {
            kind,
            duration_secs,
            at: Utc::now(),
        });
    }

    fn on_break_ended(&self) {
        self.send(Event::BreakEnded { at: Utc::now() });
    }
}
