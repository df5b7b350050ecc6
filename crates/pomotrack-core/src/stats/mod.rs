//! Per-task time statistics.
//!
//! The aggregator is fed by task completions only. Entries are created on
//! the first completion of a task name and only ever grow afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::events::Notifier;
use crate::storage::PersistenceGateway;
use crate::task::Task;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    /// Seconds, summed over every recorded session.
    pub total_time_spent: u64,
    #[serde(default)]
    pub sessions: u64,
    #[serde(default)]
    pub last_completion_time: Option<DateTime<Utc>>,
}

impl TaskStats {
    /// `HH:MM` rendering of the total time spent.
    pub fn formatted_time_spent(&self) -> String {
        let hours = self.total_time_spent / 3600;
        let minutes = (self.total_time_spent % 3600) / 60;
        format!("{hours:02}:{minutes:02}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    #[serde(default)]
    pub task_stats: HashMap<String, TaskStats>,
    #[serde(default)]
    pub total_pomodoros: u64,
}

impl AnalyticsSnapshot {
    pub fn total_time_spent(&self) -> u64 {
        self.task_stats.values().map(|s| s.total_time_spent).sum()
    }
}

pub struct AnalyticsAggregator {
    snapshot: AnalyticsSnapshot,
    gateway: Arc<dyn PersistenceGateway>,
    notifier: Arc<Notifier>,
    /// The stored snapshot could not be read and nothing was recorded since.
    held: bool,
}

impl AnalyticsAggregator {
    /// Load the persisted snapshot and announce it to listeners.
    ///
    /// A failed load starts from an empty snapshot, which is not saved over
    /// the stored one until a pomodoro is recorded.
    pub fn load(gateway: Arc<dyn PersistenceGateway>, notifier: Arc<Notifier>) -> Self {
        let (snapshot, held) = match gateway.load_analytics() {
            Ok(snapshot) => (snapshot, false),
            Err(e) => {
                tracing::warn!(error = %e, "analytics unavailable, starting empty");
                (AnalyticsSnapshot::default(), true)
            }
        };
        let aggregator = Self {
            snapshot,
            gateway,
            notifier,
            held,
        };
        aggregator.notifier.stats_updated(&aggregator.snapshot);
        aggregator
    }

    /// Add one completed session of `duration` seconds for `task`.
    ///
    /// Listeners are notified before the snapshot is persisted. A failed save
    /// is logged; the in-memory snapshot stays authoritative.
    pub fn record_pomodoro(&mut self, task: &Task, duration: u64) {
        let stats = self.snapshot.task_stats.entry(task.name.clone()).or_default();
        stats.total_time_spent = stats.total_time_spent.saturating_add(duration);
        stats.sessions += 1;
        stats.last_completion_time = task.completion_time;
        self.snapshot.total_pomodoros += 1;
        self.held = false;

        tracing::debug!(
            task = %task.name,
            duration,
            total_pomodoros = self.snapshot.total_pomodoros,
            "recorded pomodoro"
        );

        self.notifier.stats_updated(&self.snapshot);
        if let Err(e) = self.save() {
            tracing::warn!(error = %e, "failed to persist analytics");
        }
    }

    pub fn snapshot(&self) -> AnalyticsSnapshot {
        self.snapshot.clone()
    }

    pub fn task_stats(&self) -> HashMap<String, TaskStats> {
        self.snapshot.task_stats.clone()
    }

    pub fn total_pomodoros(&self) -> u64 {
        self.snapshot.total_pomodoros
    }

    pub fn save(&self) -> Result<(), PersistenceError> {
        if self.held {
            tracing::debug!("analytics unchanged since a failed load, not saving");
            return Ok(());
        }
        self.gateway.save_analytics(&self.snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::AnalyticsListener;
    use crate::storage::MemoryStore;
    use crate::task::{Priority, TaskId};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Totals(Mutex<Vec<u64>>);

    impl AnalyticsListener for Totals {
        fn on_stats_updated(&self, snapshot: &AnalyticsSnapshot) {
            self.0.lock().unwrap().push(snapshot.total_pomodoros);
        }
    }

    fn completed(name: &str) -> Task {
        let mut task = Task::new(TaskId(0), 0, name, Priority::High);
        task.completed = true;
        task.completion_time = Some(Utc::now());
        task
    }

    #[test]
    fn formatted_time_spent() {
        let stats = TaskStats {
            total_time_spent: 3 * 3600 + 25 * 60 + 59,
            ..TaskStats::default()
        };
        assert_eq!(stats.formatted_time_spent(), "03:25");
        assert_eq!(TaskStats::default().formatted_time_spent(), "00:00");
    }

    #[test]
    fn construction_notifies_initial_state() {
        let mut seeded = AnalyticsSnapshot::default();
        seeded.total_pomodoros = 7;
        let store = MemoryStore::with_analytics(seeded);
        let notifier = Arc::new(Notifier::new());
        let totals = Arc::new(Totals::default());
        notifier.subscribe_analytics(totals.clone());

        let aggregator = AnalyticsAggregator::load(Arc::new(store), notifier);
        assert_eq!(aggregator.total_pomodoros(), 7);
        assert_eq!(*totals.0.lock().unwrap(), vec![7]);
    }

    #[test]
    fn failed_load_starts_empty() {
        let store = MemoryStore::new();
        store.fail_loads(true);
        let aggregator = AnalyticsAggregator::load(Arc::new(store), Arc::new(Notifier::new()));
        assert_eq!(aggregator.total_pomodoros(), 0);
        assert!(aggregator.task_stats().is_empty());
    }

    #[test]
    fn failed_load_is_not_saved_over_until_recorded() {
        let mut seeded = AnalyticsSnapshot::default();
        seeded.total_pomodoros = 42;
        let store = MemoryStore::with_analytics(seeded.clone());
        store.fail_loads(true);
        let mut aggregator =
            AnalyticsAggregator::load(Arc::new(store.clone()), Arc::new(Notifier::new()));

        aggregator.save().unwrap();
        assert_eq!(store.analytics(), seeded);

        aggregator.record_pomodoro(&completed("Write"), 60);
        assert_eq!(store.analytics().total_pomodoros, 1);
    }

    #[test]
    fn record_accumulates_and_persists() {
        let store = MemoryStore::new();
        let notifier = Arc::new(Notifier::new());
        let totals = Arc::new(Totals::default());
        notifier.subscribe_analytics(totals.clone());
        let mut aggregator = AnalyticsAggregator::load(Arc::new(store.clone()), notifier);

        let task = completed("Write report");
        aggregator.record_pomodoro(&task, 1500);
        aggregator.record_pomodoro(&task, 600);
        aggregator.record_pomodoro(&completed("Inbox"), 300);

        let stats = aggregator.task_stats();
        assert_eq!(stats["Write report"].total_time_spent, 2100);
        assert_eq!(stats["Write report"].sessions, 2);
        assert_eq!(stats["Write report"].last_completion_time, task.completion_time);
        assert_eq!(aggregator.total_pomodoros(), 3);
        assert_eq!(*totals.0.lock().unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(store.analytics(), aggregator.snapshot());
        assert_eq!(aggregator.snapshot().total_time_spent(), 2400);
    }

    #[test]
    fn failed_save_keeps_memory_state() {
        let store = MemoryStore::new();
        store.fail_saves(true);
        let mut aggregator =
            AnalyticsAggregator::load(Arc::new(store.clone()), Arc::new(Notifier::new()));

        aggregator.record_pomodoro(&completed("Write"), 1500);
        assert_eq!(aggregator.total_pomodoros(), 1);
        assert_eq!(store.analytics().total_pomodoros, 0);
        assert!(aggregator.save().is_err());
    }

    #[test]
    fn returned_stats_are_copies() {
        let mut aggregator =
            AnalyticsAggregator::load(Arc::new(MemoryStore::new()), Arc::new(Notifier::new()));
        aggregator.record_pomodoro(&completed("Write"), 10);
        let mut copy = aggregator.task_stats();
        copy.clear();
        assert_eq!(aggregator.task_stats().len(), 1);
    }
}
