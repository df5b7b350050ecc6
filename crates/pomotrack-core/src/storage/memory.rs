//! In-memory gateway with failure injection, for tests and embedding.

use std::sync::{Arc, Mutex, MutexGuard};

use super::{PersistenceGateway, Settings};
use crate::error::PersistenceError;
use crate::stats::AnalyticsSnapshot;
use crate::task::Task;

#[derive(Debug, Default)]
struct Contents {
    tasks: Vec<Task>,
    settings: Settings,
    analytics: AnalyticsSnapshot,
    fail_loads: bool,
    fail_saves: bool,
    saves: usize,
}

/// Cloning shares the underlying contents, so a test can keep one handle
/// and hand another to the session manager.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Contents>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let store = Self::new();
        store.lock().tasks = tasks;
        store
    }

    pub fn with_settings(settings: Settings) -> Self {
        let store = Self::new();
        store.lock().settings = settings;
        store
    }

    pub fn with_analytics(analytics: AnalyticsSnapshot) -> Self {
        let store = Self::new();
        store.lock().analytics = analytics;
        store
    }

    /// Make every load return [`PersistenceError::Unavailable`].
    pub fn fail_loads(&self, fail: bool) {
        self.lock().fail_loads = fail;
    }

    /// Make every save return [`PersistenceError::Unavailable`].
    pub fn fail_saves(&self, fail: bool) {
        self.lock().fail_saves = fail;
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    pub fn settings(&self) -> Settings {
        self.lock().settings
    }

    pub fn analytics(&self) -> AnalyticsSnapshot {
        self.lock().analytics.clone()
    }

    /// Number of successful saves of any kind.
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> MutexGuard<'_, Contents> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn load<T>(&self, read: impl FnOnce(&Contents) -> T) -> Result<T, PersistenceError> {
        let contents = self.lock();
        if contents.fail_loads {
            return Err(PersistenceError::Unavailable("load disabled".into()));
        }
        Ok(read(&contents))
    }

    fn save(&self, write: impl FnOnce(&mut Contents)) -> Result<(), PersistenceError> {
        let mut contents = self.lock();
        if contents.fail_saves {
            return Err(PersistenceError::Unavailable("save disabled".into()));
        }
        write(&mut contents);
        contents.saves += 1;
        Ok(())
    }
}

impl PersistenceGateway for MemoryStore {
    fn load_tasks(&self) -> Result<Vec<Task>, PersistenceError> {
        self.load(|c| c.tasks.clone())
    }

    fn save_tasks(&self, tasks: &[Task]) -> Result<(), PersistenceError> {
        self.save(|c| c.tasks = tasks.to_vec())
    }

    fn load_settings(&self) -> Result<Settings, PersistenceError> {
        self.load(|c| c.settings)
    }

    fn save_settings(&self, settings: &Settings) -> Result<(), PersistenceError> {
        self.save(|c| c.settings = *settings)
    }

    fn load_analytics(&self) -> Result<AnalyticsSnapshot, PersistenceError> {
        self.load(|c| c.analytics.clone())
    }

    fn save_analytics(&self, snapshot: &AnalyticsSnapshot) -> Result<(), PersistenceError> {
        self.save(|c| c.analytics = snapshot.clone())
    }
}
