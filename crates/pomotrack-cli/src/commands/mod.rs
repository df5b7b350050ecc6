pub mod config;
pub mod stats;
pub mod task;
pub mod timer;

use std::sync::Arc;

use pomotrack_core::{FileStore, Notifier, SessionManager, Task, TaskId};

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Start a session manager over the on-disk data directory.
pub fn open_manager(notifier: Arc<Notifier>) -> CliResult<SessionManager> {
    let store = FileStore::open()?;
    tracing::debug!(dir = %store.dir().display(), "opened data directory");
    Ok(SessionManager::spawn(Arc::new(store), notifier))
}

/// Resolve a task given by id, or by exact name when not numeric.
pub async fn resolve_task(manager: &SessionManager, key: &str) -> CliResult<Task> {
    let found = match key.parse::<TaskId>() {
        Ok(id) => manager.task(id).await?,
        Err(_) => manager.find_task_by_name(key).await?,
    };
    found.ok_or_else(|| format!("no task matches '{key}'").into())
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
