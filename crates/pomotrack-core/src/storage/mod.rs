mod config;
mod file_store;
mod memory;

pub use config::Settings;
pub use file_store::FileStore;
pub use memory::MemoryStore;

use std::path::PathBuf;

use crate::error::PersistenceError;
use crate::stats::AnalyticsSnapshot;
use crate::task::Task;

/// Load/save contract the core consumes. The encoding is the implementor's
/// business.
///
/// Loads should return an empty or default value when there is no backing
/// state yet. When they do fail, the core logs the error and continues with
/// defaults.
pub trait PersistenceGateway: Send + Sync {
    fn load_tasks(&self) -> Result<Vec<Task>, PersistenceError>;

    fn save_tasks(&self, tasks: &[Task]) -> Result<(), PersistenceError>;

    fn load_settings(&self) -> Result<Settings, PersistenceError>;

    fn save_settings(&self, settings: &Settings) -> Result<(), PersistenceError>;

    fn load_analytics(&self) -> Result<AnalyticsSnapshot, PersistenceError>;

    fn save_analytics(&self, snapshot: &AnalyticsSnapshot) -> Result<(), PersistenceError>;
}

/// Returns the data directory, creating it if needed.
///
/// `POMOTRACK_DATA_DIR` overrides the location outright. Otherwise it is
/// `~/.config/pomotrack[-dev]/`, with the `-dev` suffix selected by
/// `POMOTRACK_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, PersistenceError> {
    let dir = match std::env::var_os("POMOTRACK_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("POMOTRACK_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("pomotrack-dev")
            } else {
                base_dir.join("pomotrack")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| PersistenceError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
