//! File-backed gateway.
//!
//! Layout inside the data directory:
//! - `tasks.json`: task list (JSON array)
//! - `analytics.json`: per-task stats and the pomodoro total
//! - `settings.toml`: timer settings
//!
//! A missing file loads as the default value. A file that exists but cannot
//! be decoded is copied to `<name>.corrupt` and reported as
//! [`PersistenceError::Corrupt`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use super::{data_dir, PersistenceGateway, Settings};
use crate::error::PersistenceError;
use crate::stats::AnalyticsSnapshot;
use crate::task::Task;

const TASKS_FILE: &str = "tasks.json";
const ANALYTICS_FILE: &str = "analytics.json";
const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Store rooted at an explicit directory, created if missing.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| PersistenceError::DataDir(format!("{}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    /// Store rooted at [`data_dir`].
    pub fn open() -> Result<Self, PersistenceError> {
        Ok(Self { dir: data_dir()? })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// `Ok(None)` when the file does not exist.
    fn read(&self, file: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path(file);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistenceError::ReadFailed { path, source }),
        }
    }

    fn read_json<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T, PersistenceError> {
        match self.read(file)? {
            None => Ok(T::default()),
            Some(content) => serde_json::from_str(&content).map_err(|e| self.corrupt(file, e)),
        }
    }

    /// Keep a copy of an undecodable file before anything can replace it.
    fn corrupt(&self, file: &str, cause: impl std::fmt::Display) -> PersistenceError {
        let path = self.path(file);
        let backup = self.path(&format!("{file}.corrupt"));
        if let Err(e) = std::fs::copy(&path, &backup) {
            tracing::warn!(error = %e, path = %backup.display(), "could not back up corrupt file");
        }
        PersistenceError::Corrupt {
            path,
            message: cause.to_string(),
        }
    }

    /// Write through a sibling temp file so a crash never leaves half a file.
    fn write(&self, file: &str, content: &str) -> Result<(), PersistenceError> {
        let path = self.path(file);
        let tmp = self.path(&format!("{file}.tmp"));
        std::fs::write(&tmp, content)
            .and_then(|_| std::fs::rename(&tmp, &path))
            .map_err(|source| PersistenceError::WriteFailed { path, source })
    }
}

impl PersistenceGateway for FileStore {
    fn load_tasks(&self) -> Result<Vec<Task>, PersistenceError> {
        self.read_json(TASKS_FILE)
    }

    fn save_tasks(&self, tasks: &[Task]) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(tasks).map_err(|e| {
            PersistenceError::EncodeFailed {
                what: "tasks",
                message: e.to_string(),
            }
        })?;
        self.write(TASKS_FILE, &json)
    }

    fn load_settings(&self) -> Result<Settings, PersistenceError> {
        match self.read(SETTINGS_FILE)? {
            None => Ok(Settings::default()),
            Some(content) => toml::from_str(&content).map_err(|e| self.corrupt(SETTINGS_FILE, e)),
        }
    }

    fn save_settings(&self, settings: &Settings) -> Result<(), PersistenceError> {
        let content = toml::to_string_pretty(settings).map_err(|e| {
            PersistenceError::EncodeFailed {
                what: "settings",
                message: e.to_string(),
            }
        })?;
        self.write(SETTINGS_FILE, &content)
    }

    fn load_analytics(&self) -> Result<AnalyticsSnapshot, PersistenceError> {
        self.read_json(ANALYTICS_FILE)
    }

    fn save_analytics(&self, snapshot: &AnalyticsSnapshot) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(snapshot).map_err(|e| {
            PersistenceError::EncodeFailed {
                what: "analytics",
                message: e.to_string(),
            }
        })?;
        self.write(ANALYTICS_FILE, &json)
    }
}
