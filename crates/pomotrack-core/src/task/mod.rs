//! Task entity and its fixed vocabularies.
//!
//! A task moves through three observable statuses:
//!
//! ```text
//!   NOT STARTED ──start──> IN PROGRESS ──complete──> COMPLETED
//!        ^                   |      ^                    |
//!        |                 pause  resume                 |
//!        |                   v      |                    |
//!        +──────reset────── (paused, still active) <─────+ reset
//! ```
//!
//! Transitions are driven by the session scheduler; this module only holds
//! the data and the label conversions.

mod registry;

pub use registry::TaskRegistry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Stable task identifier, unique within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(TaskId)
    }
}

/// Task priority. Declaration order is the sort order: High sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Returned for any priority input outside {High, Medium, Low}.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized priority: {0}")]
pub struct UnrecognizedPriority(pub String);

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn label(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    /// Numeric code used by older task files: 1 = High, 2 = Medium, 3 = Low.
    pub fn code(&self) -> i64 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, UnrecognizedPriority> {
        match code {
            1 => Ok(Priority::High),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::Low),
            other => Err(UnrecognizedPriority(other.to_string())),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for Priority {
    type Err = UnrecognizedPriority;

    /// Accepts a label in any case, or a numeric code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<i64>() {
            return Priority::from_code(code);
        }
        Priority::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnrecognizedPriority(s.to_string()))
    }
}

/// View filter over the task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskFilter {
    #[default]
    All,
    /// Not completed.
    Active,
    Completed,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Active => !task.completed,
            TaskFilter::Completed => task.completed,
        }
    }
}

impl FromStr for TaskFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(TaskFilter::All),
            "active" => Ok(TaskFilter::Active),
            "completed" => Ok(TaskFilter::Completed),
            other => Err(format!("unknown filter '{other}' (expected all, active, completed)")),
        }
    }
}

/// Sort key for [`TaskRegistry::sort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortCriterion {
    ByName,
    ByPriority,
}

impl FromStr for SortCriterion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" | "by_name" => Ok(SortCriterion::ByName),
            "priority" | "by_priority" => Ok(SortCriterion::ByPriority),
            other => Err(format!("unknown sort criterion '{other}' (expected name, priority)")),
        }
    }
}

/// Display status derived from the completion/progress flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Not Started",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// A tracked task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    /// Position in the list at creation time.
    pub index: usize,
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub in_progress: bool,
    /// Declared work duration of the last start, in seconds.
    #[serde(default)]
    pub planned_duration: u64,
    #[serde(default)]
    pub completion_time: Option<DateTime<Utc>>,
    /// Seconds left on a paused session; survives restarts so it can be
    /// resumed later.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_remaining: Option<u64>,
}

impl Task {
    pub fn new(id: TaskId, index: usize, name: impl Into<String>, priority: Priority) -> Self {
        Task {
            id,
            name: name.into(),
            index,
            priority,
            completed: false,
            in_progress: false,
            planned_duration: 0,
            completion_time: None,
            paused_remaining: None,
        }
    }

    pub fn status(&self) -> TaskStatus {
        if self.completed {
            TaskStatus::Completed
        } else if self.in_progress {
            TaskStatus::InProgress
        } else {
            TaskStatus::NotStarted
        }
    }
}
