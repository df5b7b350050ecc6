//! # Pomotrack Core Library
//!
//! Task tracking with fixed-length focus timers. One task runs at a time;
//! completing it (by timer or by hand) records its time and starts a short
//! or long break automatically.
//!
//! ## Architecture
//!
//! - **Session scheduler**: a single worker task owns all mutable state and
//!   applies commands one at a time. Timers post messages to it instead of
//!   touching state.
//! - **Task registry**: ordered task list with filter/sort/lookup
//! - **Analytics**: per-task time totals fed by completions
//! - **Events**: synchronous listener fan-out, plus a channel adapter
//! - **Storage**: an abstract gateway, with file-backed and in-memory
//!   implementations
//!
//! ## Key Components
//!
//! - [`SessionManager`]: handle to the scheduler worker
//! - [`TaskRegistry`]: task collection
//! - [`AnalyticsAggregator`]: statistics
//! - [`Notifier`]: observer registration and dispatch
//! - [`PersistenceGateway`]: load/save contract

pub mod error;
pub mod events;
pub mod session;
pub mod stats;
pub mod storage;
pub mod task;
pub mod timer;

pub use error::{CoreError, InvalidOperation, PersistenceError, ValidationError};
pub use events::{
    AnalyticsListener, BreakListener, Event, EventChannel, Notifier, TaskChangeListener,
};
pub use session::{BreakKind, BreakState, SchedulerState, SessionManager, SessionStatus};
pub use stats::{AnalyticsAggregator, AnalyticsSnapshot, TaskStats};
pub use storage::{FileStore, MemoryStore, PersistenceGateway, Settings};
pub use task::{
    Priority, SortCriterion, Task, TaskFilter, TaskId, TaskRegistry, TaskStatus,
    UnrecognizedPriority,
};
