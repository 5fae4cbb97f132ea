//! Core domain logic for Lumi.
//! Habits, tasks with reminders, journal entries, notes and the on-device
//! model live here; UI shells reach them through `lumi_ffi`.

pub mod assets;
pub mod chat;
pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod parse;
pub mod prompts;
pub mod repo;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, CoreConfig, ModelConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError, LoggingStatus};
pub use model::habit::{Habit, HabitId};
pub use model::memory::{Memory, MemoryId};
pub use model::reflection::{Reflection, ReflectionId};
pub use model::task::{Task, TaskDraft, TaskId, TaskPatch, TaskStatus};
pub use notify::{NotificationError, NotificationOp, NotificationScheduler, PlanningScheduler};
pub use repo::{RepoError, RepoResult};
pub use service::habit_store::{HabitStore, HabitStoreError};
pub use service::memory_service::{MemoryService, MemoryServiceError};
pub use service::reflection_service::{ReflectionService, ReflectionServiceError};
pub use service::task_history::{HistoryChart, HistoryRange};
pub use service::task_service::{TaskService, TaskServiceError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
