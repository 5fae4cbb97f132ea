//! Task domain model.
//!
//! # Invariants
//! - `completed_at` is set only while `status == Done`.
//! - `notification_id` refers to the single pending reminder, if any.
//! - `legacy_reminder` marks rows whose reminder predates recorded
//!   notification ids; it is cleared once that reminder is retired.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type TaskId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Done => "done",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "todo" => Some(Self::Todo),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    BlankTitle,
    CompletedAtWithoutDone,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "task title must not be blank"),
            Self::CompletedAtWithoutDone => {
                write!(f, "completed_at is only valid for done tasks")
            }
        }
    }
}

impl Error for TaskValidationError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub reminder_date: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub completed_at: Option<DateTime<Utc>>,
    /// Scheduler id of the pending reminder notification.
    pub notification_id: Option<String>,
    /// Reminder scheduled before ids were recorded; its notification is unknown.
    #[serde(default)]
    pub legacy_reminder: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Builds a `todo` task from a draft without touching reminders.
    pub fn from_draft(draft: TaskDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: draft.title.trim().to_string(),
            description: draft.description.filter(|value| !value.trim().is_empty()),
            due_date: draft.due_date,
            reminder_date: draft.reminder_date,
            status: TaskStatus::Todo,
            completed_at: None,
            notification_id: None,
            legacy_reminder: false,
            created_at,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    /// Date the task is "about": due date first, reminder second.
    pub fn anchor_date(&self) -> Option<DateTime<Utc>> {
        self.due_date.or(self.reminder_date)
    }

    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::BlankTitle);
        }
        if self.completed_at.is_some() && !self.is_done() {
            return Err(TaskValidationError::CompletedAtWithoutDone);
        }
        Ok(())
    }
}

/// Input for task creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub reminder_date: Option<DateTime<Utc>>,
}

impl TaskDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_reminder(mut self, at: DateTime<Utc>) -> Self {
        self.reminder_date = Some(at);
        self
    }
}

/// Partial task update. Outer `None` means "leave unchanged"; for nullable
/// fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub reminder_date: Option<Option<DateTime<Utc>>>,
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn reminder(at: Option<DateTime<Utc>>) -> Self {
        Self {
            reminder_date: Some(at),
            ..Self::default()
        }
    }
}
