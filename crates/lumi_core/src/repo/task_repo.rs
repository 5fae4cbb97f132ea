//! Task repository contract and SQLite implementation.
//!
//! # Invariants
//! - Timestamps are stored as epoch milliseconds.
//! - `list_tasks` orders by `created_at ASC`; history orders by
//!   `completed_at DESC`.

use crate::model::task::{Task, TaskId, TaskStatus};
use crate::repo::{from_epoch_ms, ensure_table, parse_uuid, to_epoch_ms, RepoError, RepoResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

const TASK_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    description,
    due_date,
    reminder_date,
    status,
    completed_at,
    notification_id,
    legacy_reminder,
    created_at
FROM tasks";

/// Repository interface for task persistence.
pub trait TaskRepository {
    fn create_task(&self, task: &Task) -> RepoResult<TaskId>;
    fn update_task(&self, task: &Task) -> RepoResult<()>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    fn list_tasks(&self) -> RepoResult<Vec<Task>>;
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;
    /// Done tasks whose `completed_at >= cutoff`, newest first.
    fn list_completed_since(&self, cutoff: DateTime<Utc>) -> RepoResult<Vec<Task>>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table(conn, "tasks")?;
        Ok(Self { conn })
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&self, task: &Task) -> RepoResult<TaskId> {
        task.validate()?;

        self.conn.execute(
            "INSERT INTO tasks (
                uuid,
                title,
                description,
                due_date,
                reminder_date,
                status,
                completed_at,
                notification_id,
                legacy_reminder,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                task.id.to_string(),
                task.title.as_str(),
                task.description.as_deref(),
                task.due_date.map(to_epoch_ms),
                task.reminder_date.map(to_epoch_ms),
                task.status.as_str(),
                task.completed_at.map(to_epoch_ms),
                task.notification_id.as_deref(),
                task.legacy_reminder,
                to_epoch_ms(task.created_at),
            ],
        )?;

        Ok(task.id)
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;

        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                title = ?1,
                description = ?2,
                due_date = ?3,
                reminder_date = ?4,
                status = ?5,
                completed_at = ?6,
                notification_id = ?7,
                legacy_reminder = ?8,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?9;",
            params![
                task.title.as_str(),
                task.description.as_deref(),
                task.due_date.map(to_epoch_ms),
                task.reminder_date.map(to_epoch_ms),
                task.status.as_str(),
                task.completed_at.map(to_epoch_ms),
                task.notification_id.as_deref(),
                task.legacy_reminder,
                task.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound("task", task.id));
        }
        Ok(())
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }
        Ok(None)
    }

    fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL} ORDER BY created_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound("task", id));
        }
        Ok(())
    }

    fn list_completed_since(&self, cutoff: DateTime<Utc>) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE status = 'done'
               AND completed_at IS NOT NULL
               AND completed_at >= ?1
             ORDER BY completed_at DESC, uuid ASC;"
        ))?;
        let mut rows = stmt.query(params![to_epoch_ms(cutoff)])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let uuid_text: String = row.get("uuid")?;
    let status_text: String = row.get("status")?;
    let status = TaskStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid task status `{status_text}` in tasks.status"))
    })?;

    let task = Task {
        id: parse_uuid(&uuid_text, "tasks.uuid")?,
        title: row.get("title")?,
        description: row.get("description")?,
        due_date: optional_ms(row.get("due_date")?, "tasks.due_date")?,
        reminder_date: optional_ms(row.get("reminder_date")?, "tasks.reminder_date")?,
        status,
        completed_at: optional_ms(row.get("completed_at")?, "tasks.completed_at")?,
        notification_id: row.get("notification_id")?,
        legacy_reminder: row.get("legacy_reminder")?,
        created_at: from_epoch_ms(row.get("created_at")?, "tasks.created_at")?,
    };
    task.validate()?;
    Ok(task)
}

fn optional_ms(value: Option<i64>, column: &str) -> RepoResult<Option<DateTime<Utc>>> {
    value.map(|ms| from_epoch_ms(ms, column)).transpose()
}
