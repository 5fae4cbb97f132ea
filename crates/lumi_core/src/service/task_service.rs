//! Task use-case service with reminder coordination.
//!
//! # Responsibility
//! - CRUD over tasks through `TaskRepository`.
//! - Derive notification schedule/cancel decisions from task lifecycle
//!   transitions and delegate them to a `NotificationScheduler`.
//! - Serve the task list, reminder list and completion history views.
//!
//! # Invariants
//! - Permission is checked before any reminder is scheduled; without it
//!   the operation fails with `PermissionDenied` and nothing is persisted.
//! - A reminder in the past at creation moves to the fallback hour of the
//!   current day in the user zone.
//! - Reminder replacement schedules the new notification, persists the
//!   row, and only then retires the old notification. A failed write
//!   cancels the new notification and keeps the old one.
//! - Cancellation is best-effort: failures are logged, never returned.
//! - Only rows flagged `legacy_reminder` fall back to cancelling every
//!   pending notification; other rows only ever retire their own id.

use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::model::task::{Task, TaskDraft, TaskId, TaskPatch, TaskStatus, TaskValidationError};
use crate::notify::{
    NotificationChannel, NotificationError, NotificationId, NotificationScheduler, TriggerRequest,
};
use crate::repo::task_repo::TaskRepository;
use crate::repo::RepoError;
use crate::service::task_history::{history_chart, HistoryChart, HistoryRange};
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Window loaded for history charts; covers the yearly view.
const HISTORY_CHART_DAYS: u32 = 366;

#[derive(Debug)]
pub enum TaskServiceError {
    Validation(TaskValidationError),
    TaskNotFound(TaskId),
    /// Notifications are not authorized; the reminder cannot be scheduled.
    PermissionDenied,
    Notification(NotificationError),
    Repo(RepoError),
}

impl Display for TaskServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::PermissionDenied => write!(
                f,
                "notification permission required for task reminders; enable notifications in device settings"
            ),
            Self::Notification(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TaskServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Notification(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::TaskNotFound(_) | Self::PermissionDenied => None,
        }
    }
}

impl From<RepoError> for TaskServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(_, id) => Self::TaskNotFound(id),
            RepoError::TaskValidation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<TaskValidationError> for TaskServiceError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<NotificationError> for TaskServiceError {
    fn from(value: NotificationError) -> Self {
        match value {
            NotificationError::PermissionDenied => Self::PermissionDenied,
            other => Self::Notification(other),
        }
    }
}

pub type TaskServiceResult<T> = Result<T, TaskServiceError>;

/// Zone and channel settings for reminders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderPolicy {
    pub zone: FixedOffset,
    pub fallback_hour: u32,
    pub channel: NotificationChannel,
}

impl ReminderPolicy {
    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            zone: config.zone(),
            fallback_hour: config.fallback_reminder_hour,
            channel: NotificationChannel {
                id: config.reminder_channel_id.clone(),
                name: config.reminder_channel_name.clone(),
            },
        }
    }

    /// `fallback_hour:00:00` on the zone-local day of `now`.
    pub fn fallback_for(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local_day = now.with_timezone(&self.zone).date_naive();
        local_day
            .and_hms_opt(self.fallback_hour.min(23), 0, 0)
            .and_then(|naive| self.zone.from_local_datetime(&naive).single())
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or(now)
    }
}

/// Notification side effects of one task write, applied after the write.
#[derive(Debug, Default)]
struct ReminderPlan {
    scheduled: Vec<NotificationId>,
    retired: Vec<NotificationId>,
    /// A legacy reminder existed without a recorded id; clear every pending one.
    retire_all_pending: bool,
}

/// Task service facade over a repository and a notification scheduler.
pub struct TaskService<R: TaskRepository, N: NotificationScheduler> {
    repo: R,
    scheduler: N,
    clock: Arc<dyn Clock>,
    policy: ReminderPolicy,
    channel_ready: bool,
}

impl<R: TaskRepository, N: NotificationScheduler> TaskService<R, N> {
    pub fn new(repo: R, scheduler: N, clock: Arc<dyn Clock>, config: &CoreConfig) -> Self {
        Self {
            repo,
            scheduler,
            clock,
            policy: ReminderPolicy::from_config(config),
            channel_ready: false,
        }
    }

    pub fn scheduler(&self) -> &N {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut N {
        &mut self.scheduler
    }

    pub fn into_scheduler(self) -> N {
        self.scheduler
    }

    pub fn policy(&self) -> &ReminderPolicy {
        &self.policy
    }

    /// Startup hook: asks for permission and prepares the reminder channel.
    ///
    /// Returns whether notifications are authorized. Never fails on denial.
    pub fn setup_notifications(&mut self) -> TaskServiceResult<bool> {
        match self.ensure_permission() {
            Ok(()) => Ok(true),
            Err(TaskServiceError::PermissionDenied) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Creates a task, scheduling its reminder when one is given.
    pub fn create_task(&mut self, draft: TaskDraft) -> TaskServiceResult<Task> {
        let now = self.clock.now();
        let mut task = Task::from_draft(draft, now);
        task.validate()?;

        let mut plan = ReminderPlan::default();
        if let Some(requested) = task.reminder_date {
            let at = if requested < now {
                let fallback = self.policy.fallback_for(now);
                info!(
                    "event=task_reminder module=task status=rescheduled reason=past_reminder fallback_hour={}",
                    self.policy.fallback_hour
                );
                fallback
            } else {
                requested
            };
            self.schedule_into(&mut task, at, &mut plan)?;
        }

        if let Err(err) = self.repo.create_task(&task) {
            self.abort(plan);
            return Err(err.into());
        }
        self.commit(plan);

        info!(
            "event=task_create module=task status=ok has_reminder={}",
            task.reminder_date.is_some()
        );
        Ok(task)
    }

    /// Applies a partial update and the reminder transitions it implies.
    ///
    /// - `reminder_date: Some(Some(at))` replaces the pending reminder.
    /// - `reminder_date: Some(None)` cancels it.
    /// - `status: Done` cancels a pending reminder and stamps `completed_at`.
    /// - `status: Todo` on a done task reschedules a still-future reminder;
    ///   without permission the reopen fails and nothing is persisted.
    pub fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> TaskServiceResult<Task> {
        let now = self.clock.now();
        let mut task = self.load(id)?;

        if let Some(title) = patch.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            task.description = description.filter(|value| !value.trim().is_empty());
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }
        task.validate()?;

        let mut plan = ReminderPlan::default();
        if let Some(reminder) = patch.reminder_date {
            self.retire_current(&mut task, &mut plan);
            task.reminder_date = None;
            if let Some(at) = reminder {
                if let Err(err) = self.schedule_into(&mut task, at, &mut plan) {
                    self.abort(plan);
                    return Err(err);
                }
            }
        }

        match patch.status {
            Some(TaskStatus::Done) if !task.is_done() => {
                self.retire_current(&mut task, &mut plan);
                task.status = TaskStatus::Done;
                task.completed_at = Some(now);
            }
            Some(TaskStatus::Todo) if task.is_done() => {
                task.status = TaskStatus::Todo;
                task.completed_at = None;
                let future_reminder = task.reminder_date.filter(|at| *at > now);
                if let (Some(at), None) = (future_reminder, task.notification_id.as_ref()) {
                    if let Err(err) = self.schedule_into(&mut task, at, &mut plan) {
                        self.abort(plan);
                        return Err(err);
                    }
                    info!("event=task_reminder module=task status=rescheduled reason=reopened");
                }
            }
            _ => {}
        }

        if let Err(err) = self.repo.update_task(&task) {
            self.abort(plan);
            return Err(err.into());
        }
        self.commit(plan);

        info!(
            "event=task_update module=task status=ok task_status={}",
            task.status.as_str()
        );
        Ok(task)
    }

    /// Marks a task `done` or `todo`.
    pub fn set_status(&mut self, id: TaskId, status: TaskStatus) -> TaskServiceResult<Task> {
        self.update_task(id, TaskPatch::status(status))
    }

    /// Replaces (or clears, with `None`) the reminder of one task as a
    /// single operation.
    pub fn replace_reminder(
        &mut self,
        id: TaskId,
        at: Option<DateTime<Utc>>,
    ) -> TaskServiceResult<Task> {
        self.update_task(id, TaskPatch::reminder(at))
    }

    /// Deletes a task and cancels its pending reminder.
    pub fn delete_task(&mut self, id: TaskId) -> TaskServiceResult<()> {
        let mut task = self.load(id)?;
        let mut plan = ReminderPlan::default();
        self.retire_current(&mut task, &mut plan);
        self.repo.delete_task(id)?;
        self.commit(plan);
        info!("event=task_delete module=task status=ok");
        Ok(())
    }

    pub fn get_task(&self, id: TaskId) -> TaskServiceResult<Option<Task>> {
        Ok(self.repo.get_task(id)?)
    }

    /// Task list for the main screen.
    ///
    /// Open tasks are always shown. Done tasks stay visible only while
    /// their due date (or reminder date) is today or later in the user
    /// zone; done tasks without either date are hidden.
    pub fn list_tasks(&self) -> TaskServiceResult<Vec<Task>> {
        let today = self.clock.today_in(self.policy.zone);
        let zone = self.policy.zone;
        let tasks = self.repo.list_tasks()?;
        Ok(tasks
            .into_iter()
            .filter(|task| {
                if !task.is_done() {
                    return true;
                }
                task.anchor_date()
                    .is_some_and(|date| date.with_timezone(&zone).date_naive() >= today)
            })
            .collect())
    }

    /// Tasks whose reminder is still ahead.
    pub fn list_reminders(&self) -> TaskServiceResult<Vec<Task>> {
        let now = self.clock.now();
        let tasks = self.repo.list_tasks()?;
        Ok(tasks
            .into_iter()
            .filter(|task| task.reminder_date.is_some_and(|at| at > now))
            .collect())
    }

    /// Tasks completed within the last `days` days, newest first.
    pub fn task_history(&self, days: u32) -> TaskServiceResult<Vec<Task>> {
        let cutoff = self.clock.now() - Duration::days(i64::from(days));
        Ok(self.repo.list_completed_since(cutoff)?)
    }

    /// Completion counts bucketed for the history chart.
    pub fn history_chart(&self, range: HistoryRange) -> TaskServiceResult<HistoryChart> {
        let tasks = self.task_history(HISTORY_CHART_DAYS)?;
        let today = self.clock.today_in(self.policy.zone);
        Ok(history_chart(&tasks, range, today, self.policy.zone))
    }

    /// Shows an immediate notification.
    pub fn notify_now(&mut self, title: &str, body: &str) -> TaskServiceResult<()> {
        self.ensure_permission()?;
        self.scheduler.display_notification(title, body)?;
        Ok(())
    }

    fn load(&self, id: TaskId) -> TaskServiceResult<Task> {
        self.repo
            .get_task(id)?
            .ok_or(TaskServiceError::TaskNotFound(id))
    }

    fn ensure_permission(&mut self) -> TaskServiceResult<()> {
        let granted = match self.scheduler.has_permission() {
            Ok(true) => true,
            Ok(false) | Err(_) => self.scheduler.request_permission().unwrap_or_else(|err| {
                warn!(
                    "event=notify_permission module=task status=error error={}",
                    err
                );
                false
            }),
        };
        if !granted {
            warn!("event=notify_permission module=task status=denied");
            return Err(TaskServiceError::PermissionDenied);
        }

        if !self.channel_ready {
            self.scheduler.create_channel(&self.policy.channel)?;
            self.channel_ready = true;
        }
        Ok(())
    }

    fn schedule_into(
        &mut self,
        task: &mut Task,
        at: DateTime<Utc>,
        plan: &mut ReminderPlan,
    ) -> TaskServiceResult<()> {
        self.ensure_permission()?;
        let request = TriggerRequest {
            title: task.title.clone(),
            body: task.description.clone().unwrap_or_default(),
            timestamp: at,
            channel_id: self.policy.channel.id.clone(),
        };
        let id = self.scheduler.create_trigger_notification(&request)?;
        plan.scheduled.push(id.clone());
        task.notification_id = Some(id);
        task.legacy_reminder = false;
        task.reminder_date = Some(at);
        Ok(())
    }

    fn retire_current(&self, task: &mut Task, plan: &mut ReminderPlan) {
        match task.notification_id.take() {
            Some(id) => plan.retired.push(id),
            None if task.legacy_reminder => plan.retire_all_pending = true,
            None => {}
        }
        task.legacy_reminder = false;
    }

    fn commit(&mut self, plan: ReminderPlan) {
        for id in &plan.retired {
            self.cancel_quietly(id);
        }
        if plan.retire_all_pending {
            match self.scheduler.trigger_notification_ids() {
                Ok(ids) => {
                    for id in ids.iter().filter(|id| !plan.scheduled.contains(id)) {
                        self.cancel_quietly(id);
                    }
                }
                Err(err) => warn!(
                    "event=notify_cancel module=task status=error scope=all error={}",
                    err
                ),
            }
        }
    }

    fn abort(&mut self, plan: ReminderPlan) {
        for id in &plan.scheduled {
            self.cancel_quietly(id);
        }
    }

    fn cancel_quietly(&mut self, id: &str) {
        if let Err(err) = self.scheduler.cancel_trigger_notification(id) {
            warn!("event=notify_cancel module=task status=error error={}", err);
        }
    }
}
