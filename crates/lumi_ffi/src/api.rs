//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Translate core errors into `{ ok: false, message }` envelopes.
//! - Hand planned notification operations back to the Dart host.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Timestamps cross the boundary as epoch milliseconds (UTC); calendar
//!   days as `YYYY-MM-DD` strings.
//! - Task calls take the host's notification state and return the
//!   operations the host must apply, even for failed calls.

use chrono::{DateTime, NaiveDate, Utc};
use log::warn;
use lumi_core::assets::{HttpDownloader, ModelAssets, ModelStatus};
use lumi_core::chat::{task_from_reply, STOP_SEQUENCES};
use lumi_core::db::open_db;
use lumi_core::model::reflection::split_prompt;
use lumi_core::parse::extract_task_json;
use lumi_core::prompts::random_prompt;
use lumi_core::repo::habit_repo::SqliteHabitRepository;
use lumi_core::repo::memory_repo::SqliteMemoryRepository;
use lumi_core::repo::reflection_repo::SqliteReflectionRepository;
use lumi_core::repo::task_repo::SqliteTaskRepository;
use lumi_core::service::habit_store::HabitStoreResult;
use lumi_core::service::memory_service::{MemoryDraft, MemoryPatch};
use lumi_core::service::task_service::TaskServiceResult;
use lumi_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    Clock, CoreConfig, Habit, HabitStore, HistoryRange, Memory, MemoryService, NotificationOp,
    PlanningScheduler, Reflection, ReflectionService, SystemClock, Task, TaskDraft, TaskPatch,
    TaskService, TaskStatus,
};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

const DB_FILE_NAME: &str = "lumi.sqlite3";
const DAY_FORMAT: &str = "%Y-%m-%d";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static CONFIG: OnceLock<CoreConfig> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// Affected entity ID (or file path for attachments).
    pub id: Option<String>,
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, id: Option<String>) -> Self {
        Self {
            ok: true,
            id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Habits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitItem {
    pub id: String,
    pub title: String,
    pub color: String,
    pub archived: bool,
    pub position: i64,
    /// Days marked complete, `YYYY-MM-DD`, ascending.
    pub completed_dates: Vec<String>,
    /// Monday..Sunday of the current week.
    pub week_progress: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitListResponse {
    pub ok: bool,
    pub items: Vec<HabitItem>,
    /// Monday..Sunday dates of the current week.
    pub week_dates: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitMonthResponse {
    pub ok: bool,
    pub label: String,
    pub dates: Vec<String>,
    pub completions: Vec<bool>,
    pub message: String,
}

/// Lists active (or archived) habits with this week's progress.
#[flutter_rust_bridge::frb(sync)]
pub fn habit_list(archived: bool) -> HabitListResponse {
    let result = with_habit_store(|store| {
        let habits = if archived {
            store.archived_habits()
        } else {
            store.habits()
        };
        let items = habits
            .iter()
            .map(|habit| to_habit_item(habit, &store.week_progress(habit)))
            .collect::<Vec<_>>();
        let week_dates = store.week_dates().iter().map(format_day).collect();
        Ok((items, week_dates))
    });
    match result {
        Ok((items, week_dates)) => HabitListResponse {
            ok: true,
            message: format!("Found {} habit(s).", items.len()),
            items,
            week_dates,
        },
        Err(err) => HabitListResponse {
            ok: false,
            items: Vec::new(),
            week_dates: Vec::new(),
            message: format!("habit_list failed: {err}"),
        },
    }
}

/// Creates a habit; a missing color picks a random palette color.
#[flutter_rust_bridge::frb(sync)]
pub fn habit_add(title: String, color: Option<String>) -> ActionResponse {
    match with_habit_store(|store| store.add_habit(&title, color.as_deref())) {
        Ok(habit) => ActionResponse::success("Habit created.", Some(habit.id.to_string())),
        Err(err) => ActionResponse::failure(format!("habit_add failed: {err}")),
    }
}

/// Flips completion for `date` (`YYYY-MM-DD`), or today when absent.
///
/// Message is `completed` or `cleared`.
#[flutter_rust_bridge::frb(sync)]
pub fn habit_toggle(id: String, date: Option<String>) -> ActionResponse {
    let result = parse_id(&id).and_then(|habit_id| {
        let date = date.as_deref().map(parse_day).transpose()?;
        with_habit_store(|store| match date {
            Some(date) => store.toggle_completion(habit_id, date),
            None => store.toggle_today(habit_id),
        })
    });
    match result {
        Ok(true) => ActionResponse::success("completed", Some(id)),
        Ok(false) => ActionResponse::success("cleared", Some(id)),
        Err(err) => ActionResponse::failure(format!("habit_toggle failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn habit_update_color(id: String, color: String) -> ActionResponse {
    habit_action("habit_update_color", "Color updated.", id, |store, habit_id| {
        store.update_color(habit_id, &color)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn habit_rename(id: String, title: String) -> ActionResponse {
    habit_action("habit_rename", "Habit renamed.", id, |store, habit_id| {
        store.rename(habit_id, &title)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn habit_archive(id: String) -> ActionResponse {
    habit_action("habit_archive", "Habit archived.", id, |store, habit_id| {
        store.archive(habit_id)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn habit_unarchive(id: String) -> ActionResponse {
    habit_action("habit_unarchive", "Habit restored.", id, |store, habit_id| {
        store.unarchive(habit_id)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn habit_delete(id: String) -> ActionResponse {
    habit_action("habit_delete", "Habit deleted.", id, |store, habit_id| {
        store.delete_habit(habit_id)
    })
}

/// Persists a new order; `ids` must list every active habit once.
#[flutter_rust_bridge::frb(sync)]
pub fn habit_reorder(ids: Vec<String>) -> ActionResponse {
    let result = ids
        .iter()
        .map(|id| parse_id(id))
        .collect::<Result<Vec<_>, _>>()
        .and_then(|ordered| with_habit_store(|store| store.reorder(&ordered)));
    match result {
        Ok(()) => ActionResponse::success("Habits reordered.", None),
        Err(err) => ActionResponse::failure(format!("habit_reorder failed: {err}")),
    }
}

/// Completion grid for one habit and month (`month` is 1-based).
#[flutter_rust_bridge::frb(sync)]
pub fn habit_month(id: String, year: i32, month: u32) -> HabitMonthResponse {
    let result = parse_id(&id).and_then(|habit_id| {
        with_habit_store(|store| {
            let habit = store
                .find(habit_id)
                .cloned()
                .ok_or(lumi_core::HabitStoreError::HabitNotFound(habit_id))?;
            store.month_data(&habit, year, month)
        })
    });
    match result {
        Ok(data) => HabitMonthResponse {
            ok: true,
            label: data.month_label,
            dates: data.dates.iter().map(format_day).collect(),
            completions: data.completions,
            message: String::new(),
        },
        Err(err) => HabitMonthResponse {
            ok: false,
            label: String::new(),
            dates: Vec::new(),
            completions: Vec::new(),
            message: format!("habit_month failed: {err}"),
        },
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Host notification state passed with every task call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationContext {
    pub permission_granted: bool,
    /// Trigger notification ids currently pending on the device.
    pub pending_ids: Vec<String>,
}

/// Notification action the host must apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOpItem {
    CreateChannel {
        id: String,
        name: String,
    },
    Schedule {
        id: String,
        title: String,
        body: String,
        timestamp_ms: i64,
        channel_id: String,
    },
    Cancel {
        id: String,
    },
    Display {
        title: String,
        body: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub due_ms: Option<i64>,
    pub reminder_ms: Option<i64>,
    /// `todo` or `done`.
    pub status: String,
    pub completed_ms: Option<i64>,
    pub notification_id: Option<String>,
    pub created_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResponse {
    pub ok: bool,
    pub task: Option<TaskItem>,
    pub ops: Vec<NotificationOpItem>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListResponse {
    pub ok: bool,
    pub items: Vec<TaskItem>,
    pub message: String,
}

/// Partial update; `clear_*` flags null a field and win over values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdateInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub clear_description: bool,
    pub due_ms: Option<i64>,
    pub clear_due: bool,
    pub reminder_ms: Option<i64>,
    pub clear_reminder: bool,
    /// `todo` or `done`.
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryBucketItem {
    pub label: String,
    pub start: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryChartResponse {
    pub ok: bool,
    pub buckets: Vec<HistoryBucketItem>,
    pub total: u32,
    pub average_per_period: f64,
    pub message: String,
}

/// Requests permission and prepares the reminder channel at startup.
///
/// `ok` reports whether notifications are authorized.
#[flutter_rust_bridge::frb(sync)]
pub fn notifications_setup(ctx: NotificationContext) -> TaskResponse {
    let (result, ops) = with_task_service(&ctx, |service| service.setup_notifications());
    match result {
        Ok(granted) => TaskResponse {
            ok: granted,
            task: None,
            ops,
            message: if granted {
                "Notifications ready.".to_string()
            } else {
                "Notification permission not granted.".to_string()
            },
        },
        Err(err) => task_failure("notifications_setup", err, ops),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn task_create(
    title: String,
    description: Option<String>,
    due_ms: Option<i64>,
    reminder_ms: Option<i64>,
    ctx: NotificationContext,
) -> TaskResponse {
    let draft = match (optional_ms(due_ms), optional_ms(reminder_ms)) {
        (Ok(due_date), Ok(reminder_date)) => TaskDraft {
            title,
            description,
            due_date,
            reminder_date,
        },
        (Err(err), _) | (_, Err(err)) => {
            return task_failure("task_create", err, Vec::new());
        }
    };
    let (result, ops) = with_task_service(&ctx, |service| service.create_task(draft));
    task_response("task_create", "Task created.", result, ops)
}

#[flutter_rust_bridge::frb(sync)]
pub fn task_update(id: String, input: TaskUpdateInput, ctx: NotificationContext) -> TaskResponse {
    let prepared = parse_id(&id).and_then(|task_id| Ok((task_id, to_task_patch(input)?)));
    let (task_id, patch) = match prepared {
        Ok(prepared) => prepared,
        Err(err) => return task_failure("task_update", err, Vec::new()),
    };
    let (result, ops) = with_task_service(&ctx, |service| service.update_task(task_id, patch));
    task_response("task_update", "Task updated.", result, ops)
}

/// Marks a task `done` or `todo`.
#[flutter_rust_bridge::frb(sync)]
pub fn task_set_status(id: String, status: String, ctx: NotificationContext) -> TaskResponse {
    let prepared = parse_id(&id).and_then(|task_id| Ok((task_id, parse_status(&status)?)));
    let (task_id, status) = match prepared {
        Ok(prepared) => prepared,
        Err(err) => return task_failure("task_set_status", err, Vec::new()),
    };
    let (result, ops) = with_task_service(&ctx, |service| service.set_status(task_id, status));
    task_response("task_set_status", "Task updated.", result, ops)
}

#[flutter_rust_bridge::frb(sync)]
pub fn task_delete(id: String, ctx: NotificationContext) -> TaskResponse {
    let task_id = match parse_id(&id) {
        Ok(task_id) => task_id,
        Err(err) => return task_failure("task_delete", err, Vec::new()),
    };
    let (result, ops) = with_task_service(&ctx, |service| service.delete_task(task_id));
    match result {
        Ok(()) => TaskResponse {
            ok: true,
            task: None,
            ops,
            message: "Task deleted.".to_string(),
        },
        Err(err) => task_failure("task_delete", err, ops),
    }
}

/// Main task list: open tasks plus done tasks dated today or later.
#[flutter_rust_bridge::frb(sync)]
pub fn task_list() -> TaskListResponse {
    task_list_with("task_list", |service| service.list_tasks())
}

/// Tasks with a reminder still ahead.
#[flutter_rust_bridge::frb(sync)]
pub fn task_reminders() -> TaskListResponse {
    task_list_with("task_reminders", |service| service.list_reminders())
}

/// Completed tasks of the last `days` days (config default when absent).
#[flutter_rust_bridge::frb(sync)]
pub fn task_history(days: Option<u32>) -> TaskListResponse {
    let days = days.unwrap_or(resolve_config().task_history_days);
    task_list_with("task_history", |service| service.task_history(days))
}

/// Chart buckets for `weekly`, `monthly` or `yearly`.
#[flutter_rust_bridge::frb(sync)]
pub fn task_history_chart(range: String) -> HistoryChartResponse {
    let failure = |message: String| HistoryChartResponse {
        ok: false,
        buckets: Vec::new(),
        total: 0,
        average_per_period: 0.0,
        message,
    };
    let Some(range) = HistoryRange::parse(&range) else {
        return failure(format!("task_history_chart failed: unknown range `{range}`"));
    };
    let (result, _) = with_task_service(&NotificationContext::default(), |service| {
        service.history_chart(range)
    });
    match result {
        Ok(chart) => HistoryChartResponse {
            ok: true,
            buckets: chart
                .buckets
                .into_iter()
                .map(|bucket| HistoryBucketItem {
                    label: bucket.label,
                    start: format_day(&bucket.start),
                    count: bucket.count,
                })
                .collect(),
            total: chart.total,
            average_per_period: chart.average_per_period,
            message: String::new(),
        },
        Err(err) => failure(format!("task_history_chart failed: {err}")),
    }
}

// ---------------------------------------------------------------------------
// Reflections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectionItem {
    pub id: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    pub content: String,
    pub prompt: Option<String>,
    pub response: String,
    pub created_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectionResponse {
    pub ok: bool,
    pub reflection: Option<ReflectionItem>,
    /// Whether the date came from a `2 apr:` style prefix.
    pub date_from_text: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectionListResponse {
    pub ok: bool,
    pub items: Vec<ReflectionItem>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectionParts {
    pub prompt: Option<String>,
    pub response: String,
}

/// Adds a journal entry from raw input, honoring a `2 apr:` date prefix.
#[flutter_rust_bridge::frb(sync)]
pub fn reflection_add(text: String, prompt: Option<String>) -> ReflectionResponse {
    let result = with_reflection_service(|service| {
        service
            .add_reflection(&text, prompt.as_deref())
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(added) => ReflectionResponse {
            ok: true,
            reflection: Some(to_reflection_item(&added.reflection)),
            date_from_text: added.outcome == lumi_core::parse::ParseOutcome::DateFromText,
            message: "Reflection saved.".to_string(),
        },
        Err(err) => reflection_failure("reflection_add", err),
    }
}

/// Updates date (`YYYY-MM-DD`) and/or content.
#[flutter_rust_bridge::frb(sync)]
pub fn reflection_update(
    id: String,
    date: Option<String>,
    content: Option<String>,
) -> ReflectionResponse {
    let result = parse_id(&id).and_then(|reflection_id| {
        let date = date.as_deref().map(parse_day).transpose()?;
        with_reflection_service(|service| {
            service
                .update(reflection_id, date, content.as_deref())
                .map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(reflection) => ReflectionResponse {
            ok: true,
            reflection: Some(to_reflection_item(&reflection)),
            date_from_text: false,
            message: "Reflection updated.".to_string(),
        },
        Err(err) => reflection_failure("reflection_update", err),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn reflection_delete(id: String) -> ActionResponse {
    let result = parse_id(&id).and_then(|reflection_id| {
        with_reflection_service(|service| {
            service.delete(reflection_id).map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(()) => ActionResponse::success("Reflection deleted.", Some(id)),
        Err(err) => ActionResponse::failure(format!("reflection_delete failed: {err}")),
    }
}

/// Entries, newest date first.
#[flutter_rust_bridge::frb(sync)]
pub fn reflection_list() -> ReflectionListResponse {
    match with_reflection_service(|service| service.list().map_err(|err| err.to_string())) {
        Ok(reflections) => ReflectionListResponse {
            ok: true,
            message: format!("Found {} reflection(s).", reflections.len()),
            items: reflections.iter().map(to_reflection_item).collect(),
        },
        Err(err) => ReflectionListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("reflection_list failed: {err}"),
        },
    }
}

/// A random entry; `ok` with no reflection when the journal is empty.
#[flutter_rust_bridge::frb(sync)]
pub fn reflection_random() -> ReflectionResponse {
    let result = with_reflection_service(|service| {
        service.random_reflection().map_err(|err| err.to_string())
    });
    match result {
        Ok(reflection) => ReflectionResponse {
            ok: true,
            message: if reflection.is_some() {
                String::new()
            } else {
                "No reflections yet.".to_string()
            },
            reflection: reflection.as_ref().map(to_reflection_item),
            date_from_text: false,
        },
        Err(err) => reflection_failure("reflection_random", err),
    }
}

/// Random journal prompt, different from `current` when given.
#[flutter_rust_bridge::frb(sync)]
pub fn reflection_prompt(current: Option<String>) -> String {
    random_prompt(current.as_deref()).to_string()
}

#[flutter_rust_bridge::frb(sync)]
pub fn reflection_split(content: String) -> ReflectionParts {
    let (prompt, response) = split_prompt(&content);
    ReflectionParts { prompt, response }
}

// ---------------------------------------------------------------------------
// Memories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryItem {
    pub id: String,
    pub title: String,
    pub content: String,
    pub date_ms: i64,
    pub tags: Vec<String>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryListResponse {
    pub ok: bool,
    pub items: Vec<MemoryItem>,
    pub message: String,
}

#[flutter_rust_bridge::frb(sync)]
pub fn memory_add(
    title: String,
    content: String,
    tags: Vec<String>,
    images: Vec<String>,
) -> ActionResponse {
    let draft = MemoryDraft {
        title,
        content,
        tags,
        images,
    };
    memory_action("memory_add", "Memory saved.", |service| {
        service.add_memory(draft).map(|memory| memory.id)
    })
}

/// Adds a memory from `tag: content` quick-entry text.
#[flutter_rust_bridge::frb(sync)]
pub fn memory_add_quick(
    text: String,
    default_tag: Option<String>,
    images: Vec<String>,
) -> ActionResponse {
    memory_action("memory_add_quick", "Memory saved.", |service| {
        service
            .add_from_input(&text, default_tag.as_deref(), images)
            .map(|memory| memory.id)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn memory_update(
    id: String,
    title: Option<String>,
    content: Option<String>,
    tags: Option<Vec<String>>,
    images: Option<Vec<String>>,
) -> ActionResponse {
    let memory_id = match parse_id(&id) {
        Ok(memory_id) => memory_id,
        Err(err) => return ActionResponse::failure(format!("memory_update failed: {err}")),
    };
    let patch = MemoryPatch {
        title,
        content,
        tags,
        images,
    };
    memory_action("memory_update", "Memory updated.", |service| {
        service.update_memory(memory_id, patch).map(|memory| memory.id)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn memory_delete(id: String) -> ActionResponse {
    let memory_id = match parse_id(&id) {
        Ok(memory_id) => memory_id,
        Err(err) => return ActionResponse::failure(format!("memory_delete failed: {err}")),
    };
    memory_action("memory_delete", "Memory deleted.", |service| {
        service.delete_memory(memory_id).map(|()| memory_id)
    })
}

/// Memories newest first, optionally narrowed by tag and search text.
#[flutter_rust_bridge::frb(sync)]
pub fn memory_list(tag: Option<String>, query: Option<String>) -> MemoryListResponse {
    let result = with_memory_service(|service| {
        let memories = match tag.as_deref() {
            Some(tag) => service.filter_by_tag(tag),
            None => service.list_memories(),
        }
        .map_err(|err| err.to_string())?;
        Ok(memories
            .into_iter()
            .filter(|memory| query.as_deref().map_or(true, |q| memory.matches(q)))
            .collect::<Vec<_>>())
    });
    match result {
        Ok(memories) => MemoryListResponse {
            ok: true,
            message: format!("Found {} memory(ies).", memories.len()),
            items: memories.iter().map(to_memory_item).collect(),
        },
        Err(err) => MemoryListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("memory_list failed: {err}"),
        },
    }
}

/// Every tag in use, sorted. Empty on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn memory_tags() -> Vec<String> {
    with_memory_service(|service| service.unique_tags().map_err(|err| err.to_string()))
        .unwrap_or_else(|err| {
            warn!("event=ffi_call module=ffi op=memory_tags status=error error={}", err);
            Vec::new()
        })
}

/// Copies a picked image into `images_dir`; `id` carries the new path.
#[flutter_rust_bridge::frb(sync)]
pub fn memory_attach_image(source_path: String, images_dir: String) -> ActionResponse {
    let result = lumi_core::service::memory_service::attach_image(
        Path::new(source_path.trim()),
        Path::new(images_dir.trim()),
        SystemClock.now(),
    );
    match result {
        Ok(dest) => ActionResponse::success(
            "Image attached.",
            Some(dest.to_string_lossy().into_owned()),
        ),
        Err(err) => ActionResponse::failure(format!("memory_attach_image failed: {err}")),
    }
}

// ---------------------------------------------------------------------------
// Chat and model assets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTaskResponse {
    /// A task was created from the reply.
    pub created: bool,
    pub task: Option<TaskItem>,
    /// Confirmation line to append to the transcript.
    pub confirmation: Option<String>,
    pub ops: Vec<NotificationOpItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStatusResponse {
    pub ok: bool,
    pub has_model: bool,
    pub model_path: Option<String>,
    pub message: String,
}

/// Stop sequences to pass to the on-device completion call.
#[flutter_rust_bridge::frb(sync)]
pub fn chat_stop_sequences() -> Vec<String> {
    STOP_SEQUENCES.iter().map(|s| s.to_string()).collect()
}

/// `task` field of a JSON model reply, if any.
#[flutter_rust_bridge::frb(sync)]
pub fn chat_extract_task(text: String) -> Option<String> {
    extract_task_json(&text)
}

/// Creates the task named by a final model reply.
///
/// Never fails: replies without a task and failed creations return
/// `created = false`.
#[flutter_rust_bridge::frb(sync)]
pub fn chat_handle_reply(reply: String, ctx: NotificationContext) -> ChatTaskResponse {
    let zone = resolve_config().zone();
    let (result, ops) = with_task_service(&ctx, |service| Ok(task_from_reply(&reply, service, zone)));
    match result {
        Ok(Some((task, confirmation))) => ChatTaskResponse {
            created: true,
            task: Some(to_task_item(&task)),
            confirmation: Some(confirmation),
            ops,
        },
        Ok(None) | Err(_) => ChatTaskResponse {
            created: false,
            task: None,
            confirmation: None,
            ops,
        },
    }
}

/// Model bundle state under `documents_dir`.
#[flutter_rust_bridge::frb(sync)]
pub fn model_status(documents_dir: String) -> ModelStatusResponse {
    let status = model_assets(&documents_dir).status();
    to_model_status_response(status, String::new())
}

/// Downloads the model bundle; blocking, runs off the UI thread.
pub fn model_download(documents_dir: String) -> ModelStatusResponse {
    let assets = model_assets(&documents_dir);
    let downloader = HttpDownloader::new();
    match assets.download_model_bundle(&downloader, &resolve_config().model, &mut |_| {}) {
        Ok(status) => to_model_status_response(status, "Model downloaded.".to_string()),
        Err(err) => ModelStatusResponse {
            ok: false,
            has_model: assets.status().has_model,
            model_path: None,
            message: format!("model_download failed: {err}"),
        },
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn model_delete(documents_dir: String) -> ModelStatusResponse {
    let assets = model_assets(&documents_dir);
    match assets.delete_local_model() {
        Ok(()) => to_model_status_response(assets.status(), "Model deleted.".to_string()),
        Err(err) => ModelStatusResponse {
            ok: false,
            has_model: assets.status().has_model,
            model_path: None,
            message: format!("model_delete failed: {err}"),
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("LUMI_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

/// Config from `LUMI_CONFIG_PATH`, else defaults.
fn resolve_config() -> &'static CoreConfig {
    CONFIG.get_or_init(|| match std::env::var("LUMI_CONFIG_PATH") {
        Ok(raw) if !raw.trim().is_empty() => CoreConfig::load(raw.trim()).unwrap_or_else(|err| {
            warn!("event=config_load module=ffi status=fallback error={}", err);
            CoreConfig::default()
        }),
        _ => CoreConfig::default(),
    })
}

fn clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

fn with_conn<T>(f: impl FnOnce(&Connection) -> Result<T, String>) -> Result<T, String> {
    let conn = open_db(resolve_db_path()).map_err(|err| format!("DB open failed: {err}"))?;
    f(&conn)
}

fn with_habit_store<T>(
    f: impl FnOnce(&mut HabitStore<SqliteHabitRepository<'_>>) -> HabitStoreResult<T>,
) -> Result<T, String> {
    with_conn(|conn| {
        let repo = SqliteHabitRepository::try_new(conn)
            .map_err(|err| format!("habit repo init failed: {err}"))?;
        let mut store = HabitStore::new(repo, clock(), resolve_config());
        store.refresh().map_err(|err| err.to_string())?;
        store.refresh_archived().map_err(|err| err.to_string())?;
        f(&mut store).map_err(|err| err.to_string())
    })
}

fn habit_action(
    op: &str,
    success: &str,
    id: String,
    f: impl FnOnce(&mut HabitStore<SqliteHabitRepository<'_>>, Uuid) -> HabitStoreResult<()>,
) -> ActionResponse {
    let result = parse_id(&id).and_then(|habit_id| with_habit_store(|store| f(store, habit_id)));
    match result {
        Ok(()) => ActionResponse::success(success, Some(id)),
        Err(err) => ActionResponse::failure(format!("{op} failed: {err}")),
    }
}

/// Runs `f` against a task service wired to a planning scheduler and
/// returns the planned operations alongside the result.
fn with_task_service<T>(
    ctx: &NotificationContext,
    f: impl FnOnce(
        &mut TaskService<SqliteTaskRepository<'_>, PlanningScheduler>,
    ) -> TaskServiceResult<T>,
) -> (Result<T, String>, Vec<NotificationOpItem>) {
    let scheduler = PlanningScheduler::new(ctx.permission_granted)
        .with_pending_ids(ctx.pending_ids.iter().cloned());
    let outcome = with_conn(|conn| {
        let repo = SqliteTaskRepository::try_new(conn)
            .map_err(|err| format!("task repo init failed: {err}"))?;
        let mut service = TaskService::new(repo, scheduler, clock(), resolve_config());
        let result = f(&mut service).map_err(|err| err.to_string());
        Ok((result, service.into_scheduler().take_ops()))
    });
    match outcome {
        Ok((result, ops)) => (result, ops.into_iter().map(to_op_item).collect()),
        Err(err) => (Err(err), Vec::new()),
    }
}

fn task_list_with(
    op: &str,
    f: impl FnOnce(
        &mut TaskService<SqliteTaskRepository<'_>, PlanningScheduler>,
    ) -> TaskServiceResult<Vec<Task>>,
) -> TaskListResponse {
    let (result, _) = with_task_service(&NotificationContext::default(), f);
    match result {
        Ok(tasks) => TaskListResponse {
            ok: true,
            message: format!("Found {} task(s).", tasks.len()),
            items: tasks.iter().map(to_task_item).collect(),
        },
        Err(err) => TaskListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("{op} failed: {err}"),
        },
    }
}

fn task_response(
    op: &str,
    success: &str,
    result: Result<Task, String>,
    ops: Vec<NotificationOpItem>,
) -> TaskResponse {
    match result {
        Ok(task) => TaskResponse {
            ok: true,
            task: Some(to_task_item(&task)),
            ops,
            message: success.to_string(),
        },
        Err(err) => task_failure(op, err, ops),
    }
}

fn task_failure(op: &str, err: String, ops: Vec<NotificationOpItem>) -> TaskResponse {
    TaskResponse {
        ok: false,
        task: None,
        ops,
        message: format!("{op} failed: {err}"),
    }
}

fn with_reflection_service<T>(
    f: impl FnOnce(&ReflectionService<SqliteReflectionRepository<'_>>) -> Result<T, String>,
) -> Result<T, String> {
    with_conn(|conn| {
        let repo = SqliteReflectionRepository::try_new(conn)
            .map_err(|err| format!("reflection repo init failed: {err}"))?;
        f(&ReflectionService::new(repo, clock(), resolve_config()))
    })
}

fn reflection_failure(op: &str, err: String) -> ReflectionResponse {
    ReflectionResponse {
        ok: false,
        reflection: None,
        date_from_text: false,
        message: format!("{op} failed: {err}"),
    }
}

fn with_memory_service<T>(
    f: impl FnOnce(&MemoryService<SqliteMemoryRepository<'_>>) -> Result<T, String>,
) -> Result<T, String> {
    with_conn(|conn| {
        let repo = SqliteMemoryRepository::try_new(conn)
            .map_err(|err| format!("memory repo init failed: {err}"))?;
        f(&MemoryService::new(repo, clock()))
    })
}

fn memory_action(
    op: &str,
    success: &str,
    f: impl FnOnce(
        &MemoryService<SqliteMemoryRepository<'_>>,
    ) -> lumi_core::service::memory_service::MemoryServiceResult<Uuid>,
) -> ActionResponse {
    match with_memory_service(|service| f(service).map_err(|err| err.to_string())) {
        Ok(id) => ActionResponse::success(success, Some(id.to_string())),
        Err(err) => ActionResponse::failure(format!("{op} failed: {err}")),
    }
}

fn model_assets(documents_dir: &str) -> ModelAssets {
    ModelAssets::from_config(&resolve_config().model, Path::new(documents_dir.trim()))
}

fn to_model_status_response(status: ModelStatus, message: String) -> ModelStatusResponse {
    ModelStatusResponse {
        ok: true,
        has_model: status.has_model,
        model_path: status
            .model_path
            .map(|path| path.to_string_lossy().into_owned()),
        message,
    }
}

fn parse_id(value: &str) -> Result<Uuid, String> {
    Uuid::parse_str(value.trim()).map_err(|err| format!("invalid id `{value}`: {err}"))
}

fn parse_day(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), DAY_FORMAT)
        .map_err(|err| format!("invalid date `{value}`: {err}"))
}

fn format_day(day: &NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

fn parse_status(value: &str) -> Result<TaskStatus, String> {
    TaskStatus::parse(value.trim()).ok_or_else(|| format!("invalid status `{value}`"))
}

fn from_ms(ms: i64) -> Result<DateTime<Utc>, String> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| format!("timestamp out of range: {ms}"))
}

fn optional_ms(value: Option<i64>) -> Result<Option<DateTime<Utc>>, String> {
    value.map(from_ms).transpose()
}

fn nullable_ms(value: Option<i64>, clear: bool) -> Result<Option<Option<DateTime<Utc>>>, String> {
    if clear {
        return Ok(Some(None));
    }
    Ok(optional_ms(value)?.map(Some))
}

fn to_task_patch(input: TaskUpdateInput) -> Result<TaskPatch, String> {
    Ok(TaskPatch {
        title: input.title,
        description: if input.clear_description {
            Some(None)
        } else {
            input.description.map(Some)
        },
        due_date: nullable_ms(input.due_ms, input.clear_due)?,
        reminder_date: nullable_ms(input.reminder_ms, input.clear_reminder)?,
        status: input.status.as_deref().map(parse_status).transpose()?,
    })
}

fn to_op_item(op: NotificationOp) -> NotificationOpItem {
    match op {
        NotificationOp::CreateChannel { id, name } => NotificationOpItem::CreateChannel { id, name },
        NotificationOp::Schedule {
            id,
            title,
            body,
            timestamp,
            channel_id,
        } => NotificationOpItem::Schedule {
            id,
            title,
            body,
            timestamp_ms: timestamp.timestamp_millis(),
            channel_id,
        },
        NotificationOp::Cancel { id } => NotificationOpItem::Cancel { id },
        NotificationOp::Display { title, body } => NotificationOpItem::Display { title, body },
    }
}

fn to_habit_item(habit: &Habit, week: &[bool; 7]) -> HabitItem {
    HabitItem {
        id: habit.id.to_string(),
        title: habit.title.clone(),
        color: habit.color.clone(),
        archived: habit.archived,
        position: habit.position,
        completed_dates: habit
            .completions
            .iter()
            .filter(|(_, done)| **done)
            .map(|(day, _)| format_day(day))
            .collect(),
        week_progress: week.to_vec(),
    }
}

fn to_task_item(task: &Task) -> TaskItem {
    TaskItem {
        id: task.id.to_string(),
        title: task.title.clone(),
        description: task.description.clone(),
        due_ms: task.due_date.map(|at| at.timestamp_millis()),
        reminder_ms: task.reminder_date.map(|at| at.timestamp_millis()),
        status: task.status.as_str().to_string(),
        completed_ms: task.completed_at.map(|at| at.timestamp_millis()),
        notification_id: task.notification_id.clone(),
        created_ms: task.created_at.timestamp_millis(),
    }
}

fn to_reflection_item(reflection: &Reflection) -> ReflectionItem {
    let (prompt, response) = split_prompt(&reflection.content);
    ReflectionItem {
        id: reflection.id.to_string(),
        date: format_day(&reflection.date),
        content: reflection.content.clone(),
        prompt,
        response,
        created_ms: reflection.created_at.timestamp_millis(),
    }
}

fn to_memory_item(memory: &Memory) -> MemoryItem {
    MemoryItem {
        id: memory.id.to_string(),
        title: memory.title.clone(),
        content: memory.content.clone(),
        date_ms: memory.date.timestamp_millis(),
        tags: memory.tags.clone(),
        images: memory.images.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn granted() -> NotificationContext {
        NotificationContext {
            permission_granted: true,
            pending_ids: Vec::new(),
        }
    }

    fn future_ms(hours: i64) -> i64 {
        (Utc::now() + chrono::Duration::hours(hours)).timestamp_millis()
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        assert!(!init_logging("verbose".to_string(), "tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn habit_add_then_toggle_today_reports_completion() {
        let created = habit_add("Drink water".to_string(), None);
        assert!(created.ok, "{}", created.message);
        let id = created.id.unwrap();

        let toggled = habit_toggle(id.clone(), None);
        assert!(toggled.ok, "{}", toggled.message);
        assert_eq!(toggled.message, "completed");

        let listed = habit_list(false);
        let item = listed.items.iter().find(|item| item.id == id).unwrap();
        assert_eq!(item.week_progress.len(), 7);
        assert_eq!(listed.week_dates.len(), 7);
        assert!(item.week_progress.iter().any(|done| *done));
    }

    #[test]
    fn habit_add_rejects_bad_color() {
        let created = habit_add("Read".to_string(), Some("blue".to_string()));
        assert!(!created.ok);
    }

    #[test]
    fn habit_month_rejects_invalid_month() {
        let id = habit_add("Walk".to_string(), None).id.unwrap();
        assert!(habit_month(id.clone(), 2024, 2).ok);
        assert_eq!(habit_month(id.clone(), 2024, 2).dates.len(), 29);
        assert!(!habit_month(id, 2024, 13).ok);
    }

    #[test]
    fn task_create_with_reminder_returns_schedule_op() {
        let response = task_create(
            "Call the bank".to_string(),
            None,
            None,
            Some(future_ms(2)),
            granted(),
        );
        assert!(response.ok, "{}", response.message);
        let task = response.task.unwrap();
        let scheduled_id = response
            .ops
            .iter()
            .find_map(|op| match op {
                NotificationOpItem::Schedule { id, .. } => Some(id.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(task.notification_id.as_deref(), Some(scheduled_id.as_str()));

        let done = task_set_status(task.id, "done".to_string(), granted());
        assert!(done.ok, "{}", done.message);
        assert!(done
            .ops
            .contains(&NotificationOpItem::Cancel { id: scheduled_id }));
        assert!(done.task.unwrap().completed_ms.is_some());
    }

    #[test]
    fn task_create_without_permission_fails_and_persists_nothing() {
        let title = format!("denied-{}", Uuid::new_v4());
        let response = task_create(
            title.clone(),
            None,
            None,
            Some(future_ms(1)),
            NotificationContext::default(),
        );
        assert!(!response.ok);
        assert!(response.message.contains("permission"));
        assert!(!task_list().items.iter().any(|task| task.title == title));
    }

    #[test]
    fn task_history_chart_rejects_unknown_range() {
        assert!(task_history_chart("weekly".to_string()).ok);
        assert_eq!(task_history_chart("weekly".to_string()).buckets.len(), 7);
        assert!(!task_history_chart("hourly".to_string()).ok);
    }

    #[test]
    fn reflection_add_uses_date_prefix() {
        let response = reflection_add("2 apr: had a good day".to_string(), None);
        assert!(response.ok, "{}", response.message);
        assert!(response.date_from_text);
        let item = response.reflection.unwrap();
        assert!(item.date.ends_with("-04-02"));
        assert_eq!(item.content, "had a good day");
    }

    #[test]
    fn memory_quick_add_extracts_tag() {
        let created = memory_add_quick("Groceries: eggs and bread".to_string(), None, Vec::new());
        assert!(created.ok, "{}", created.message);
        assert!(memory_tags().contains(&"groceries".to_string()));
        let listed = memory_list(Some("groceries".to_string()), Some("bread".to_string()));
        assert!(listed.items.iter().any(|item| Some(&item.id) == created.id.as_ref()));
    }

    #[test]
    fn chat_handle_reply_creates_task_from_json() {
        let response = chat_handle_reply(r#"{"task": "water plants"}"#.to_string(), granted());
        assert!(response.created);
        assert_eq!(
            response.confirmation.as_deref(),
            Some("✅ Added task: \"water plants\" • no reminder")
        );

        let ignored = chat_handle_reply("just chatting".to_string(), granted());
        assert!(!ignored.created);
    }

    #[test]
    fn model_status_reports_missing_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let status = model_status(dir.path().to_string_lossy().into_owned());
        assert!(status.ok);
        assert!(!status.has_model);
        assert!(status.model_path.is_none());
    }
}
