//! Local model chat session.
//!
//! # Responsibility
//! - Hold the visible transcript and stream model tokens into it.
//! - Detect `{"task": ...}` replies and create the task they name.
//!
//! # Invariants
//! - Each successful `send` appends exactly one user message and one
//!   assistant message. A failed generation drops its assistant message.
//! - The assistant message ends with the model's final text when provided.
//! - Task creation failures from chat replies never fail the send.

use crate::assets::ModelAssets;
use crate::config::{CoreConfig, ModelConfig};
use crate::model::task::{Task, TaskDraft};
use crate::notify::NotificationScheduler;
use crate::parse::task_json::extract_task_json;
use crate::repo::task_repo::TaskRepository;
use crate::service::task_service::TaskService;
use chrono::FixedOffset;
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Sequences that end a completion.
pub const STOP_SEQUENCES: [&str; 6] = [
    "</s>",
    "<|end|>",
    "<|end_of_text|>",
    "User:",
    "Assistant:",
    "\nUser:",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub n_predict: u32,
    pub temperature: f32,
    pub stop: Vec<String>,
}

impl CompletionRequest {
    /// One user turn with the configured sampling settings.
    pub fn single_turn(text: &str, config: &ModelConfig) -> Self {
        Self {
            messages: vec![ChatMessage::user(text)],
            n_predict: config.n_predict,
            temperature: config.temperature,
            stop: STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug)]
pub enum ChatError {
    EmptyMessage,
    /// GGUF weights are not downloaded.
    ModelNotFound,
    Initialization(String),
    Generation(String),
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "message must not be blank"),
            Self::ModelNotFound => write!(f, "model not found; download it in settings first"),
            Self::Initialization(message) => {
                write!(f, "could not initialize local model: {message}")
            }
            Self::Generation(message) => write!(f, "generation failed: {message}"),
        }
    }
}

impl Error for ChatError {}

pub type ChatResult<T> = Result<T, ChatError>;

/// Loaded on-device model.
pub trait LocalModel {
    /// Runs one completion, calling `on_token` per generated piece.
    /// Returns the final text, which may be empty.
    fn complete(
        &mut self,
        request: &CompletionRequest,
        on_token: &mut dyn FnMut(&str),
    ) -> ChatResult<String>;
}

/// Creates model contexts from GGUF weights.
pub trait ModelLoader {
    fn initialize(&self, model_path: &Path, context_size: u32) -> ChatResult<Box<dyn LocalModel>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub text: String,
    /// Task created from a JSON reply, if any.
    pub created_task: Option<Task>,
}

pub struct ChatSession {
    model: Box<dyn LocalModel>,
    messages: Vec<ChatMessage>,
    config: ModelConfig,
    zone: FixedOffset,
}

impl ChatSession {
    pub fn new(model: Box<dyn LocalModel>, config: &CoreConfig) -> Self {
        Self {
            model,
            messages: Vec::new(),
            config: config.model.clone(),
            zone: config.zone(),
        }
    }

    /// Loads the downloaded model and starts an empty session.
    pub fn open(
        loader: &dyn ModelLoader,
        assets: &ModelAssets,
        config: &CoreConfig,
    ) -> ChatResult<Self> {
        let status = assets.status();
        let model_path = match status.model_path {
            Some(path) if status.has_model => path,
            _ => return Err(ChatError::ModelNotFound),
        };
        let model = loader.initialize(&model_path, config.model.context_size)?;
        info!(
            "event=chat_open module=chat status=ok context_size={}",
            config.model.context_size
        );
        Ok(Self::new(model, config))
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Sends one user message and streams the reply into the transcript.
    pub fn send(&mut self, text: &str, on_token: &mut dyn FnMut(&str)) -> ChatResult<ChatReply> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let request = CompletionRequest::single_turn(text, &self.config);
        self.messages.push(ChatMessage::user(text));
        self.messages.push(ChatMessage::assistant(""));

        let messages = &mut self.messages;
        let result = self.model.complete(&request, &mut |token: &str| {
            if let Some(last) = messages.last_mut() {
                last.content.push_str(token);
            }
            on_token(token);
        });

        let final_text = match result {
            Ok(final_text) => final_text,
            Err(err) => {
                self.messages.pop();
                warn!("event=chat_send module=chat status=error error={}", err);
                return Err(err);
            }
        };

        let reply = match self.messages.last_mut() {
            Some(last) => {
                if !final_text.is_empty() {
                    last.content = final_text;
                }
                last.content.clone()
            }
            None => final_text,
        };
        info!("event=chat_send module=chat status=ok");
        Ok(ChatReply {
            text: reply,
            created_task: None,
        })
    }

    /// `send`, then creates a task when the reply carries one and appends
    /// a confirmation message.
    pub fn send_with_tasks<R, N>(
        &mut self,
        text: &str,
        tasks: &mut TaskService<R, N>,
        on_token: &mut dyn FnMut(&str),
    ) -> ChatResult<ChatReply>
    where
        R: TaskRepository,
        N: NotificationScheduler,
    {
        let mut reply = self.send(text, on_token)?;
        if let Some((task, confirmation)) = task_from_reply(&reply.text, tasks, self.zone) {
            self.messages.push(ChatMessage::assistant(confirmation));
            reply.created_task = Some(task);
        }
        Ok(reply)
    }
}

/// Creates the task named by a model reply.
///
/// Returns the task and its confirmation line. Replies without a task and
/// failed creations yield `None`.
pub fn task_from_reply<R, N>(
    reply: &str,
    tasks: &mut TaskService<R, N>,
    zone: FixedOffset,
) -> Option<(Task, String)>
where
    R: TaskRepository,
    N: NotificationScheduler,
{
    let title = extract_task_json(reply)?;
    match tasks.create_task(TaskDraft::titled(title)) {
        Ok(task) => {
            let confirmation = confirmation_message(&task, zone);
            info!("event=chat_task module=chat status=created");
            Some((task, confirmation))
        }
        Err(err) => {
            warn!("event=chat_task module=chat status=skip error={}", err);
            None
        }
    }
}

/// `✅ Added task: "title" • Tue, 05 Mar, 09:00 PM`, or `• no reminder`.
pub fn confirmation_message(task: &Task, zone: FixedOffset) -> String {
    let when = task
        .reminder_date
        .map(|at| at.with_timezone(&zone).format("%a, %d %b, %I:%M %p").to_string())
        .unwrap_or_else(|| "no reminder".to_string());
    format!("✅ Added task: \"{}\" • {when}", task.title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn single_turn_uses_configured_sampling() {
        let request = CompletionRequest::single_turn("hi", &ModelConfig::default());
        assert_eq!(request.messages, vec![ChatMessage::user("hi")]);
        assert_eq!(request.n_predict, 200);
        assert_eq!(request.temperature, 0.7);
        assert_eq!(request.stop.len(), 6);
        assert!(request.stop.iter().any(|s| s == "\nUser:"));
    }

    #[test]
    fn confirmation_formats_reminder_in_zone() {
        let zone = FixedOffset::east_opt(330 * 60).unwrap();
        let created = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();
        let mut task = Task::from_draft(TaskDraft::titled("Call mom"), created);
        assert_eq!(
            confirmation_message(&task, zone),
            "✅ Added task: \"Call mom\" • no reminder"
        );

        task.reminder_date = Some(Utc.with_ymd_and_hms(2024, 3, 5, 15, 30, 0).unwrap());
        assert_eq!(
            confirmation_message(&task, zone),
            "✅ Added task: \"Call mom\" • Tue, 05 Mar, 09:00 PM"
        );
    }
}
