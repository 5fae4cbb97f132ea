//! Reflection (journal entry) model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ReflectionId = Uuid;

/// Prefix of the optional first line naming the answered prompt.
pub const PROMPT_PREFIX: &str = "prompt:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    pub id: ReflectionId,
    /// Day the entry is about, which may differ from `created_at`.
    pub date: NaiveDate,
    /// Body text, optionally led by a `prompt:` line.
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Reflection {
    pub fn new(date: NaiveDate, content: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            content: content.into(),
            created_at,
        }
    }

    /// Prompt answered by this entry, if any.
    pub fn prompt(&self) -> Option<String> {
        let (prompt, _) = split_prompt(&self.content);
        prompt
    }

    /// Body without the prompt header.
    pub fn response(&self) -> String {
        let (_, response) = split_prompt(&self.content);
        response
    }
}

/// Embeds a selected prompt ahead of the body.
pub fn compose_with_prompt(prompt: Option<&str>, body: &str) -> String {
    match prompt.map(str::trim).filter(|value| !value.is_empty()) {
        Some(prompt) => format!("{PROMPT_PREFIX} {prompt}\n\n{body}"),
        None => body.to_string(),
    }
}

/// Splits stored content into `(prompt, response)`.
///
/// Looks for the first line starting with `prompt:` (any case). Without one,
/// the whole content is the response.
pub fn split_prompt(content: &str) -> (Option<String>, String) {
    let lines: Vec<&str> = content.split('\n').collect();
    let header = lines.iter().position(|line| {
        line.get(..PROMPT_PREFIX.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(PROMPT_PREFIX))
    });

    match header {
        Some(index) => {
            let prompt = lines[index][PROMPT_PREFIX.len()..].trim().to_string();
            let response = lines[index + 1..].join("\n").trim().to_string();
            (Some(prompt), response)
        }
        None => (None, content.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::{compose_with_prompt, split_prompt};

    #[test]
    fn split_prompt_round_trips_composed_content() {
        let content = compose_with_prompt(Some("What made you laugh?"), "the cat");
        assert_eq!(content, "prompt: What made you laugh?\n\nthe cat");
        let (prompt, response) = split_prompt(&content);
        assert_eq!(prompt.as_deref(), Some("What made you laugh?"));
        assert_eq!(response, "the cat");
    }

    #[test]
    fn split_prompt_is_case_insensitive_and_falls_back() {
        let (prompt, response) = split_prompt("PROMPT: Why?\nbecause");
        assert_eq!(prompt.as_deref(), Some("Why?"));
        assert_eq!(response, "because");

        let (prompt, response) = split_prompt("just text");
        assert!(prompt.is_none());
        assert_eq!(response, "just text");
    }

    #[test]
    fn blank_prompt_is_not_embedded() {
        assert_eq!(compose_with_prompt(Some("  "), "body"), "body");
    }
}
