//! Task extraction from model output.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static JSON_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("valid json block regex"));

/// Returns the `task` string of a JSON object in `text`, if any.
///
/// The whole text is tried first, then the span from the first `{` to the
/// last `}`. Blank task strings count as absent.
pub fn extract_task_json(text: &str) -> Option<String> {
    let text = text.trim();
    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(_) => {
            let block = JSON_BLOCK_RE.find(text)?;
            serde_json::from_str::<Value>(block.as_str()).ok()?
        }
    };

    value
        .get("task")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|task| !task.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::extract_task_json;

    #[test]
    fn reads_plain_json() {
        assert_eq!(
            extract_task_json(r#"{"task": "buy milk tomorrow"}"#).as_deref(),
            Some("buy milk tomorrow")
        );
    }

    #[test]
    fn reads_json_embedded_in_prose() {
        let text = "Sure! Here it is:\n{\n  \"task\": \"call mom at 6pm\"\n}\nAnything else?";
        assert_eq!(extract_task_json(text).as_deref(), Some("call mom at 6pm"));
    }

    #[test]
    fn ignores_missing_or_non_string_task() {
        assert_eq!(extract_task_json(r#"{"note": "x"}"#), None);
        assert_eq!(extract_task_json(r#"{"task": 3}"#), None);
        assert_eq!(extract_task_json(r#"{"task": "  "}"#), None);
        assert_eq!(extract_task_json("no json at all"), None);
        assert_eq!(extract_task_json("{broken"), None);
    }
}
