//! Quick-entry parsing for notes written as `tag: content`.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^([a-zA-Z]+):\s*(.+)$").expect("valid tag prefix regex"));

/// Tag used when neither the input nor the caller names one.
pub const UNTAGGED: &str = "untagged";

const TITLE_WORDS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedNote {
    pub title: String,
    pub content: String,
    pub tag: String,
}

/// Splits `work: finish report` into tag `work` and the content.
///
/// Without a prefix the tag is `default_tag`, or `untagged`. The title is
/// the first three words of the content.
pub fn parse_note_input(text: &str, default_tag: Option<&str>) -> ParsedNote {
    let (tag, content) = match TAG_PREFIX_RE.captures(text) {
        Some(caps) => (caps[1].to_lowercase(), caps[2].trim().to_string()),
        None => (
            default_tag
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .unwrap_or(UNTAGGED)
                .to_string(),
            text.to_string(),
        ),
    };
    let title = content
        .split_whitespace()
        .take(TITLE_WORDS)
        .collect::<Vec<_>>()
        .join(" ");

    ParsedNote {
        title,
        content,
        tag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_prefix_is_lowercased_and_stripped() {
        let parsed = parse_note_input("Work:  finish the quarterly report today", None);
        assert_eq!(parsed.tag, "work");
        assert_eq!(parsed.content, "finish the quarterly report today");
        assert_eq!(parsed.title, "finish the quarterly");
    }

    #[test]
    fn missing_prefix_uses_default_then_untagged() {
        assert_eq!(parse_note_input("just a thought", Some("ideas")).tag, "ideas");
        let parsed = parse_note_input("just a thought", None);
        assert_eq!(parsed.tag, UNTAGGED);
        assert_eq!(parsed.title, "just a thought");
    }

    #[test]
    fn non_letter_prefix_is_content() {
        let parsed = parse_note_input("at 10:30 call bank", None);
        assert_eq!(parsed.tag, UNTAGGED);
        assert_eq!(parsed.content, "at 10:30 call bank");
    }
}
