//! Memory (tagged note) model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

pub type MemoryId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    pub id: MemoryId,
    pub title: String,
    pub content: String,
    pub date: DateTime<Utc>,
    /// Trimmed, deduplicated, sorted.
    pub tags: Vec<String>,
    /// Local file paths of attached images, in attach order.
    pub images: Vec<String>,
}

impl Memory {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        tags: &[String],
        images: Vec<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            content: content.into(),
            date,
            tags: normalize_tags(tags),
            images,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|value| value == tag.trim())
    }

    /// Case-insensitive substring match over title, content and tags.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&needle)
            || self.content.to_lowercase().contains(&needle)
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(&needle))
    }
}

/// Trims, drops blanks, deduplicates and sorts tag values.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{normalize_tags, Memory};
    use chrono::Utc;

    #[test]
    fn normalize_tags_trims_and_dedups() {
        let tags = vec![" work ".to_string(), "work".to_string(), "".to_string()];
        assert_eq!(normalize_tags(&tags), vec!["work".to_string()]);
    }

    #[test]
    fn matches_checks_title_content_and_tags() {
        let memory = Memory::new(
            "Trip",
            "Went hiking",
            &["Outdoors".to_string()],
            Vec::new(),
            Utc::now(),
        );
        assert!(memory.matches("trip"));
        assert!(memory.matches("HIKING"));
        assert!(memory.matches("door"));
        assert!(!memory.matches("office"));
    }
}
