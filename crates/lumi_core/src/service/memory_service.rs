//! Memory (tagged note) use-case service.
//!
//! # Responsibility
//! - CRUD over `MemoryRepository` with tag normalization.
//! - Tag filtering, tag catalog and text search over stored memories.
//! - Copy picked images into the app images directory.
//!
//! # Invariants
//! - Stored tags are trimmed, deduplicated and sorted.
//! - Attached images are copied, never moved; the source stays untouched.

use crate::clock::Clock;
use crate::model::memory::{normalize_tags, Memory, MemoryId};
use crate::parse::note_input::parse_note_input;
use crate::repo::memory_repo::MemoryRepository;
use crate::repo::RepoError;
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
pub enum MemoryServiceError {
    EmptyContent,
    MemoryNotFound(MemoryId),
    /// Image source has no file name component.
    InvalidImageSource(PathBuf),
    Io { path: PathBuf, source: io::Error },
    Repo(RepoError),
}

impl Display for MemoryServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyContent => write!(f, "memory content must not be blank"),
            Self::MemoryNotFound(id) => write!(f, "memory not found: {id}"),
            Self::InvalidImageSource(path) => {
                write!(f, "invalid image source: {}", path.display())
            }
            Self::Io { path, source } => write!(f, "io error at {}: {source}", path.display()),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MemoryServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for MemoryServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(_, id) => Self::MemoryNotFound(id),
            other => Self::Repo(other),
        }
    }
}

pub type MemoryServiceResult<T> = Result<T, MemoryServiceError>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryDraft {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
}

pub struct MemoryService<R: MemoryRepository> {
    repo: R,
    clock: Arc<dyn Clock>,
}

impl<R: MemoryRepository> MemoryService<R> {
    pub fn new(repo: R, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub fn add_memory(&self, draft: MemoryDraft) -> MemoryServiceResult<Memory> {
        if draft.content.trim().is_empty() {
            return Err(MemoryServiceError::EmptyContent);
        }
        let memory = Memory::new(
            draft.title.trim(),
            draft.content,
            &draft.tags,
            draft.images,
            self.clock.now(),
        );
        self.repo.create_memory(&memory)?;
        info!(
            "event=memory_create module=memory status=ok tag_count={} image_count={}",
            memory.tags.len(),
            memory.images.len()
        );
        Ok(memory)
    }

    /// Adds a memory from quick-entry text (`tag: content`).
    pub fn add_from_input(
        &self,
        text: &str,
        default_tag: Option<&str>,
        images: Vec<String>,
    ) -> MemoryServiceResult<Memory> {
        let parsed = parse_note_input(text, default_tag);
        self.add_memory(MemoryDraft {
            title: parsed.title,
            content: parsed.content,
            tags: vec![parsed.tag],
            images,
        })
    }

    pub fn update_memory(&self, id: MemoryId, patch: MemoryPatch) -> MemoryServiceResult<Memory> {
        let mut memory = self
            .repo
            .get_memory(id)?
            .ok_or(MemoryServiceError::MemoryNotFound(id))?;
        if let Some(content) = patch.content {
            if content.trim().is_empty() {
                return Err(MemoryServiceError::EmptyContent);
            }
            memory.content = content;
        }
        if let Some(title) = patch.title {
            memory.title = title.trim().to_string();
        }
        if let Some(tags) = patch.tags {
            memory.tags = normalize_tags(&tags);
        }
        if let Some(images) = patch.images {
            memory.images = images;
        }
        self.repo.update_memory(&memory)?;
        Ok(memory)
    }

    pub fn delete_memory(&self, id: MemoryId) -> MemoryServiceResult<()> {
        self.repo.delete_memory(id)?;
        info!("event=memory_delete module=memory status=ok");
        Ok(())
    }

    pub fn get_memory(&self, id: MemoryId) -> MemoryServiceResult<Option<Memory>> {
        Ok(self.repo.get_memory(id)?)
    }

    /// Newest first.
    pub fn list_memories(&self) -> MemoryServiceResult<Vec<Memory>> {
        Ok(self.repo.list_memories()?)
    }

    pub fn filter_by_tag(&self, tag: &str) -> MemoryServiceResult<Vec<Memory>> {
        let memories = self.repo.list_memories()?;
        Ok(memories.into_iter().filter(|m| m.has_tag(tag)).collect())
    }

    /// Every tag in use, sorted.
    pub fn unique_tags(&self) -> MemoryServiceResult<Vec<String>> {
        let memories = self.repo.list_memories()?;
        let tags: BTreeSet<String> = memories.into_iter().flat_map(|m| m.tags).collect();
        Ok(tags.into_iter().collect())
    }

    pub fn search(&self, query: &str) -> MemoryServiceResult<Vec<Memory>> {
        let memories = self.repo.list_memories()?;
        Ok(memories.into_iter().filter(|m| m.matches(query)).collect())
    }

    /// Copies `source` into `images_dir` stamped with the current time.
    pub fn attach_image(&self, source: &Path, images_dir: &Path) -> MemoryServiceResult<PathBuf> {
        attach_image(source, images_dir, self.clock.now())
    }
}

/// Copies a picked image to `images_dir/{epoch_ms}_{file_name}`.
///
/// Creates `images_dir` when missing and returns the destination path.
pub fn attach_image(
    source: &Path,
    images_dir: &Path,
    now: DateTime<Utc>,
) -> MemoryServiceResult<PathBuf> {
    let file_name = source
        .file_name()
        .ok_or_else(|| MemoryServiceError::InvalidImageSource(source.to_path_buf()))?;

    fs::create_dir_all(images_dir).map_err(|source_err| MemoryServiceError::Io {
        path: images_dir.to_path_buf(),
        source: source_err,
    })?;

    let dest = images_dir.join(format!(
        "{}_{}",
        now.timestamp_millis(),
        file_name.to_string_lossy()
    ));
    if let Err(err) = fs::copy(source, &dest) {
        warn!("event=memory_attach_image module=memory status=error error={}", err);
        return Err(MemoryServiceError::Io {
            path: source.to_path_buf(),
            source: err,
        });
    }

    info!("event=memory_attach_image module=memory status=ok");
    Ok(dest)
}
