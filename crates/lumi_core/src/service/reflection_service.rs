//! Journal (reflection) use-case service.
//!
//! # Responsibility
//! - Turn raw journal input into dated entries via `parse_reflection_input`.
//! - CRUD and listing over `ReflectionRepository`.
//!
//! # Invariants
//! - Blank input is rejected before any write.
//! - Listing is newest `date` first.

use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::model::reflection::{Reflection, ReflectionId};
use crate::parse::reflection_input::{parse_reflection_input, ParseOutcome};
use crate::repo::reflection_repo::ReflectionRepository;
use crate::repo::RepoError;
use chrono::{FixedOffset, NaiveDate};
use log::info;
use rand::seq::SliceRandom;
use rand::Rng;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug)]
pub enum ReflectionServiceError {
    EmptyContent,
    ReflectionNotFound(ReflectionId),
    Repo(RepoError),
}

impl Display for ReflectionServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyContent => write!(f, "reflection content must not be blank"),
            Self::ReflectionNotFound(id) => write!(f, "reflection not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ReflectionServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ReflectionServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(_, id) => Self::ReflectionNotFound(id),
            other => Self::Repo(other),
        }
    }
}

pub type ReflectionServiceResult<T> = Result<T, ReflectionServiceError>;

/// Stored entry plus how its date was decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedReflection {
    pub reflection: Reflection,
    pub outcome: ParseOutcome,
}

pub struct ReflectionService<R: ReflectionRepository> {
    repo: R,
    clock: Arc<dyn Clock>,
    zone: FixedOffset,
}

impl<R: ReflectionRepository> ReflectionService<R> {
    pub fn new(repo: R, clock: Arc<dyn Clock>, config: &CoreConfig) -> Self {
        Self {
            repo,
            clock,
            zone: config.zone(),
        }
    }

    /// Adds an entry from raw input such as `"2 apr: had a good day"`.
    pub fn add_reflection(
        &self,
        text: &str,
        prompt: Option<&str>,
    ) -> ReflectionServiceResult<AddedReflection> {
        if text.trim().is_empty() {
            return Err(ReflectionServiceError::EmptyContent);
        }
        let today = self.clock.today_in(self.zone);
        let parsed = parse_reflection_input(text, prompt, today);
        let reflection = Reflection::new(parsed.date, parsed.content, self.clock.now());
        self.repo.create_reflection(&reflection)?;

        info!(
            "event=reflection_create module=reflection status=ok outcome={:?} has_prompt={}",
            parsed.outcome,
            prompt.is_some()
        );
        Ok(AddedReflection {
            reflection,
            outcome: parsed.outcome,
        })
    }

    /// Adds an entry for an explicit date without parsing.
    pub fn add_dated(&self, date: NaiveDate, content: &str) -> ReflectionServiceResult<Reflection> {
        if content.trim().is_empty() {
            return Err(ReflectionServiceError::EmptyContent);
        }
        let reflection = Reflection::new(date, content.trim(), self.clock.now());
        self.repo.create_reflection(&reflection)?;
        Ok(reflection)
    }

    pub fn update(
        &self,
        id: ReflectionId,
        date: Option<NaiveDate>,
        content: Option<&str>,
    ) -> ReflectionServiceResult<Reflection> {
        let mut reflection = self
            .repo
            .get_reflection(id)?
            .ok_or(ReflectionServiceError::ReflectionNotFound(id))?;
        if let Some(content) = content {
            if content.trim().is_empty() {
                return Err(ReflectionServiceError::EmptyContent);
            }
            reflection.content = content.trim().to_string();
        }
        if let Some(date) = date {
            reflection.date = date;
        }
        self.repo.update_reflection(&reflection)?;
        Ok(reflection)
    }

    pub fn delete(&self, id: ReflectionId) -> ReflectionServiceResult<()> {
        self.repo.delete_reflection(id)?;
        info!("event=reflection_delete module=reflection status=ok");
        Ok(())
    }

    pub fn get(&self, id: ReflectionId) -> ReflectionServiceResult<Option<Reflection>> {
        Ok(self.repo.get_reflection(id)?)
    }

    pub fn list(&self) -> ReflectionServiceResult<Vec<Reflection>> {
        Ok(self.repo.list_reflections()?)
    }

    /// A random stored entry, `None` when the journal is empty.
    pub fn random_reflection(&self) -> ReflectionServiceResult<Option<Reflection>> {
        self.random_reflection_with(&mut rand::thread_rng())
    }

    pub fn random_reflection_with<G: Rng + ?Sized>(
        &self,
        rng: &mut G,
    ) -> ReflectionServiceResult<Option<Reflection>> {
        let reflections = self.repo.list_reflections()?;
        Ok(reflections.choose(rng).cloned())
    }
}
