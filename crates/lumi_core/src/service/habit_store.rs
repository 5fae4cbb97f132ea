//! Habit store: in-memory habit lists mirrored from persistence.
//!
//! # Responsibility
//! - Hold the active and archived habit lists shown by the UI.
//! - Run habit lifecycle operations against the repository and keep the
//!   in-memory mirror in sync.
//! - Serve weekly/monthly progress views for the configured user zone.
//!
//! # Invariants
//! - `active` never contains archived habits, `archived` only archived ones.
//! - The mirror is updated only after persistence succeeds.
//! - Toggle reads the persisted habit; concurrent writers are last-write-wins.

use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::model::habit::{
    is_valid_hex_color, random_palette_color, Habit, HabitId, HabitValidationError,
};
use crate::repo::habit_repo::HabitRepository;
use crate::repo::RepoError;
use crate::service::progress::{self, MonthData, ProgressError};
use chrono::{FixedOffset, NaiveDate};
use log::{info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug)]
pub enum HabitStoreError {
    Validation(HabitValidationError),
    HabitNotFound(HabitId),
    /// Reorder input does not cover exactly the active habits.
    ReorderMismatch { expected: usize, provided: usize },
    Progress(ProgressError),
    Repo(RepoError),
}

impl Display for HabitStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::HabitNotFound(id) => write!(f, "habit not found: {id}"),
            Self::ReorderMismatch { expected, provided } => write!(
                f,
                "reorder expects all {expected} active habits once, got {provided} entries"
            ),
            Self::Progress(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for HabitStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Progress(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for HabitStoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(_, id) => Self::HabitNotFound(id),
            RepoError::HabitValidation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<HabitValidationError> for HabitStoreError {
    fn from(value: HabitValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ProgressError> for HabitStoreError {
    fn from(value: ProgressError) -> Self {
        Self::Progress(value)
    }
}

pub type HabitStoreResult<T> = Result<T, HabitStoreError>;

/// State container for habit screens.
pub struct HabitStore<R: HabitRepository> {
    repo: R,
    clock: Arc<dyn Clock>,
    zone: FixedOffset,
    active: Vec<Habit>,
    archived: Vec<Habit>,
}

impl<R: HabitRepository> HabitStore<R> {
    /// Creates an empty store; call `refresh` to load persisted habits.
    pub fn new(repo: R, clock: Arc<dyn Clock>, config: &CoreConfig) -> Self {
        Self {
            repo,
            clock,
            zone: config.zone(),
            active: Vec::new(),
            archived: Vec::new(),
        }
    }

    pub fn habits(&self) -> &[Habit] {
        &self.active
    }

    pub fn archived_habits(&self) -> &[Habit] {
        &self.archived
    }

    /// Replaces the active list without touching persistence.
    pub fn set_habits(&mut self, habits: Vec<Habit>) {
        self.active = habits;
    }

    /// Today's date in the user zone.
    pub fn today(&self) -> NaiveDate {
        self.clock.today_in(self.zone)
    }

    pub fn refresh(&mut self) -> HabitStoreResult<()> {
        self.active = self.repo.list_habits(false)?;
        Ok(())
    }

    pub fn refresh_archived(&mut self) -> HabitStoreResult<()> {
        self.archived = self.repo.list_habits(true)?;
        Ok(())
    }

    /// Creates a habit at the end of the list.
    ///
    /// Without an explicit color a random pastel palette entry is used.
    pub fn add_habit(&mut self, title: &str, color: Option<&str>) -> HabitStoreResult<Habit> {
        let title = title.trim();
        if title.is_empty() {
            return Err(HabitValidationError::BlankTitle.into());
        }
        let color = match color.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => value.to_string(),
            None => random_palette_color().to_string(),
        };

        let position = self.repo.next_position()?;
        let habit = Habit::new(title, color, position, self.clock.now());
        self.repo.create_habit(&habit)?;
        self.active.push(habit.clone());

        info!(
            "event=habit_add module=habit status=ok position={}",
            habit.position
        );
        Ok(habit)
    }

    /// Flips completion for `(id, date)` starting from the persisted state.
    ///
    /// Returns the new completion value.
    pub fn toggle_completion(&mut self, id: HabitId, date: NaiveDate) -> HabitStoreResult<bool> {
        let mut habit = self
            .repo
            .get_habit(id)?
            .ok_or(HabitStoreError::HabitNotFound(id))?;
        let completed = habit.toggle_completion(date);
        self.repo.update_habit(&habit)?;
        self.replace_mirrored(habit);

        info!(
            "event=habit_toggle module=habit status=ok completed={}",
            completed
        );
        Ok(completed)
    }

    /// Toggles today's completion.
    pub fn toggle_today(&mut self, id: HabitId) -> HabitStoreResult<bool> {
        let today = self.today();
        self.toggle_completion(id, today)
    }

    pub fn update_color(&mut self, id: HabitId, color: &str) -> HabitStoreResult<()> {
        let color = color.trim();
        if !is_valid_hex_color(color) {
            return Err(HabitValidationError::InvalidColor(color.to_string()).into());
        }
        self.modify(id, |habit| habit.color = color.to_string())
    }

    pub fn rename(&mut self, id: HabitId, title: &str) -> HabitStoreResult<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(HabitValidationError::BlankTitle.into());
        }
        self.modify(id, |habit| habit.title = title.to_string())
    }

    /// Hides a habit from the active list and reloads the archived list.
    pub fn archive(&mut self, id: HabitId) -> HabitStoreResult<()> {
        self.persist(id, |habit| habit.archived = true)?;
        self.active.retain(|entry| entry.id != id);
        self.refresh_archived()?;
        info!("event=habit_archive module=habit status=ok");
        Ok(())
    }

    /// Restores an archived habit and reloads both lists.
    pub fn unarchive(&mut self, id: HabitId) -> HabitStoreResult<()> {
        self.persist(id, |habit| habit.archived = false)?;
        self.refresh()?;
        self.refresh_archived()?;
        info!("event=habit_unarchive module=habit status=ok");
        Ok(())
    }

    /// Persists a full reordered active list as positions `0..n-1`.
    ///
    /// All positions are written in one repository call, then the active
    /// list is reloaded.
    pub fn reorder(&mut self, ordered: &[HabitId]) -> HabitStoreResult<()> {
        let mut seen = HashSet::new();
        let covers_active = ordered.len() == self.active.len()
            && ordered.iter().all(|id| seen.insert(*id))
            && self
                .active
                .iter()
                .all(|habit| seen.contains(&habit.id));
        if !covers_active {
            return Err(HabitStoreError::ReorderMismatch {
                expected: self.active.len(),
                provided: ordered.len(),
            });
        }

        self.repo.set_positions(ordered)?;
        self.refresh()?;
        info!(
            "event=habit_reorder module=habit status=ok count={}",
            ordered.len()
        );
        Ok(())
    }

    pub fn delete_habit(&mut self, id: HabitId) -> HabitStoreResult<()> {
        self.repo.delete_habit(id)?;
        self.active.retain(|habit| habit.id != id);
        self.archived.retain(|habit| habit.id != id);
        info!("event=habit_delete module=habit status=ok");
        Ok(())
    }

    /// Completion flags Monday..Sunday for the current week.
    pub fn week_progress(&self, habit: &Habit) -> [bool; 7] {
        progress::week_progress(habit, self.today())
    }

    pub fn week_dates(&self) -> [NaiveDate; 7] {
        progress::current_week_dates(self.today())
    }

    pub fn month_data(&self, habit: &Habit, year: i32, month: u32) -> HabitStoreResult<MonthData> {
        Ok(progress::month_data(habit, year, month)?)
    }

    pub fn find(&self, id: HabitId) -> Option<&Habit> {
        self.active
            .iter()
            .chain(self.archived.iter())
            .find(|habit| habit.id == id)
    }

    fn modify(&mut self, id: HabitId, apply: impl FnOnce(&mut Habit)) -> HabitStoreResult<()> {
        let habit = self.persist(id, apply)?;
        self.replace_mirrored(habit);
        Ok(())
    }

    /// Read-modify-write against the repository, without touching the mirror.
    fn persist(&self, id: HabitId, apply: impl FnOnce(&mut Habit)) -> HabitStoreResult<Habit> {
        let mut habit = self
            .repo
            .get_habit(id)?
            .ok_or(HabitStoreError::HabitNotFound(id))?;
        apply(&mut habit);
        self.repo.update_habit(&habit)?;
        Ok(habit)
    }

    fn replace_mirrored(&mut self, habit: Habit) {
        let list = if habit.archived {
            &mut self.archived
        } else {
            &mut self.active
        };
        match list.iter_mut().find(|entry| entry.id == habit.id) {
            Some(entry) => *entry = habit,
            None => warn!("event=habit_mirror module=habit status=skip reason=not_loaded"),
        }
    }
}
