//! Habit domain model.
//!
//! # Responsibility
//! - Define the habit record and its per-day completion map.
//! - Provide the pastel palette and color validation helpers.
//!
//! # Invariants
//! - `id` is stable and never reused.
//! - At most one completion flag exists per (habit, date).
//! - `color` is a `#RRGGBB` hex string.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type HabitId = Uuid;

/// Distinct pastel colors assigned to new habits.
pub const PASTEL_COLORS: [&str; 9] = [
    "#FF6B6B", // coral red
    "#FFB84D", // bright orange
    "#F7DC6F", // golden yellow
    "#52C41A", // vibrant green
    "#1890FF", // bright blue
    "#B37FEB", // purple
    "#FF85C0", // pink
    "#36CFC9", // cyan
    "#FA8C16", // dark orange
];

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid hex color regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HabitValidationError {
    BlankTitle,
    InvalidColor(String),
}

impl Display for HabitValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "habit title must not be blank"),
            Self::InvalidColor(value) => {
                write!(f, "habit color `{value}` is not a #RRGGBB hex value")
            }
        }
    }
}

impl Error for HabitValidationError {}

/// A recurring activity tracked per calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub title: String,
    pub color: String,
    /// Calendar date to completion flag. A `false` entry is a day that was
    /// toggled on and back off.
    pub completions: BTreeMap<NaiveDate, bool>,
    pub archived: bool,
    /// Display order among habits; lower sorts first.
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

impl Habit {
    /// Creates an active habit with no completions.
    pub fn new(
        title: impl Into<String>,
        color: impl Into<String>,
        position: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            color: color.into(),
            completions: BTreeMap::new(),
            archived: false,
            position,
            created_at,
        }
    }

    pub fn is_completed_on(&self, date: NaiveDate) -> bool {
        self.completions.get(&date).copied().unwrap_or(false)
    }

    /// Flips the completion flag for `date` and returns the new value.
    pub fn toggle_completion(&mut self, date: NaiveDate) -> bool {
        let next = !self.is_completed_on(date);
        self.completions.insert(date, next);
        next
    }

    /// Number of days marked complete.
    pub fn completed_days(&self) -> usize {
        self.completions.values().filter(|done| **done).count()
    }

    pub fn validate(&self) -> Result<(), HabitValidationError> {
        if self.title.trim().is_empty() {
            return Err(HabitValidationError::BlankTitle);
        }
        if !is_valid_hex_color(&self.color) {
            return Err(HabitValidationError::InvalidColor(self.color.clone()));
        }
        Ok(())
    }
}

pub fn is_valid_hex_color(value: &str) -> bool {
    HEX_COLOR_RE.is_match(value)
}

/// Picks one palette entry uniformly at random.
pub fn random_palette_color() -> &'static str {
    PASTEL_COLORS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(PASTEL_COLORS[0])
}
