//! Weekly and monthly habit completion views.
//!
//! # Invariants
//! - Weeks start on Monday.
//! - Month length always comes from calendar arithmetic.

use crate::model::habit::Habit;
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressError {
    InvalidMonth { year: i32, month: u32 },
}

impl Display for ProgressError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMonth { year, month } => {
                write!(f, "invalid calendar month {year}-{month}")
            }
        }
    }
}

impl Error for ProgressError {}

/// Completion grid for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthData {
    pub dates: Vec<NaiveDate>,
    /// Parallel to `dates`.
    pub completions: Vec<bool>,
    /// Human label such as `April 2024`.
    pub month_label: String,
    pub year: i32,
    pub month: u32,
}

impl MonthData {
    pub fn completed_days(&self) -> usize {
        self.completions.iter().filter(|done| **done).count()
    }
}

/// Monday of the week containing `today`.
pub fn week_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(i64::from(today.weekday().num_days_from_monday()))
}

/// The seven dates Monday..Sunday of the week containing `today`.
pub fn current_week_dates(today: NaiveDate) -> [NaiveDate; 7] {
    let monday = week_start(today);
    std::array::from_fn(|offset| monday + Duration::days(offset as i64))
}

/// Completion flags for the Monday-starting week containing `today`.
pub fn week_progress(habit: &Habit, today: NaiveDate) -> [bool; 7] {
    current_week_dates(today).map(|date| habit.is_completed_on(date))
}

pub fn days_in_month(year: i32, month: u32) -> Result<u32, ProgressError> {
    let first = first_of_month(year, month)?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let next = first_of_month(next_year, next_month)?;
    Ok(next.signed_duration_since(first).num_days() as u32)
}

/// Every date of the month in order.
pub fn month_dates(year: i32, month: u32) -> Result<Vec<NaiveDate>, ProgressError> {
    let first = first_of_month(year, month)?;
    let count = days_in_month(year, month)?;
    Ok((0..count)
        .map(|offset| first + Duration::days(i64::from(offset)))
        .collect())
}

pub fn month_data(habit: &Habit, year: i32, month: u32) -> Result<MonthData, ProgressError> {
    let dates = month_dates(year, month)?;
    let completions = dates.iter().map(|date| habit.is_completed_on(*date)).collect();
    let month_label = first_of_month(year, month)?.format("%B %Y").to_string();

    Ok(MonthData {
        dates,
        completions,
        month_label,
        year,
        month,
    })
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, ProgressError> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or(ProgressError::InvalidMonth { year, month })
}
