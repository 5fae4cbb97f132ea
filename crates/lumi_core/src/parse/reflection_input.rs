//! Date-prefix parsing for journal input such as `"2 apr: had a good day"`.

use crate::model::reflection::compose_with_prompt;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// How the entry date was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseOutcome {
    /// A `day month` / `month day` prefix named the date.
    DateFromText,
    /// No usable prefix; the entry is dated today.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedReflection {
    pub date: NaiveDate,
    /// Final stored content, including the prompt header when selected.
    pub content: String,
    pub outcome: ParseOutcome,
}

/// Parses raw journal input into a dated entry.
///
/// The segment before the first `:` may end with a date written as
/// `2 apr`, `apr 2`, `2 April` or `April 2` (any case). A parsed date
/// takes the year of `today`. An impossible date such as `30 feb` is
/// treated as no date.
pub fn parse_reflection_input(
    text: &str,
    prompt: Option<&str>,
    today: NaiveDate,
) -> ParsedReflection {
    if let Some((head, rest)) = text.split_once(':') {
        if let Some(date) = parse_date_words(head, today.year()) {
            return ParsedReflection {
                date,
                content: compose_with_prompt(prompt, rest.trim()),
                outcome: ParseOutcome::DateFromText,
            };
        }
    }

    ParsedReflection {
        date: today,
        content: compose_with_prompt(prompt, text.trim()),
        outcome: ParseOutcome::Fallback,
    }
}

fn parse_date_words(head: &str, year: i32) -> Option<NaiveDate> {
    let words: Vec<&str> = head.split_whitespace().collect();
    let [first, second] = words.get(words.len().checked_sub(2)?..)? else {
        return None;
    };

    let (day, month) = match (parse_day(first), month_number(second)) {
        (Some(day), Some(month)) => (day, month),
        _ => (parse_day(second)?, month_number(first)?),
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_day(word: &str) -> Option<u32> {
    if word.is_empty() || word.len() > 2 || !word.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    word.parse().ok()
}

fn month_number(word: &str) -> Option<u32> {
    let lower = word.to_lowercase();
    MONTHS
        .iter()
        .position(|name| *name == lower || (lower.len() == 3 && name.starts_with(&lower)))
        .map(|index| index as u32 + 1)
}
