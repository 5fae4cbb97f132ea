//! Completion history aggregation for the task history chart.
//!
//! Buckets are ordered oldest first and always cover the whole window,
//! so empty periods appear with a zero count.

use crate::model::task::Task;
use chrono::{Datelike, Duration, FixedOffset, Months, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRange {
    /// Last 7 days, one bucket per day.
    Weekly,
    /// Last 4 ISO weeks, one bucket per week.
    Monthly,
    /// Last 12 months, one bucket per month.
    Yearly,
}

impl HistoryRange {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryBucket {
    pub label: String,
    /// First local day covered by the bucket.
    pub start: NaiveDate,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryChart {
    pub range: HistoryRange,
    pub buckets: Vec<HistoryBucket>,
    pub total: u32,
    pub average_per_period: f64,
}

/// Buckets done tasks by their zone-local completion day.
///
/// Tasks without `completed_at` are ignored.
pub fn history_chart(
    tasks: &[Task],
    range: HistoryRange,
    today: NaiveDate,
    zone: FixedOffset,
) -> HistoryChart {
    let windows = windows(range, today);
    let completed: Vec<NaiveDate> = tasks
        .iter()
        .filter_map(|task| task.completed_at)
        .map(|at| at.with_timezone(&zone).date_naive())
        .collect();

    let buckets: Vec<HistoryBucket> = windows
        .into_iter()
        .map(|(label, start, end)| {
            let count = completed
                .iter()
                .filter(|day| **day >= start && **day <= end)
                .count();
            HistoryBucket {
                label,
                start,
                count: u32::try_from(count).unwrap_or(u32::MAX),
            }
        })
        .collect();

    let total = buckets.iter().map(|bucket| bucket.count).sum::<u32>();
    let average_per_period = if buckets.is_empty() {
        0.0
    } else {
        (f64::from(total) / buckets.len() as f64 * 10.0).round() / 10.0
    };

    HistoryChart {
        range,
        buckets,
        total,
        average_per_period,
    }
}

fn windows(range: HistoryRange, today: NaiveDate) -> Vec<(String, NaiveDate, NaiveDate)> {
    match range {
        HistoryRange::Weekly => (0..7)
            .rev()
            .map(|offset| {
                let day = today - Duration::days(offset);
                (day.format("%a").to_string(), day, day)
            })
            .collect(),
        HistoryRange::Monthly => {
            let this_week =
                today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
            (0..4)
                .rev()
                .map(|offset| {
                    let start = this_week - Duration::weeks(offset);
                    let end = start + Duration::days(6);
                    (format!("W{}", start.iso_week().week()), start, end)
                })
                .collect()
        }
        HistoryRange::Yearly => {
            let this_month = today.with_day(1).unwrap_or(today);
            (0..12u32)
                .rev()
                .filter_map(|offset| {
                    let start = this_month.checked_sub_months(Months::new(offset))?;
                    let end = start
                        .checked_add_months(Months::new(1))
                        .and_then(|next| next.pred_opt())?;
                    Some((start.format("%b").to_string(), start, end))
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::{TaskDraft, TaskStatus};
    use chrono::{TimeZone, Utc};

    fn done_at(year: i32, month: u32, day: u32, hour: u32) -> Task {
        let completed = Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap();
        let mut task = Task::from_draft(TaskDraft::titled("t"), completed);
        task.status = TaskStatus::Done;
        task.completed_at = Some(completed);
        task
    }

    fn kolkata() -> FixedOffset {
        FixedOffset::east_opt(330 * 60).unwrap()
    }

    #[test]
    fn weekly_has_seven_day_labels_ending_today() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 13).unwrap(); // Wednesday
        let chart = history_chart(&[], HistoryRange::Weekly, today, kolkata());
        let labels: Vec<_> = chart.buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["Thu", "Fri", "Sat", "Sun", "Mon", "Tue", "Wed"]);
        assert_eq!(chart.total, 0);
        assert_eq!(chart.average_per_period, 0.0);
    }

    #[test]
    fn completion_day_uses_zone_not_utc() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 13).unwrap();
        // 20:00 UTC on the 12th is 01:30 on the 13th in Kolkata.
        let tasks = vec![done_at(2024, 3, 12, 20)];
        let chart = history_chart(&tasks, HistoryRange::Weekly, today, kolkata());
        assert_eq!(chart.buckets[6].count, 1);
        assert_eq!(chart.buckets[5].count, 0);
    }

    #[test]
    fn monthly_uses_iso_week_labels() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let tasks = vec![done_at(2024, 1, 2, 6), done_at(2024, 1, 9, 6), done_at(2024, 1, 10, 6)];
        let chart = history_chart(&tasks, HistoryRange::Monthly, today, kolkata());
        let labels: Vec<_> = chart.buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["W51", "W52", "W1", "W2"]);
        assert_eq!(chart.buckets[2].count, 1);
        assert_eq!(chart.buckets[3].count, 2);
        assert_eq!(chart.total, 3);
        assert_eq!(chart.average_per_period, 0.8);
    }

    #[test]
    fn yearly_spans_twelve_months() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let tasks = vec![done_at(2023, 4, 1, 6), done_at(2023, 3, 31, 6), done_at(2024, 2, 29, 6)];
        let chart = history_chart(&tasks, HistoryRange::Yearly, today, kolkata());
        assert_eq!(chart.buckets.len(), 12);
        assert_eq!(chart.buckets[0].label, "Apr");
        assert_eq!(chart.buckets[11].label, "Mar");
        assert_eq!(chart.buckets[0].count, 1);
        assert_eq!(chart.buckets[10].count, 1);
        assert_eq!(chart.total, 2);
    }

    #[test]
    fn parse_accepts_case_insensitive_names() {
        assert_eq!(HistoryRange::parse("Weekly"), Some(HistoryRange::Weekly));
        assert_eq!(HistoryRange::parse(" yearly "), Some(HistoryRange::Yearly));
        assert_eq!(HistoryRange::parse("daily"), None);
    }
}
