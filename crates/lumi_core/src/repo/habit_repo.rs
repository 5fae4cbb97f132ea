//! Habit repository contract and SQLite implementation.
//!
//! # Responsibility
//! - CRUD over `habits`, split into active and archived listings.
//! - Batch position rewrite for reorder.
//!
//! # Invariants
//! - Listings are ordered by `position ASC, created_at ASC, uuid ASC`.
//! - `completions` is persisted as a JSON object of `YYYY-MM-DD -> bool`.
//! - `set_positions` writes every position inside one transaction.

use crate::model::habit::{Habit, HabitId};
use crate::repo::{
    bool_to_int, ensure_table, from_epoch_ms, int_to_bool, parse_uuid, to_epoch_ms, RepoError,
    RepoResult,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use std::collections::BTreeMap;

const HABIT_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    color,
    completions,
    archived,
    position,
    created_at
FROM habits";

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Repository interface for habit persistence.
pub trait HabitRepository {
    fn create_habit(&self, habit: &Habit) -> RepoResult<HabitId>;
    fn update_habit(&self, habit: &Habit) -> RepoResult<()>;
    fn get_habit(&self, id: HabitId) -> RepoResult<Option<Habit>>;
    /// Lists habits with the given archived flag in display order.
    fn list_habits(&self, archived: bool) -> RepoResult<Vec<Habit>>;
    fn delete_habit(&self, id: HabitId) -> RepoResult<()>;
    /// Assigns `position = index` for every id, all-or-nothing.
    fn set_positions(&self, ordered: &[HabitId]) -> RepoResult<()>;
    /// Position one past the current maximum (0 when empty).
    fn next_position(&self) -> RepoResult<i64>;
}

/// SQLite-backed habit repository.
pub struct SqliteHabitRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHabitRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table(conn, "habits")?;
        Ok(Self { conn })
    }
}

impl HabitRepository for SqliteHabitRepository<'_> {
    fn create_habit(&self, habit: &Habit) -> RepoResult<HabitId> {
        habit.validate()?;

        self.conn.execute(
            "INSERT INTO habits (
                uuid,
                title,
                color,
                completions,
                archived,
                position,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                habit.id.to_string(),
                habit.title.as_str(),
                habit.color.as_str(),
                encode_completions(&habit.completions)?,
                bool_to_int(habit.archived),
                habit.position,
                to_epoch_ms(habit.created_at),
            ],
        )?;

        Ok(habit.id)
    }

    fn update_habit(&self, habit: &Habit) -> RepoResult<()> {
        habit.validate()?;

        let changed = self.conn.execute(
            "UPDATE habits
             SET
                title = ?1,
                color = ?2,
                completions = ?3,
                archived = ?4,
                position = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?6;",
            params![
                habit.title.as_str(),
                habit.color.as_str(),
                encode_completions(&habit.completions)?,
                bool_to_int(habit.archived),
                habit.position,
                habit.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound("habit", habit.id));
        }
        Ok(())
    }

    fn get_habit(&self, id: HabitId) -> RepoResult<Option<Habit>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{HABIT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_habit_row(row)?));
        }
        Ok(None)
    }

    fn list_habits(&self, archived: bool) -> RepoResult<Vec<Habit>> {
        let mut stmt = self.conn.prepare(&format!(
            "{HABIT_SELECT_SQL}
             WHERE archived = ?1
             ORDER BY position ASC, created_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([bool_to_int(archived)])?;
        let mut habits = Vec::new();
        while let Some(row) = rows.next()? {
            habits.push(parse_habit_row(row)?);
        }
        Ok(habits)
    }

    fn delete_habit(&self, id: HabitId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM habits WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound("habit", id));
        }
        Ok(())
    }

    fn set_positions(&self, ordered: &[HabitId]) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for (index, id) in ordered.iter().enumerate() {
            let changed = tx.execute(
                "UPDATE habits
                 SET
                    position = ?1,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?2;",
                params![index as i64, id.to_string()],
            )?;
            if changed == 0 {
                // Dropping `tx` rolls back positions already written.
                return Err(RepoError::NotFound("habit", *id));
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn next_position(&self) -> RepoResult<i64> {
        let max: Option<i64> =
            self.conn
                .query_row("SELECT MAX(position) FROM habits;", [], |row| row.get(0))?;
        Ok(max.map_or(0, |value| value + 1))
    }
}

fn parse_habit_row(row: &Row<'_>) -> RepoResult<Habit> {
    let uuid_text: String = row.get("uuid")?;
    let completions_text: String = row.get("completions")?;

    let habit = Habit {
        id: parse_uuid(&uuid_text, "habits.uuid")?,
        title: row.get("title")?,
        color: row.get("color")?,
        completions: decode_completions(&completions_text)?,
        archived: int_to_bool(row.get("archived")?, "habits.archived")?,
        position: row.get("position")?,
        created_at: from_epoch_ms(row.get("created_at")?, "habits.created_at")?,
    };
    habit.validate()?;
    Ok(habit)
}

fn encode_completions(completions: &BTreeMap<NaiveDate, bool>) -> RepoResult<String> {
    let keyed: BTreeMap<String, bool> = completions
        .iter()
        .map(|(date, done)| (date.format(DATE_KEY_FORMAT).to_string(), *done))
        .collect();
    serde_json::to_string(&keyed)
        .map_err(|err| RepoError::InvalidData(format!("failed to encode completions: {err}")))
}

fn decode_completions(value: &str) -> RepoResult<BTreeMap<NaiveDate, bool>> {
    let keyed: BTreeMap<String, bool> = serde_json::from_str(value).map_err(|err| {
        RepoError::InvalidData(format!("invalid json in habits.completions: {err}"))
    })?;
    keyed
        .into_iter()
        .map(|(key, done)| {
            NaiveDate::parse_from_str(&key, DATE_KEY_FORMAT)
                .map(|date| (date, done))
                .map_err(|_| {
                    RepoError::InvalidData(format!("invalid date key `{key}` in habits.completions"))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{decode_completions, encode_completions};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    #[test]
    fn completions_encode_as_iso_keys() {
        let mut completions = BTreeMap::new();
        completions.insert(NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(), true);
        let encoded = encode_completions(&completions).unwrap();
        assert_eq!(encoded, r#"{"2024-04-02":true}"#);
        assert_eq!(decode_completions(&encoded).unwrap(), completions);
    }

    #[test]
    fn decode_rejects_non_date_keys() {
        assert!(decode_completions(r#"{"yesterday":true}"#).is_err());
    }
}
