//! Reflection repository contract and SQLite implementation.

use crate::model::reflection::{Reflection, ReflectionId};
use crate::repo::{ensure_table, from_epoch_ms, parse_uuid, to_epoch_ms, RepoError, RepoResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};

const REFLECTION_SELECT_SQL: &str = "SELECT uuid, date, content, created_at FROM reflections";

pub trait ReflectionRepository {
    fn create_reflection(&self, reflection: &Reflection) -> RepoResult<ReflectionId>;
    fn update_reflection(&self, reflection: &Reflection) -> RepoResult<()>;
    fn get_reflection(&self, id: ReflectionId) -> RepoResult<Option<Reflection>>;
    /// Newest `date` first; same-day entries by newest `created_at`.
    fn list_reflections(&self) -> RepoResult<Vec<Reflection>>;
    fn delete_reflection(&self, id: ReflectionId) -> RepoResult<()>;
}

pub struct SqliteReflectionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReflectionRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table(conn, "reflections")?;
        Ok(Self { conn })
    }
}

impl ReflectionRepository for SqliteReflectionRepository<'_> {
    fn create_reflection(&self, reflection: &Reflection) -> RepoResult<ReflectionId> {
        self.conn.execute(
            "INSERT INTO reflections (uuid, date, content, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                reflection.id.to_string(),
                reflection.date.to_string(),
                reflection.content.as_str(),
                to_epoch_ms(reflection.created_at),
            ],
        )?;
        Ok(reflection.id)
    }

    fn update_reflection(&self, reflection: &Reflection) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE reflections
             SET
                date = ?1,
                content = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?3;",
            params![
                reflection.date.to_string(),
                reflection.content.as_str(),
                reflection.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound("reflection", reflection.id));
        }
        Ok(())
    }

    fn get_reflection(&self, id: ReflectionId) -> RepoResult<Option<Reflection>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{REFLECTION_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_reflection_row(row)?));
        }
        Ok(None)
    }

    fn list_reflections(&self) -> RepoResult<Vec<Reflection>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REFLECTION_SELECT_SQL} ORDER BY date DESC, created_at DESC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut reflections = Vec::new();
        while let Some(row) = rows.next()? {
            reflections.push(parse_reflection_row(row)?);
        }
        Ok(reflections)
    }

    fn delete_reflection(&self, id: ReflectionId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM reflections WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound("reflection", id));
        }
        Ok(())
    }
}

fn parse_reflection_row(row: &Row<'_>) -> RepoResult<Reflection> {
    let uuid_text: String = row.get("uuid")?;
    let date_text: String = row.get("date")?;
    let date = NaiveDate::parse_from_str(&date_text, "%Y-%m-%d").map_err(|_| {
        RepoError::InvalidData(format!("invalid date `{date_text}` in reflections.date"))
    })?;

    Ok(Reflection {
        id: parse_uuid(&uuid_text, "reflections.uuid")?,
        date,
        content: row.get("content")?,
        created_at: from_epoch_ms(row.get("created_at")?, "reflections.created_at")?,
    })
}
