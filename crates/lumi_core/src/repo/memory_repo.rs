//! Memory repository contract and SQLite implementation.
//!
//! # Invariants
//! - `tags` and `images` columns hold JSON string arrays.
//! - Listing is newest `date` first.

use crate::model::memory::{Memory, MemoryId};
use crate::repo::{ensure_table, from_epoch_ms, parse_uuid, to_epoch_ms, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const MEMORY_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    content,
    date,
    tags,
    images
FROM memories";

pub trait MemoryRepository {
    fn create_memory(&self, memory: &Memory) -> RepoResult<MemoryId>;
    fn update_memory(&self, memory: &Memory) -> RepoResult<()>;
    fn get_memory(&self, id: MemoryId) -> RepoResult<Option<Memory>>;
    fn list_memories(&self) -> RepoResult<Vec<Memory>>;
    fn delete_memory(&self, id: MemoryId) -> RepoResult<()>;
}

pub struct SqliteMemoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMemoryRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table(conn, "memories")?;
        Ok(Self { conn })
    }
}

impl MemoryRepository for SqliteMemoryRepository<'_> {
    fn create_memory(&self, memory: &Memory) -> RepoResult<MemoryId> {
        self.conn.execute(
            "INSERT INTO memories (uuid, title, content, date, tags, images, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?4);",
            params![
                memory.id.to_string(),
                memory.title.as_str(),
                memory.content.as_str(),
                to_epoch_ms(memory.date),
                encode_list(&memory.tags, "tags")?,
                encode_list(&memory.images, "images")?,
            ],
        )?;
        Ok(memory.id)
    }

    fn update_memory(&self, memory: &Memory) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE memories
             SET
                title = ?1,
                content = ?2,
                tags = ?3,
                images = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?5;",
            params![
                memory.title.as_str(),
                memory.content.as_str(),
                encode_list(&memory.tags, "tags")?,
                encode_list(&memory.images, "images")?,
                memory.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound("memory", memory.id));
        }
        Ok(())
    }

    fn get_memory(&self, id: MemoryId) -> RepoResult<Option<Memory>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEMORY_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_memory_row(row)?));
        }
        Ok(None)
    }

    fn list_memories(&self) -> RepoResult<Vec<Memory>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEMORY_SELECT_SQL} ORDER BY date DESC, uuid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut memories = Vec::new();
        while let Some(row) = rows.next()? {
            memories.push(parse_memory_row(row)?);
        }
        Ok(memories)
    }

    fn delete_memory(&self, id: MemoryId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM memories WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound("memory", id));
        }
        Ok(())
    }
}

fn parse_memory_row(row: &Row<'_>) -> RepoResult<Memory> {
    let uuid_text: String = row.get("uuid")?;
    let tags_text: String = row.get("tags")?;
    let images_text: String = row.get("images")?;

    Ok(Memory {
        id: parse_uuid(&uuid_text, "memories.uuid")?,
        title: row.get("title")?,
        content: row.get("content")?,
        date: from_epoch_ms(row.get("date")?, "memories.date")?,
        tags: decode_list(&tags_text, "memories.tags")?,
        images: decode_list(&images_text, "memories.images")?,
    })
}

fn encode_list(values: &[String], field: &str) -> RepoResult<String> {
    serde_json::to_string(values)
        .map_err(|err| RepoError::InvalidData(format!("failed to encode {field}: {err}")))
}

fn decode_list(value: &str, column: &str) -> RepoResult<Vec<String>> {
    serde_json::from_str(value)
        .map_err(|err| RepoError::InvalidData(format!("invalid json in {column}: {err}")))
}
