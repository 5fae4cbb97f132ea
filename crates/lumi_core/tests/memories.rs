use chrono::{Duration, TimeZone, Utc};
use lumi_core::db::open_db_in_memory;
use lumi_core::repo::memory_repo::SqliteMemoryRepository;
use lumi_core::service::memory_service::{MemoryDraft, MemoryPatch};
use lumi_core::{FixedClock, MemoryService, MemoryServiceError};
use rusqlite::Connection;
use std::fs;
use std::sync::Arc;

fn clock() -> Arc<FixedClock> {
    FixedClock::shared(Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap())
}

fn service(conn: &Connection, clock: Arc<FixedClock>) -> MemoryService<SqliteMemoryRepository<'_>> {
    let repo = SqliteMemoryRepository::try_new(conn).unwrap();
    MemoryService::new(repo, clock)
}

fn draft(title: &str, content: &str, tags: &[&str]) -> MemoryDraft {
    MemoryDraft {
        title: title.to_string(),
        content: content.to_string(),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        images: Vec::new(),
    }
}

#[test]
fn add_memory_normalizes_tags_and_persists() {
    let conn = open_db_in_memory().unwrap();
    let memories = service(&conn, clock());

    let memory = memories
        .add_memory(draft(" Trip ", "Beach day", &["travel", " family ", "travel", ""]))
        .unwrap();

    assert_eq!(memory.title, "Trip");
    assert_eq!(memory.tags, ["family", "travel"]);
    assert_eq!(memories.get_memory(memory.id).unwrap(), Some(memory));
}

#[test]
fn empty_content_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let memories = service(&conn, clock());

    assert!(matches!(
        memories.add_memory(draft("t", "  ", &[])),
        Err(MemoryServiceError::EmptyContent)
    ));
    assert!(matches!(
        memories.add_from_input("", None, Vec::new()),
        Err(MemoryServiceError::EmptyContent)
    ));
    assert!(memories.list_memories().unwrap().is_empty());
}

#[test]
fn quick_entry_splits_tag_prefix() {
    let conn = open_db_in_memory().unwrap();
    let memories = service(&conn, clock());

    let tagged = memories
        .add_from_input("Work: ship the release notes tonight", None, Vec::new())
        .unwrap();
    assert_eq!(tagged.tags, ["work"]);
    assert_eq!(tagged.title, "ship the release");
    assert_eq!(tagged.content, "ship the release notes tonight");

    let fallback = memories
        .add_from_input("just a thought", Some("ideas"), Vec::new())
        .unwrap();
    assert_eq!(fallback.tags, ["ideas"]);

    let untagged = memories.add_from_input("no tag here", None, Vec::new()).unwrap();
    assert_eq!(untagged.tags, ["untagged"]);
}

#[test]
fn list_filter_search_and_tags() {
    let conn = open_db_in_memory().unwrap();
    let clock = clock();
    let memories = service(&conn, clock.clone());
    let older = memories
        .add_memory(draft("Groceries", "Buy oat milk", &["home"]))
        .unwrap();
    clock.advance(Duration::hours(1));
    let newer = memories
        .add_memory(draft("Standup", "Demo the Milk tracker", &["work", "demo"]))
        .unwrap();

    let listed: Vec<_> = memories.list_memories().unwrap().into_iter().map(|m| m.id).collect();
    assert_eq!(listed, vec![newer.id, older.id]);

    let work: Vec<_> = memories.filter_by_tag("work").unwrap().into_iter().map(|m| m.id).collect();
    assert_eq!(work, vec![newer.id]);

    let milk: Vec<_> = memories.search("MILK").unwrap().into_iter().map(|m| m.id).collect();
    assert_eq!(milk, vec![newer.id, older.id]);
    assert_eq!(memories.search("dem").unwrap().len(), 1);
    assert_eq!(memories.search("  ").unwrap().len(), 2);

    assert_eq!(memories.unique_tags().unwrap(), ["demo", "home", "work"]);
}

#[test]
fn update_memory_applies_patch() {
    let conn = open_db_in_memory().unwrap();
    let memories = service(&conn, clock());
    let memory = memories.add_memory(draft("Old", "body", &["a"])).unwrap();

    let updated = memories
        .update_memory(
            memory.id,
            MemoryPatch {
                title: Some("New".to_string()),
                tags: Some(vec!["b".to_string(), " a ".to_string()]),
                ..MemoryPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.title, "New");
    assert_eq!(updated.content, "body");
    assert_eq!(updated.tags, ["a", "b"]);
    assert_eq!(memories.get_memory(memory.id).unwrap(), Some(updated));

    assert!(matches!(
        memories.update_memory(
            memory.id,
            MemoryPatch {
                content: Some(" ".to_string()),
                ..MemoryPatch::default()
            }
        ),
        Err(MemoryServiceError::EmptyContent)
    ));
}

#[test]
fn delete_memory_reports_missing_id() {
    let conn = open_db_in_memory().unwrap();
    let memories = service(&conn, clock());
    let memory = memories.add_memory(draft("x", "y", &[])).unwrap();

    memories.delete_memory(memory.id).unwrap();
    assert!(matches!(
        memories.delete_memory(memory.id),
        Err(MemoryServiceError::MemoryNotFound(id)) if id == memory.id
    ));
}

#[test]
fn attach_image_copies_into_images_dir() {
    let conn = open_db_in_memory().unwrap();
    let memories = service(&conn, clock());
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("beach.jpg");
    fs::write(&source, b"jpeg-bytes").unwrap();
    let images_dir = dir.path().join("memory_images");

    let dest = memories.attach_image(&source, &images_dir).unwrap();

    let expected_ms = Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap().timestamp_millis();
    assert_eq!(dest, images_dir.join(format!("{expected_ms}_beach.jpg")));
    assert_eq!(fs::read(&dest).unwrap(), b"jpeg-bytes");
    assert!(source.exists());

    let memory = memories
        .add_memory(MemoryDraft {
            images: vec![dest.display().to_string()],
            ..draft("Beach", "sand", &[])
        })
        .unwrap();
    assert_eq!(
        memories.get_memory(memory.id).unwrap().unwrap().images,
        vec![dest.display().to_string()]
    );
}

#[test]
fn attach_image_reports_missing_source() {
    let conn = open_db_in_memory().unwrap();
    let memories = service(&conn, clock());
    let dir = tempfile::tempdir().unwrap();

    let err = memories
        .attach_image(&dir.path().join("missing.png"), &dir.path().join("imgs"))
        .unwrap_err();
    assert!(matches!(err, MemoryServiceError::Io { .. }));
}
