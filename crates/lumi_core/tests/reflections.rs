use chrono::{Duration, NaiveDate, TimeZone, Utc};
use lumi_core::db::open_db_in_memory;
use lumi_core::parse::ParseOutcome;
use lumi_core::repo::reflection_repo::SqliteReflectionRepository;
use lumi_core::{CoreConfig, FixedClock, ReflectionService, ReflectionServiceError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rusqlite::Connection;
use std::sync::Arc;

// 2024-06-15 02:00 at +05:30; still the 14th in UTC.
fn clock() -> Arc<FixedClock> {
    FixedClock::shared(Utc.with_ymd_and_hms(2024, 6, 14, 20, 30, 0).unwrap())
}

fn service(conn: &Connection, clock: Arc<FixedClock>) -> ReflectionService<SqliteReflectionRepository<'_>> {
    let repo = SqliteReflectionRepository::try_new(conn).unwrap();
    ReflectionService::new(repo, clock, &CoreConfig::default())
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn dated_prefix_sets_entry_date_in_current_year() {
    let conn = open_db_in_memory().unwrap();
    let journal = service(&conn, clock());

    let added = journal.add_reflection("2 apr: had a good day", None).unwrap();

    assert_eq!(added.outcome, ParseOutcome::DateFromText);
    assert_eq!(added.reflection.date, day(2024, 4, 2));
    assert_eq!(added.reflection.content, "had a good day");
    assert_eq!(journal.get(added.reflection.id).unwrap(), Some(added.reflection));
}

#[test]
fn undated_input_uses_today_in_user_zone() {
    let conn = open_db_in_memory().unwrap();
    let journal = service(&conn, clock());

    let added = journal.add_reflection("quiet evening", None).unwrap();

    assert_eq!(added.outcome, ParseOutcome::Fallback);
    assert_eq!(added.reflection.date, day(2024, 6, 15));
    assert_eq!(added.reflection.content, "quiet evening");
}

#[test]
fn selected_prompt_is_stored_as_header() {
    let conn = open_db_in_memory().unwrap();
    let journal = service(&conn, clock());

    let added = journal
        .add_reflection("5 jun: the sunset", Some("What made you smile today?"))
        .unwrap();

    let stored = journal.get(added.reflection.id).unwrap().unwrap();
    assert_eq!(stored.prompt().as_deref(), Some("What made you smile today?"));
    assert_eq!(stored.response(), "the sunset");
    assert_eq!(stored.date, day(2024, 6, 5));
}

#[test]
fn blank_input_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let journal = service(&conn, clock());

    assert!(matches!(
        journal.add_reflection("   ", None),
        Err(ReflectionServiceError::EmptyContent)
    ));
    assert!(journal.list().unwrap().is_empty());
}

#[test]
fn list_is_newest_date_first() {
    let conn = open_db_in_memory().unwrap();
    let journal = service(&conn, clock());
    journal.add_dated(day(2024, 6, 1), "first").unwrap();
    journal.add_dated(day(2024, 6, 10), "second").unwrap();
    journal.add_dated(day(2024, 5, 20), "oldest").unwrap();

    let contents: Vec<_> = journal
        .list()
        .unwrap()
        .into_iter()
        .map(|r| r.content)
        .collect();
    assert_eq!(contents, ["second", "first", "oldest"]);
}

#[test]
fn update_changes_date_and_content() {
    let conn = open_db_in_memory().unwrap();
    let clock = clock();
    let journal = service(&conn, clock.clone());
    let entry = journal.add_dated(day(2024, 6, 1), "draft").unwrap();
    clock.advance(Duration::minutes(5));

    let updated = journal
        .update(entry.id, Some(day(2024, 6, 2)), Some(" final "))
        .unwrap();
    assert_eq!(updated.date, day(2024, 6, 2));
    assert_eq!(updated.content, "final");
    assert_eq!(updated.created_at, entry.created_at);

    assert!(matches!(
        journal.update(entry.id, None, Some("")),
        Err(ReflectionServiceError::EmptyContent)
    ));
    let unchanged = journal.update(entry.id, None, None).unwrap();
    assert_eq!(unchanged.content, "final");
}

#[test]
fn delete_unknown_reflection_reports_not_found() {
    let conn = open_db_in_memory().unwrap();
    let journal = service(&conn, clock());
    let entry = journal.add_dated(day(2024, 6, 1), "gone soon").unwrap();

    journal.delete(entry.id).unwrap();
    assert_eq!(journal.get(entry.id).unwrap(), None);
    assert!(matches!(
        journal.delete(entry.id),
        Err(ReflectionServiceError::ReflectionNotFound(id)) if id == entry.id
    ));
}

#[test]
fn random_reflection_picks_a_stored_entry() {
    let conn = open_db_in_memory().unwrap();
    let journal = service(&conn, clock());
    let mut rng = StdRng::seed_from_u64(11);
    assert_eq!(journal.random_reflection_with(&mut rng).unwrap(), None);

    let a = journal.add_dated(day(2024, 6, 1), "a").unwrap();
    let b = journal.add_dated(day(2024, 6, 2), "b").unwrap();

    for _ in 0..10 {
        let picked = journal.random_reflection_with(&mut rng).unwrap().unwrap();
        assert!(picked.id == a.id || picked.id == b.id);
    }
}
