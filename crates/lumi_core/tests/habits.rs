use chrono::{NaiveDate, TimeZone, Utc};
use lumi_core::db::open_db_in_memory;
use lumi_core::model::habit::{HabitValidationError, PASTEL_COLORS};
use lumi_core::repo::habit_repo::{HabitRepository, SqliteHabitRepository};
use lumi_core::{CoreConfig, FixedClock, HabitStore, HabitStoreError};
use rusqlite::Connection;
use std::sync::Arc;

// Wednesday 2024-03-13, 15:30 in Kolkata.
fn clock() -> Arc<FixedClock> {
    FixedClock::shared(Utc.with_ymd_and_hms(2024, 3, 13, 10, 0, 0).unwrap())
}

fn store(conn: &Connection) -> HabitStore<SqliteHabitRepository<'_>> {
    let repo = SqliteHabitRepository::try_new(conn).unwrap();
    let mut store = HabitStore::new(repo, clock(), &CoreConfig::default());
    store.refresh().unwrap();
    store.refresh_archived().unwrap();
    store
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn add_habit_appends_with_palette_color() {
    let conn = open_db_in_memory().unwrap();
    let mut store = store(&conn);

    let first = store.add_habit("  Meditate ", None).unwrap();
    let second = store.add_habit("Read", Some("#123ABC")).unwrap();

    assert_eq!(first.title, "Meditate");
    assert!(PASTEL_COLORS.contains(&first.color.as_str()));
    assert_eq!(second.color, "#123ABC");
    assert!(second.position > first.position);
    let titles: Vec<_> = store.habits().iter().map(|h| h.title.as_str()).collect();
    assert_eq!(titles, ["Meditate", "Read"]);
}

#[test]
fn blank_title_is_rejected_without_write() {
    let conn = open_db_in_memory().unwrap();
    let mut store = store(&conn);

    let err = store.add_habit("   ", None).unwrap_err();
    assert!(matches!(
        err,
        HabitStoreError::Validation(HabitValidationError::BlankTitle)
    ));
    let repo = SqliteHabitRepository::try_new(&conn).unwrap();
    assert!(repo.list_habits(false).unwrap().is_empty());
}

#[test]
fn toggling_twice_restores_original_value() {
    let conn = open_db_in_memory().unwrap();
    let mut store = store(&conn);
    let habit = store.add_habit("Run", None).unwrap();
    let date = day(2024, 3, 11);

    assert!(store.toggle_completion(habit.id, date).unwrap());
    assert!(!store.toggle_completion(habit.id, date).unwrap());

    let repo = SqliteHabitRepository::try_new(&conn).unwrap();
    let stored = repo.get_habit(habit.id).unwrap().unwrap();
    assert!(!stored.is_completed_on(date));
}

#[test]
fn week_progress_follows_current_week_dates() {
    let conn = open_db_in_memory().unwrap();
    let mut store = store(&conn);
    let habit = store.add_habit("Stretch", None).unwrap();

    store.toggle_completion(habit.id, day(2024, 3, 11)).unwrap();
    store.toggle_today(habit.id).unwrap();
    store.toggle_completion(habit.id, day(2024, 3, 10)).unwrap();

    let dates = store.week_dates();
    assert_eq!(dates[0], day(2024, 3, 11));
    assert_eq!(dates[6], day(2024, 3, 17));

    let habit = store.find(habit.id).unwrap().clone();
    let progress = store.week_progress(&habit);
    assert_eq!(progress, [true, false, true, false, false, false, false]);
    for (index, date) in dates.iter().enumerate() {
        assert_eq!(progress[index], habit.is_completed_on(*date));
    }
}

#[test]
fn month_data_covers_every_day() {
    let conn = open_db_in_memory().unwrap();
    let mut store = store(&conn);
    let habit = store.add_habit("Journal", None).unwrap();
    store.toggle_completion(habit.id, day(2024, 2, 29)).unwrap();
    let habit = store.find(habit.id).unwrap().clone();

    let feb = store.month_data(&habit, 2024, 2).unwrap();
    assert_eq!(feb.dates.len(), 29);
    assert_eq!(feb.month_label, "February 2024");
    assert_eq!(feb.completed_days(), 1);
    assert!(feb.completions[28]);

    assert_eq!(store.month_data(&habit, 2024, 4).unwrap().dates.len(), 30);
    assert!(matches!(
        store.month_data(&habit, 2024, 0),
        Err(HabitStoreError::Progress(_))
    ));
}

#[test]
fn archive_and_unarchive_move_between_lists() {
    let conn = open_db_in_memory().unwrap();
    let mut store = store(&conn);
    let keep = store.add_habit("Keep", None).unwrap();
    let shelve = store.add_habit("Shelve", None).unwrap();

    store.archive(shelve.id).unwrap();
    assert_eq!(store.habits().len(), 1);
    assert_eq!(store.habits()[0].id, keep.id);
    assert_eq!(store.archived_habits().len(), 1);
    assert!(store.archived_habits()[0].archived);

    store.unarchive(shelve.id).unwrap();
    assert_eq!(store.habits().len(), 2);
    assert!(store.archived_habits().is_empty());
}

#[test]
fn archived_list_follows_persisted_position_order() {
    let conn = open_db_in_memory().unwrap();
    let mut store = store(&conn);
    let first = store.add_habit("First", None).unwrap();
    let second = store.add_habit("Second", None).unwrap();
    let third = store.add_habit("Third", None).unwrap();

    store.archive(third.id).unwrap();
    store.archive(first.id).unwrap();

    let mirrored: Vec<_> = store.archived_habits().iter().map(|h| h.id).collect();
    assert_eq!(mirrored, vec![first.id, third.id]);
    let repo = SqliteHabitRepository::try_new(&conn).unwrap();
    let persisted: Vec<_> = repo.list_habits(true).unwrap().iter().map(|h| h.id).collect();
    assert_eq!(mirrored, persisted);

    // A store that never loaded the archived list still sees all of it.
    let repo = SqliteHabitRepository::try_new(&conn).unwrap();
    let mut fresh = HabitStore::new(repo, clock(), &CoreConfig::default());
    fresh.refresh().unwrap();
    fresh.archive(second.id).unwrap();
    let ids: Vec<_> = fresh.archived_habits().iter().map(|h| h.id).collect();
    assert_eq!(ids, vec![first.id, second.id, third.id]);
    assert!(fresh.habits().is_empty());
}

#[test]
fn reorder_assigns_sequential_positions() {
    let conn = open_db_in_memory().unwrap();
    let mut store = store(&conn);
    let a = store.add_habit("A", None).unwrap();
    let b = store.add_habit("B", None).unwrap();
    let c = store.add_habit("C", None).unwrap();

    store.reorder(&[c.id, a.id, b.id]).unwrap();

    let order: Vec<_> = store.habits().iter().map(|h| (h.id, h.position)).collect();
    assert_eq!(order, vec![(c.id, 0), (a.id, 1), (b.id, 2)]);
}

#[test]
fn reorder_rejects_partial_or_duplicate_lists() {
    let conn = open_db_in_memory().unwrap();
    let mut store = store(&conn);
    let a = store.add_habit("A", None).unwrap();
    let b = store.add_habit("B", None).unwrap();

    assert!(matches!(
        store.reorder(&[a.id]),
        Err(HabitStoreError::ReorderMismatch {
            expected: 2,
            provided: 1
        })
    ));
    assert!(matches!(
        store.reorder(&[a.id, a.id]),
        Err(HabitStoreError::ReorderMismatch { .. })
    ));
    let order: Vec<_> = store.habits().iter().map(|h| h.id).collect();
    assert_eq!(order, vec![a.id, b.id]);
}

#[test]
fn update_color_validates_hex() {
    let conn = open_db_in_memory().unwrap();
    let mut store = store(&conn);
    let habit = store.add_habit("Water", None).unwrap();

    store.update_color(habit.id, "#00FF00").unwrap();
    assert_eq!(store.find(habit.id).unwrap().color, "#00FF00");

    assert!(matches!(
        store.update_color(habit.id, "green"),
        Err(HabitStoreError::Validation(HabitValidationError::InvalidColor(_)))
    ));
    store.rename(habit.id, "Hydrate").unwrap();
    assert_eq!(store.find(habit.id).unwrap().title, "Hydrate");
}

#[test]
fn delete_removes_from_store_and_storage() {
    let conn = open_db_in_memory().unwrap();
    let mut store = store(&conn);
    let habit = store.add_habit("Temp", None).unwrap();

    store.delete_habit(habit.id).unwrap();
    assert!(store.habits().is_empty());
    assert!(matches!(
        store.delete_habit(habit.id),
        Err(HabitStoreError::HabitNotFound(id)) if id == habit.id
    ));
}
