use rusqlite::Connection;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use toc_storage::{CreateSectionRequest, SqliteStore, StoreError};

fn temp_storage_dir(label: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be monotonic enough for tests")
        .as_nanos();
    path.push(format!(
        "toc-storage-schema-{label}-{}-{nanos}",
        std::process::id()
    ));
    std::fs::create_dir_all(&path).expect("temp storage dir must be creatable");
    path
}

#[test]
fn open_is_fail_closed_on_foreign_tables() {
    let dir = temp_storage_dir("foreign-tables");
    let db_path = dir.join("toc_sections.db");

    let conn = Connection::open(db_path).expect("raw db must open");
    conn.execute("CREATE TABLE legacy_notes(id TEXT PRIMARY KEY)", [])
        .expect("legacy table should be created");
    drop(conn);

    let err = SqliteStore::open(&dir).expect_err("foreign schema must be rejected");
    assert!(matches!(
        err,
        StoreError::InvalidInput(message) if message.starts_with("RESET_REQUIRED")
    ));
}

#[test]
fn reopening_a_store_preserves_data() {
    let dir = temp_storage_dir("reopen");

    let id = {
        let mut store = SqliteStore::open(&dir).expect("fresh storage should open");
        store
            .create_section(CreateSectionRequest {
                name: "Persistent".to_string(),
                parent_id: None,
            })
            .expect("create should succeed")
    };

    let store = SqliteStore::open(&dir).expect("existing storage should reopen");
    let forest = store.tree().expect("tree should project");
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].id, id);
    assert_eq!(forest[0].name, "Persistent");
}

#[test]
fn injected_clock_pins_timestamps() {
    let dir = temp_storage_dir("clock");
    let mut store =
        SqliteStore::open_with_clock(&dir, || 42).expect("fresh storage should open");

    store
        .create_section(CreateSectionRequest {
            name: "Timed".to_string(),
            parent_id: None,
        })
        .expect("create should succeed");

    let db_path = dir.join("toc_sections.db");
    let conn = Connection::open(db_path).expect("raw db must open");
    let updated_at: i64 = conn
        .query_row("SELECT updated_at_ms FROM sections", [], |row| row.get(0))
        .expect("row should exist");
    assert_eq!(updated_at, 42);

    // Schema installation itself must run on the same clock.
    let (state_created, state_updated): (i64, i64) = conn
        .query_row(
            "SELECT created_at_ms, updated_at_ms FROM store_state WHERE singleton=1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("state row should exist");
    assert_eq!(state_created, 42);
    assert_eq!(state_updated, 42);
}
