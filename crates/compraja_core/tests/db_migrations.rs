use compraja_core::db::migrations::{latest_version, schema_version, MigrationRunner};
use compraja_core::db::{open_db, open_db_in_dir, open_db_in_memory, DbError, DB_FILE_NAME};
use compraja_core::{TableName, SCHEMA_VERSION};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    assert_eq!(latest_version(), SCHEMA_VERSION);
    for table in TableName::ALL {
        assert_table_exists(&conn, table.as_str());
    }
    assert_table_exists(&conn, "schema_version");
}

#[test]
fn open_db_enables_foreign_keys_and_wal() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("wal.db")).unwrap();

    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);

    let journal_mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(journal_mode.to_lowercase(), "wal");
}

#[test]
fn open_db_in_dir_uses_fixed_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db_in_dir(dir.path()).unwrap();
    drop(conn);

    assert!(dir.path().join(DB_FILE_NAME).exists());
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("compraja.db");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute("INSERT INTO lists (name) VALUES ('Groceries');", [])
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second).unwrap(), SCHEMA_VERSION);
    let lists: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM lists;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(lists, 1);
}

#[test]
fn repeated_migrate_keeps_version_and_single_version_row() {
    let mut conn = open_db_in_memory().unwrap();
    let mut runner = MigrationRunner::new(&mut conn);
    let after_open = runner.get_version().unwrap();

    for _ in 0..3 {
        runner.migrate().unwrap();
        assert_eq!(runner.get_version().unwrap(), after_open);
    }

    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_version;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn get_version_on_fresh_connection_is_zero() {
    let mut conn = Connection::open_in_memory().unwrap();
    let runner = MigrationRunner::new(&mut conn);
    assert_eq!(runner.get_version().unwrap(), 0);
}

#[test]
fn migrate_on_raw_connection_creates_schema() {
    let mut conn = Connection::open_in_memory().unwrap();
    MigrationRunner::new(&mut conn).migrate().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
    assert_index_exists(&conn, "idx_list_items_list_id");
    assert_index_exists(&conn, "idx_prices_captured_at");
}

#[test]
fn migrate_recovers_when_tables_exist_without_version_record() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(TableName::Lists.create_sql()).unwrap();
    conn.execute("INSERT INTO lists (name) VALUES ('kept');", [])
        .unwrap();

    MigrationRunner::new(&mut conn).migrate().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
    let kept: String = conn
        .query_row("SELECT name FROM lists;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(kept, "kept");
}

#[test]
fn reset_drops_everything_until_next_migrate() {
    let mut conn = open_db_in_memory().unwrap();
    conn.execute("INSERT INTO lists (name) VALUES ('Groceries');", [])
        .unwrap();

    let mut runner = MigrationRunner::new(&mut conn);
    runner.reset().unwrap();
    assert_eq!(runner.get_version().unwrap(), 0);
    drop(runner);

    for table in TableName::ALL {
        assert_table_missing(&conn, table.as_str());
    }
    assert_table_missing(&conn, "schema_version");

    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);

    MigrationRunner::new(&mut conn).migrate().unwrap();
    let lists: i64 = conn
        .query_row("SELECT COUNT(*) FROM lists;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(lists, 0);
}

#[test]
fn opening_a_non_database_file_fails_with_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.db");
    std::fs::write(&path, vec![0x42_u8; 4096]).unwrap();

    let err = open_db(&path).unwrap_err();
    assert!(matches!(err, DbError::Sqlite(_)));
    assert!(err.is_storage_failure(), "unexpected error: {err}");
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    assert_eq!(
        sqlite_object_count(conn, "table", table_name),
        1,
        "table {table_name} does not exist"
    );
}

fn assert_table_missing(conn: &Connection, table_name: &str) {
    assert_eq!(
        sqlite_object_count(conn, "table", table_name),
        0,
        "table {table_name} still exists"
    );
}

fn assert_index_exists(conn: &Connection, index_name: &str) {
    assert_eq!(
        sqlite_object_count(conn, "index", index_name),
        1,
        "index {index_name} does not exist"
    );
}

fn sqlite_object_count(conn: &Connection, kind: &str, name: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = ?1 AND name = ?2;",
        [kind, name],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn failed_migration_step_aborts_open_and_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conflict.db");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE t (x INTEGER);
             CREATE INDEX prices ON t(x);",
        )
        .unwrap();
    }

    let err = open_db(&path).unwrap_err();
    assert!(
        matches!(err, DbError::Migration { version: 1, .. }),
        "unexpected error: {err}"
    );
    assert!(!err.is_storage_failure());

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), 0);
    assert_table_missing(&conn, "lists");

    conn.execute_batch("DROP INDEX prices;").unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
    assert_table_exists(&conn, "lists");
}
