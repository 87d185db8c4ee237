//! Schema migration registry and runner.
//!
//! # Responsibility
//! - Register forward-only migration steps in strictly increasing order.
//! - Bring a connection to `SCHEMA_VERSION` exactly once per transition.
//! - Provide a destructive reset for development builds.
//!
//! # Invariants
//! - Step `version` values are monotonic and the last equals `SCHEMA_VERSION`.
//! - Every step is idempotent, so re-running it after a crash is safe.
//! - A missing `schema_version` table reads as version 0, never as an error.

use crate::db::schema::{
    TableName, CREATE_SCHEMA_VERSION_TABLE, INDEXES, SCHEMA_VERSION, SCHEMA_VERSION_TABLE,
};
use crate::db::{DbError, DbResult};
use log::{error, info, warn};
use rusqlite::{Connection, OptionalExtension};
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    description: &'static str,
    apply: fn(&Connection) -> rusqlite::Result<()>,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "initial schema",
    apply: create_initial_schema,
}];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Reads the installed schema version.
///
/// Returns 0 when the version table does not exist yet or holds no rows.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    if !version_table_exists(conn)? {
        return Ok(0);
    }

    let version: Option<u32> = conn.query_row(
        "SELECT MAX(version) FROM schema_version;",
        [],
        |row| row.get(0),
    )?;
    Ok(version.unwrap_or(0))
}

/// Applies and tracks schema migrations on one connection.
pub struct MigrationRunner<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> MigrationRunner<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }

    /// Current installed version, 0 for a fresh database.
    pub fn get_version(&self) -> DbResult<u32> {
        schema_version(self.conn)
    }

    /// Brings the database up to `SCHEMA_VERSION`.
    ///
    /// No-op when the installed version is already at or above the target.
    /// Pending steps and the version record commit in one transaction.
    ///
    /// # Errors
    /// - `DbError::Migration` when a step fails; nothing from that run is kept.
    /// - `DbError::Sqlite` for pragma/bookkeeping failures.
    pub fn migrate(&mut self) -> DbResult<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(CREATE_SCHEMA_VERSION_TABLE)?;

        let current = self.get_version()?;
        if current > SCHEMA_VERSION {
            warn!(
                "event=db_migrate module=db status=skip reason=newer_schema db_version={} latest_supported={}",
                current, SCHEMA_VERSION
            );
            return Ok(());
        }
        if current == SCHEMA_VERSION {
            info!(
                "event=db_migrate module=db status=skip reason=up_to_date version={}",
                current
            );
            return Ok(());
        }

        let started_at = Instant::now();
        info!(
            "event=db_migrate module=db status=start from_version={} to_version={}",
            current, SCHEMA_VERSION
        );

        let tx = self.conn.transaction()?;
        for migration in MIGRATIONS {
            if migration.version <= current {
                continue;
            }

            if let Err(source) = (migration.apply)(&tx) {
                error!(
                    "event=db_migrate module=db status=error version={} step=\"{}\" duration_ms={} error={}",
                    migration.version,
                    migration.description,
                    started_at.elapsed().as_millis(),
                    source
                );
                return Err(DbError::Migration {
                    version: migration.version,
                    source,
                });
            }
            info!(
                "event=db_migrate_step module=db status=ok version={} step=\"{}\"",
                migration.version, migration.description
            );
        }
        tx.execute(
            "INSERT OR REPLACE INTO schema_version (version) VALUES (?1);",
            [SCHEMA_VERSION],
        )?;
        tx.commit()?;

        info!(
            "event=db_migrate module=db status=ok version={} duration_ms={}",
            SCHEMA_VERSION,
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Drops every table, including the version table.
    ///
    /// Destroys all data. The database stays empty until `migrate` runs again.
    /// Foreign keys are re-enabled even when a drop fails.
    pub fn reset(&mut self) -> DbResult<()> {
        warn!("event=db_reset module=db status=start");
        self.conn.execute_batch("PRAGMA foreign_keys = OFF;")?;

        let dropped = drop_all_tables(self.conn);
        let restored = self.conn.execute_batch("PRAGMA foreign_keys = ON;");

        match dropped.and(restored) {
            Ok(()) => {
                warn!("event=db_reset module=db status=ok");
                Ok(())
            }
            Err(err) => {
                error!("event=db_reset module=db status=error error={}", err);
                Err(err.into())
            }
        }
    }
}

fn create_initial_schema(conn: &Connection) -> rusqlite::Result<()> {
    for table in TableName::ALL {
        conn.execute_batch(table.create_sql())?;
    }
    for sql in INDEXES {
        conn.execute_batch(sql)?;
    }
    Ok(())
}

fn drop_all_tables(conn: &Connection) -> rusqlite::Result<()> {
    for table in TableName::DROP_ORDER {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {};", table.as_str()))?;
    }
    conn.execute_batch(&format!("DROP TABLE IF EXISTS {SCHEMA_VERSION_TABLE};"))
}

fn version_table_exists(conn: &Connection) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;",
        [SCHEMA_VERSION_TABLE],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

#[cfg(test)]
mod tests {
    use super::{latest_version, schema_version, MigrationRunner, MIGRATIONS};
    use crate::db::schema::SCHEMA_VERSION;
    use rusqlite::Connection;

    #[test]
    fn registered_versions_are_strictly_increasing() {
        for pair in MIGRATIONS.windows(2) {
            assert!(pair[0].version < pair[1].version);
        }
        assert_eq!(latest_version(), SCHEMA_VERSION);
    }

    #[test]
    fn missing_version_table_reads_as_zero() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);
    }

    #[test]
    fn empty_version_table_reads_as_zero() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE schema_version (version INTEGER PRIMARY KEY);")
            .unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);
    }

    #[test]
    fn newer_installed_version_is_left_untouched() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_version (version INTEGER PRIMARY KEY);
             INSERT INTO schema_version (version) VALUES (99);",
        )
        .unwrap();

        MigrationRunner::new(&mut conn).migrate().unwrap();

        assert_eq!(schema_version(&conn).unwrap(), 99);
        let lists: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'lists';",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(lists, 0);
    }
}
