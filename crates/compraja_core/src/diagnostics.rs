//! Read-only database introspection.
//!
//! # Responsibility
//! - Snapshot the installed schema version and row counts per table.
//! - Render the snapshot for humans.
//! - List live tables and expose their stored DDL.
//!
//! # Invariants
//! - Nothing here writes to the database.
//! - Each table count is an independent query.

use crate::db::migrations::schema_version;
use crate::db::schema::TableName;
use crate::db::DbResult;
use log::info;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

const REPORT_WIDTH: usize = 39;

/// Schema version plus row count of every data table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub schema_version: u32,
    pub counts: BTreeMap<TableName, u64>,
}

impl Diagnostics {
    pub fn count(&self, table: TableName) -> u64 {
        self.counts.get(&table).copied().unwrap_or(0)
    }

    pub fn total_rows(&self) -> u64 {
        self.counts.values().sum()
    }
}

impl Display for Diagnostics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let heavy = "=".repeat(REPORT_WIDTH);
        let light = "-".repeat(REPORT_WIDTH);

        writeln!(f, "{heavy}")?;
        writeln!(
            f,
            "{:^width$}",
            "DATABASE DIAGNOSTICS",
            width = REPORT_WIDTH
        )?;
        writeln!(f, "{heavy}")?;
        writeln!(f, "{:<17}{}", "Schema Version:", self.schema_version)?;
        writeln!(f, "{light}")?;
        for table in TableName::ALL {
            writeln!(f, "{:<17}{}", format!("{}:", label(table)), self.count(table))?;
        }
        write!(f, "{heavy}")
    }
}

fn label(table: TableName) -> &'static str {
    match table {
        TableName::Lists => "Shopping Lists",
        TableName::ListItems => "List Items",
        TableName::Products => "Products",
        TableName::Stores => "Stores",
        TableName::Prices => "Prices",
    }
}

/// Collects the schema version and row counts for all data tables.
///
/// Counts run one after another on `conn`; a `Connection` is not `Sync`,
/// so they cannot be issued in parallel on one handle.
///
/// # Errors
/// - Fails when a data table is missing (e.g. after `reset` without `migrate`).
pub fn get_diagnostics(conn: &Connection) -> DbResult<Diagnostics> {
    let schema_version = schema_version(conn)?;
    let mut counts = BTreeMap::new();
    for table in TableName::ALL {
        counts.insert(table, count_rows(conn, table)?);
    }

    Ok(Diagnostics {
        schema_version,
        counts,
    })
}

/// Writes the diagnostics report to stdout and returns the snapshot.
pub fn print_diagnostics(conn: &Connection) -> DbResult<Diagnostics> {
    let diagnostics = get_diagnostics(conn)?;
    info!(
        "event=db_diagnostics module=diagnostics status=ok schema_version={} total_rows={}",
        diagnostics.schema_version,
        diagnostics.total_rows()
    );
    println!("{diagnostics}");
    Ok(diagnostics)
}

/// Names of all live tables, internal `sqlite_*` tables excluded.
pub fn list_tables(conn: &Connection) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name
         FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
         ORDER BY name ASC;",
    )?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(names)
}

/// Stored `CREATE TABLE` text of `table`, or `None` when it does not exist.
pub fn table_schema(conn: &Connection, table: &str) -> DbResult<Option<String>> {
    let sql = conn
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1;",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(sql)
}

fn count_rows(conn: &Connection, table: TableName) -> DbResult<u64> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {};", table.as_str()),
        [],
        |row| row.get(0),
    )?;
    Ok(u64::try_from(count).unwrap_or(0))
}
