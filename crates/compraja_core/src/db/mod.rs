//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the shopping-list store.
//! - Declare the schema and apply migrations in deterministic order.
//!
//! # Invariants
//! - Installed version is tracked in the `schema_version` table.
//! - Core code must not read/write application data before migrations succeed.

use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
pub mod schema;

pub use open::{open_db, open_db_in_dir, open_db_in_memory, DB_FILE_NAME};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// A migration step failed; the database stays at its previous version.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
}

impl DbError {
    /// Whether the failure comes from the storage itself (missing, corrupt
    /// or unwritable file) rather than from a statement.
    pub fn is_storage_failure(&self) -> bool {
        let err = match self {
            Self::Sqlite(err) => err,
            Self::Migration { source, .. } => source,
        };
        matches!(
            err.sqlite_error_code(),
            Some(
                ErrorCode::CannotOpen
                    | ErrorCode::DatabaseCorrupt
                    | ErrorCode::NotADatabase
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::DiskFull
                    | ErrorCode::ReadOnly
            )
        )
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Migration { version, source } => {
                write!(f, "migration to schema version {version} failed: {source}")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Migration { source, .. } => Some(source),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
