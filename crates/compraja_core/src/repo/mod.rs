//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define one data access contract per entity.
//! - Isolate SQLite query details from callers.
//! - Classify constraint failures so callers can tell a duplicate from a
//!   dangling reference.
//!
//! # Invariants
//! - Repositories only accept connections migrated to `SCHEMA_VERSION`.
//! - Lookups of missing rows return `None`/`false`, never an error.
//! - Partial updates write only populated fields; empty payloads write nothing.

use crate::db::migrations::schema_version;
use crate::db::schema::{now_epoch_ms, TableName, SCHEMA_VERSION};
use crate::db::DbError;
use crate::model::ValidationError;
use rusqlite::types::Value;
use rusqlite::{ffi, params_from_iter, Connection, ErrorCode, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod list_item_repo;
pub mod list_repo;
pub mod price_repo;
pub mod product_repo;
pub mod store_repo;

/// Maximum rows returned by name searches.
pub const SEARCH_LIMIT: u32 = 20;

pub type RepoResult<T> = Result<T, RepoError>;

/// Which SQL constraint rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Duplicate value in a UNIQUE or PRIMARY KEY column.
    Unique,
    /// Reference to a row that does not exist.
    ForeignKey,
    NotNull,
    Check,
    Other,
}

impl Display for ConstraintKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Unique => "unique",
            Self::ForeignKey => "foreign key",
            Self::NotNull => "not null",
            Self::Check => "check",
            Self::Other => "other",
        };
        f.write_str(label)
    }
}

/// Repository error shared by all entity repositories.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Write rejected by a schema constraint. `detail` keeps the SQLite
    /// message, e.g. `UNIQUE constraint failed: products.barcode`.
    Constraint {
        kind: ConstraintKind,
        detail: String,
    },
    Validation(ValidationError),
    /// Connection schema is below the version this crate expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    /// Persisted row cannot be decoded into the read model.
    InvalidData(String),
}

impl RepoError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Constraint {
                kind: ConstraintKind::Unique,
                ..
            }
        )
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(
            self,
            Self::Constraint {
                kind: ConstraintKind::ForeignKey,
                ..
            }
        )
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Constraint { kind, detail } => {
                write!(f, "{kind} constraint violation: {detail}")
            }
            Self::Validation(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Constraint { .. } => None,
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match constraint_kind(&value) {
            Some(kind) => Self::Constraint {
                kind,
                detail: value.to_string(),
            },
            None => Self::Db(DbError::Sqlite(value)),
        }
    }
}

fn constraint_kind(err: &rusqlite::Error) -> Option<ConstraintKind> {
    let rusqlite::Error::SqliteFailure(failure, _) = err else {
        return None;
    };
    if failure.code != ErrorCode::ConstraintViolation {
        return None;
    }

    let kind = match failure.extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
            ConstraintKind::Unique
        }
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ConstraintKind::ForeignKey,
        ffi::SQLITE_CONSTRAINT_NOTNULL => ConstraintKind::NotNull,
        ffi::SQLITE_CONSTRAINT_CHECK => ConstraintKind::Check,
        _ => ConstraintKind::Other,
    };
    Some(kind)
}

/// Rejects connections that were not brought up by the migration runner.
pub(crate) fn ensure_connection_ready(conn: &Connection, table: TableName) -> RepoResult<()> {
    let actual_version = schema_version(conn)?;
    if actual_version < SCHEMA_VERSION {
        return Err(RepoError::UninitializedConnection {
            expected_version: SCHEMA_VERSION,
            actual_version,
        });
    }

    let exists = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;",
            [table.as_str()],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !exists {
        return Err(RepoError::MissingRequiredTable(table.as_str()));
    }

    Ok(())
}

/// Column assignments collected from a partial update payload.
#[derive(Debug, Default)]
pub(crate) struct Assignments {
    columns: Vec<&'static str>,
    values: Vec<Value>,
}

impl Assignments {
    pub(crate) fn set(&mut self, column: &'static str, value: impl Into<Value>) {
        self.columns.push(column);
        self.values.push(value.into());
    }

    /// Runs `UPDATE table SET ... WHERE id = ?`.
    ///
    /// Returns `Ok(false)` without touching the database when nothing was
    /// assigned, otherwise whether a row matched `id`.
    pub(crate) fn apply(
        self,
        conn: &Connection,
        table: TableName,
        id: i64,
        touch_updated_at: bool,
    ) -> RepoResult<bool> {
        if self.columns.is_empty() {
            return Ok(false);
        }

        let mut set_clauses: Vec<String> = self
            .columns
            .iter()
            .map(|column| format!("{column} = ?"))
            .collect();
        if touch_updated_at {
            set_clauses.push(format!("updated_at = {}", now_epoch_ms!()));
        }

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?;",
            table.as_str(),
            set_clauses.join(", ")
        );
        let mut bind_values = self.values;
        bind_values.push(Value::Integer(id));

        let changed = conn.execute(&sql, params_from_iter(bind_values))?;
        Ok(changed > 0)
    }
}

/// Builds a LIKE pattern matching `query` as a literal substring.
///
/// Pair with `ESCAPE '\'` in SQL.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}
