//! Shopping list repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `find_all` is ordered by `updated_at DESC, id DESC`.
//! - Deleting a list deletes its items through `ON DELETE CASCADE`.

use crate::db::schema::TableName;
use crate::model::list::{List, ListId, ListUpdate, ListWithCount, NewList};
use crate::repo::{ensure_connection_ready, Assignments, RepoResult};
use rusqlite::{Connection, OptionalExtension, Row};

const LIST_SELECT_SQL: &str = "SELECT id, name, created_at, updated_at FROM lists";

/// Repository interface for shopping lists.
pub trait ListRepository {
    /// Returns all lists, most recently updated first.
    fn find_all(&self) -> RepoResult<Vec<List>>;
    fn find_by_id(&self, id: ListId) -> RepoResult<Option<List>>;
    /// Returns one list together with its item count.
    fn find_with_count(&self, id: ListId) -> RepoResult<Option<ListWithCount>>;
    fn create(&self, list: &NewList) -> RepoResult<ListId>;
    /// Applies populated fields; `Ok(false)` when nothing was written.
    fn update(&self, id: ListId, update: &ListUpdate) -> RepoResult<bool>;
    /// Deletes one list and, by cascade, its items.
    fn delete(&self, id: ListId) -> RepoResult<bool>;
}

/// SQLite-backed list repository.
pub struct SqliteListRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteListRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, TableName::Lists)?;
        Ok(Self { conn })
    }
}

impl ListRepository for SqliteListRepository<'_> {
    fn find_all(&self) -> RepoResult<Vec<List>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{LIST_SELECT_SQL} ORDER BY updated_at DESC, id DESC;"))?;
        let lists = stmt
            .query_map([], parse_list_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lists)
    }

    fn find_by_id(&self, id: ListId) -> RepoResult<Option<List>> {
        let list = self
            .conn
            .query_row(
                &format!("{LIST_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_list_row,
            )
            .optional()?;
        Ok(list)
    }

    fn find_with_count(&self, id: ListId) -> RepoResult<Option<ListWithCount>> {
        let list = self
            .conn
            .query_row(
                "SELECT
                    l.id AS id,
                    l.name AS name,
                    l.created_at AS created_at,
                    l.updated_at AS updated_at,
                    COUNT(li.id) AS item_count
                 FROM lists l
                 LEFT JOIN list_items li ON li.list_id = l.id
                 WHERE l.id = ?1
                 GROUP BY l.id;",
                [id],
                |row| {
                    Ok(ListWithCount {
                        list: parse_list_row(row)?,
                        item_count: row.get("item_count")?,
                    })
                },
            )
            .optional()?;
        Ok(list)
    }

    fn create(&self, list: &NewList) -> RepoResult<ListId> {
        list.validate()?;
        self.conn
            .execute("INSERT INTO lists (name) VALUES (?1);", [list.name.as_str()])?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, id: ListId, update: &ListUpdate) -> RepoResult<bool> {
        if update.is_empty() {
            return Ok(false);
        }
        update.validate()?;

        let mut assignments = Assignments::default();
        if let Some(name) = &update.name {
            assignments.set("name", name.clone());
        }
        assignments.apply(self.conn, TableName::Lists, id, true)
    }

    fn delete(&self, id: ListId) -> RepoResult<bool> {
        let changed = self.conn.execute("DELETE FROM lists WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }
}

fn parse_list_row(row: &Row<'_>) -> rusqlite::Result<List> {
    Ok(List {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
