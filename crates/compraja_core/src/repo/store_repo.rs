//! Store repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Store names are unique; duplicates fail with a unique constraint error.
//! - Deleting a store deletes its prices through `ON DELETE CASCADE`.

use crate::db::schema::TableName;
use crate::model::store::{NewStore, Store, StoreId, StoreUpdate};
use crate::repo::{ensure_connection_ready, like_pattern, Assignments, RepoResult, SEARCH_LIMIT};
use rusqlite::{params, Connection, OptionalExtension, Row};

const STORE_SELECT_SQL: &str = "SELECT id, name, created_at, updated_at FROM stores";

/// Repository interface for stores.
pub trait StoreRepository {
    /// Returns all stores sorted by name.
    fn find_all(&self) -> RepoResult<Vec<Store>>;
    fn find_by_id(&self, id: StoreId) -> RepoResult<Option<Store>>;
    /// Exact name lookup.
    fn find_by_name(&self, name: &str) -> RepoResult<Option<Store>>;
    /// Substring search on name, at most [`SEARCH_LIMIT`] rows.
    fn search(&self, query: &str) -> RepoResult<Vec<Store>>;
    fn create(&self, store: &NewStore) -> RepoResult<StoreId>;
    fn update(&self, id: StoreId, update: &StoreUpdate) -> RepoResult<bool>;
    fn delete(&self, id: StoreId) -> RepoResult<bool>;
}

/// SQLite-backed store repository.
pub struct SqliteStoreRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStoreRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, TableName::Stores)?;
        Ok(Self { conn })
    }
}

impl StoreRepository for SqliteStoreRepository<'_> {
    fn find_all(&self) -> RepoResult<Vec<Store>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STORE_SELECT_SQL} ORDER BY name ASC, id ASC;"))?;
        let stores = stmt
            .query_map([], parse_store_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stores)
    }

    fn find_by_id(&self, id: StoreId) -> RepoResult<Option<Store>> {
        let store = self
            .conn
            .query_row(
                &format!("{STORE_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_store_row,
            )
            .optional()?;
        Ok(store)
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<Store>> {
        let store = self
            .conn
            .query_row(
                &format!("{STORE_SELECT_SQL} WHERE name = ?1;"),
                [name],
                parse_store_row,
            )
            .optional()?;
        Ok(store)
    }

    fn search(&self, query: &str) -> RepoResult<Vec<Store>> {
        let mut stmt = self.conn.prepare(&format!(
            "{STORE_SELECT_SQL}
             WHERE name LIKE ?1 ESCAPE '\\'
             ORDER BY name ASC, id ASC
             LIMIT ?2;"
        ))?;
        let stores = stmt
            .query_map(params![like_pattern(query), SEARCH_LIMIT], parse_store_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stores)
    }

    fn create(&self, store: &NewStore) -> RepoResult<StoreId> {
        store.validate()?;
        self.conn
            .execute("INSERT INTO stores (name) VALUES (?1);", [store.name.as_str()])?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, id: StoreId, update: &StoreUpdate) -> RepoResult<bool> {
        if update.is_empty() {
            return Ok(false);
        }
        update.validate()?;

        let mut assignments = Assignments::default();
        if let Some(name) = &update.name {
            assignments.set("name", name.clone());
        }
        assignments.apply(self.conn, TableName::Stores, id, true)
    }

    fn delete(&self, id: StoreId) -> RepoResult<bool> {
        let changed = self.conn.execute("DELETE FROM stores WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }
}

fn parse_store_row(row: &Row<'_>) -> rusqlite::Result<Store> {
    Ok(Store {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
