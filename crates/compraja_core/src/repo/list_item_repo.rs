//! List item repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `list_items`.
//! - Provide the item + product display projection.
//!
//! # Invariants
//! - Items of one list are returned in creation order (`created_at, id`).
//! - `checked` is persisted as 0/1; any other value is reported as invalid data.
//! - `toggle_checked` is a single read-modify-write statement.

use crate::db::schema::{now_epoch_ms, TableName};
use crate::model::list::ListId;
use crate::model::list_item::{
    ListItem, ListItemId, ListItemUpdate, ListItemWithProduct, NewListItem, DEFAULT_QTY,
};
use crate::repo::{bool_to_int, ensure_connection_ready, int_to_bool, Assignments, RepoResult};
use rusqlite::{params, Connection, Row};

const LIST_ITEM_SELECT_SQL: &str = "SELECT
    id,
    list_id,
    product_id,
    qty,
    note,
    checked,
    created_at,
    updated_at
FROM list_items";

/// Repository interface for list items.
pub trait ListItemRepository {
    /// Returns the items of one list in creation order.
    fn find_by_list(&self, list_id: ListId) -> RepoResult<Vec<ListItem>>;
    fn find_by_id(&self, id: ListItemId) -> RepoResult<Option<ListItem>>;
    /// Returns the items of one list annotated with product name and barcode.
    fn find_with_products(&self, list_id: ListId) -> RepoResult<Vec<ListItemWithProduct>>;
    fn create(&self, item: &NewListItem) -> RepoResult<ListItemId>;
    /// Applies populated fields; `Ok(false)` when nothing was written.
    fn update(&self, id: ListItemId, update: &ListItemUpdate) -> RepoResult<bool>;
    /// Flips `checked` in place and refreshes `updated_at`.
    fn toggle_checked(&self, id: ListItemId) -> RepoResult<bool>;
    fn delete(&self, id: ListItemId) -> RepoResult<bool>;
    /// Deletes every item of one list and returns how many were removed.
    fn delete_by_list(&self, list_id: ListId) -> RepoResult<usize>;
}

/// SQLite-backed list item repository.
pub struct SqliteListItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteListItemRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, TableName::ListItems)?;
        Ok(Self { conn })
    }
}

impl ListItemRepository for SqliteListItemRepository<'_> {
    fn find_by_list(&self, list_id: ListId) -> RepoResult<Vec<ListItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{LIST_ITEM_SELECT_SQL}
             WHERE list_id = ?1
             ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([list_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_list_item_row(row)?);
        }
        Ok(items)
    }

    fn find_by_id(&self, id: ListItemId) -> RepoResult<Option<ListItem>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{LIST_ITEM_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_list_item_row(row)?));
        }
        Ok(None)
    }

    fn find_with_products(&self, list_id: ListId) -> RepoResult<Vec<ListItemWithProduct>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                li.id AS id,
                li.list_id AS list_id,
                li.product_id AS product_id,
                li.qty AS qty,
                li.note AS note,
                li.checked AS checked,
                li.created_at AS created_at,
                li.updated_at AS updated_at,
                p.name AS product_name,
                p.barcode AS product_barcode
             FROM list_items li
             LEFT JOIN products p ON p.id = li.product_id
             WHERE li.list_id = ?1
             ORDER BY li.created_at ASC, li.id ASC;",
        )?;
        let mut rows = stmt.query([list_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(ListItemWithProduct {
                item: parse_list_item_row(row)?,
                product_name: row.get("product_name")?,
                product_barcode: row.get("product_barcode")?,
            });
        }
        Ok(items)
    }

    fn create(&self, item: &NewListItem) -> RepoResult<ListItemId> {
        item.validate()?;

        self.conn.execute(
            "INSERT INTO list_items (
                list_id,
                product_id,
                qty,
                note,
                checked
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                item.list_id,
                item.product_id,
                item.qty.unwrap_or(DEFAULT_QTY),
                item.note.as_deref(),
                bool_to_int(item.checked.unwrap_or(false)),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, id: ListItemId, update: &ListItemUpdate) -> RepoResult<bool> {
        if update.is_empty() {
            return Ok(false);
        }
        update.validate()?;

        let mut assignments = Assignments::default();
        if let Some(qty) = update.qty {
            assignments.set("qty", qty);
        }
        if let Some(note) = &update.note {
            assignments.set("note", note.clone());
        }
        if let Some(checked) = update.checked {
            assignments.set("checked", bool_to_int(checked));
        }
        if let Some(product_id) = update.product_id {
            assignments.set("product_id", product_id);
        }
        assignments.apply(self.conn, TableName::ListItems, id, true)
    }

    fn toggle_checked(&self, id: ListItemId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            concat!(
                "UPDATE list_items
                 SET
                    checked = NOT checked,
                    updated_at = ",
                now_epoch_ms!(),
                "
                 WHERE id = ?1;"
            ),
            [id],
        )?;
        Ok(changed > 0)
    }

    fn delete(&self, id: ListItemId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM list_items WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }

    fn delete_by_list(&self, list_id: ListId) -> RepoResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM list_items WHERE list_id = ?1;", [list_id])?;
        Ok(removed)
    }
}

fn parse_list_item_row(row: &Row<'_>) -> RepoResult<ListItem> {
    let checked = int_to_bool(row.get("checked")?, "list_items.checked")?;

    Ok(ListItem {
        id: row.get("id")?,
        list_id: row.get("list_id")?,
        product_id: row.get("product_id")?,
        qty: row.get("qty")?,
        note: row.get("note")?,
        checked,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
