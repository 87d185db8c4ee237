//! Declarative schema for the shopping-list store.
//!
//! # Responsibility
//! - Declare the current schema version, table DDL and index DDL.
//! - Provide the table enumeration shared by migrations and diagnostics.
//!
//! # Invariants
//! - Every statement is idempotent (`IF NOT EXISTS`).
//! - `TableName::ALL` lists parents before children; `DROP_ORDER` is the
//!   reverse dependency order.
//! - Timestamps are INTEGER Unix epoch milliseconds assigned by SQLite.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Schema version installed by the migrations compiled into this crate.
pub const SCHEMA_VERSION: u32 = 1;

/// Name of the version tracking table.
pub const SCHEMA_VERSION_TABLE: &str = "schema_version";

/// SQL expression yielding the current time as epoch milliseconds.
macro_rules! now_epoch_ms {
    () => {
        "CAST(ROUND((julianday('now') - 2440587.5) * 86400000.0) AS INTEGER)"
    };
}
pub(crate) use now_epoch_ms;

pub const CREATE_SCHEMA_VERSION_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);";

const CREATE_LISTS: &str = concat!(
    "CREATE TABLE IF NOT EXISTS lists (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL DEFAULT (",
    now_epoch_ms!(),
    "),
    updated_at INTEGER NOT NULL DEFAULT (",
    now_epoch_ms!(),
    ")
);"
);

const CREATE_LIST_ITEMS: &str = concat!(
    "CREATE TABLE IF NOT EXISTS list_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    list_id INTEGER NOT NULL,
    product_id INTEGER,
    qty REAL NOT NULL DEFAULT 1,
    note TEXT,
    checked INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL DEFAULT (",
    now_epoch_ms!(),
    "),
    updated_at INTEGER NOT NULL DEFAULT (",
    now_epoch_ms!(),
    "),
    FOREIGN KEY (list_id) REFERENCES lists(id) ON DELETE CASCADE,
    FOREIGN KEY (product_id) REFERENCES products(id) ON DELETE SET NULL
);"
);

const CREATE_PRODUCTS: &str = concat!(
    "CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    barcode TEXT UNIQUE,
    name TEXT NOT NULL,
    brand TEXT,
    category TEXT,
    created_at INTEGER NOT NULL DEFAULT (",
    now_epoch_ms!(),
    "),
    updated_at INTEGER NOT NULL DEFAULT (",
    now_epoch_ms!(),
    ")
);"
);

const CREATE_STORES: &str = concat!(
    "CREATE TABLE IF NOT EXISTS stores (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL DEFAULT (",
    now_epoch_ms!(),
    "),
    updated_at INTEGER NOT NULL DEFAULT (",
    now_epoch_ms!(),
    ")
);"
);

const CREATE_PRICES: &str = concat!(
    "CREATE TABLE IF NOT EXISTS prices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id INTEGER NOT NULL,
    store_id INTEGER NOT NULL,
    price_cents INTEGER NOT NULL,
    currency TEXT NOT NULL DEFAULT 'EUR',
    captured_at INTEGER NOT NULL DEFAULT (",
    now_epoch_ms!(),
    "),
    photo_uri TEXT,
    created_at INTEGER NOT NULL DEFAULT (",
    now_epoch_ms!(),
    "),
    FOREIGN KEY (product_id) REFERENCES products(id) ON DELETE CASCADE,
    FOREIGN KEY (store_id) REFERENCES stores(id) ON DELETE CASCADE
);"
);

/// Index statements applied after all tables exist.
pub const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_list_items_list_id ON list_items(list_id);",
    "CREATE INDEX IF NOT EXISTS idx_list_items_product_id ON list_items(product_id);",
    "CREATE INDEX IF NOT EXISTS idx_products_barcode ON products(barcode);",
    "CREATE INDEX IF NOT EXISTS idx_prices_product_id ON prices(product_id);",
    "CREATE INDEX IF NOT EXISTS idx_prices_store_id ON prices(store_id);",
    "CREATE INDEX IF NOT EXISTS idx_prices_captured_at ON prices(captured_at);",
];

/// Data tables owned by the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    Lists,
    ListItems,
    Products,
    Stores,
    Prices,
}

impl TableName {
    /// Creation order. Foreign keys are resolved lazily by SQLite, but
    /// parents first keeps the DDL readable in `sqlite_master`.
    pub const ALL: [TableName; 5] = [
        TableName::Lists,
        TableName::Products,
        TableName::Stores,
        TableName::ListItems,
        TableName::Prices,
    ];

    /// Dependents before the tables they reference.
    pub const DROP_ORDER: [TableName; 5] = [
        TableName::Prices,
        TableName::ListItems,
        TableName::Stores,
        TableName::Products,
        TableName::Lists,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lists => "lists",
            Self::ListItems => "list_items",
            Self::Products => "products",
            Self::Stores => "stores",
            Self::Prices => "prices",
        }
    }

    /// Idempotent `CREATE TABLE` statement for this table.
    pub fn create_sql(self) -> &'static str {
        match self {
            Self::Lists => CREATE_LISTS,
            Self::ListItems => CREATE_LIST_ITEMS,
            Self::Products => CREATE_PRODUCTS,
            Self::Stores => CREATE_STORES,
            Self::Prices => CREATE_PRICES,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|table| table.as_str() == value)
    }
}

impl Display for TableName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{TableName, INDEXES};
    use std::collections::HashSet;

    #[test]
    fn drop_order_covers_every_table_once() {
        let created: HashSet<_> = TableName::ALL.into_iter().collect();
        let dropped: HashSet<_> = TableName::DROP_ORDER.into_iter().collect();
        assert_eq!(created.len(), TableName::ALL.len());
        assert_eq!(created, dropped);
    }

    #[test]
    fn children_are_dropped_before_parents() {
        let position = |table: TableName| {
            TableName::DROP_ORDER
                .iter()
                .position(|candidate| *candidate == table)
                .unwrap()
        };
        assert!(position(TableName::Prices) < position(TableName::Products));
        assert!(position(TableName::Prices) < position(TableName::Stores));
        assert!(position(TableName::ListItems) < position(TableName::Lists));
        assert!(position(TableName::ListItems) < position(TableName::Products));
    }

    #[test]
    fn statements_are_idempotent() {
        for table in TableName::ALL {
            let sql = table.create_sql();
            assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS"));
            assert!(sql.contains(table.as_str()));
        }
        for sql in INDEXES {
            assert!(sql.starts_with("CREATE INDEX IF NOT EXISTS"));
        }
    }

    #[test]
    fn parse_matches_as_str() {
        for table in TableName::ALL {
            assert_eq!(TableName::parse(table.as_str()), Some(table));
        }
        assert_eq!(TableName::parse("schema_version"), None);
    }
}
