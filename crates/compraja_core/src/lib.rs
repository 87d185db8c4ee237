//! Core persistence for CompraJa.
//! Owns the on-device schema, its migrations and the entity repositories.

pub mod db;
pub mod diagnostics;
pub mod logging;
pub mod model;
pub mod repo;

pub use db::migrations::MigrationRunner;
pub use db::schema::{TableName, SCHEMA_VERSION};
pub use db::{open_db, open_db_in_dir, open_db_in_memory, DbError, DbResult};
pub use diagnostics::{get_diagnostics, print_diagnostics, Diagnostics};
pub use logging::{default_log_level, init_logging, logging_status, LogConfig, LoggingError};
pub use model::list::{List, ListId, ListUpdate, ListWithCount, NewList};
pub use model::list_item::{
    ListItem, ListItemId, ListItemUpdate, ListItemWithProduct, NewListItem,
};
pub use model::price::{
    NewPrice, Price, PriceDetailsFilter, PriceId, PriceUpdate, PriceWithDetails,
};
pub use model::product::{NewProduct, Product, ProductId, ProductUpdate, ProductWithLatestPrice};
pub use model::store::{NewStore, Store, StoreId, StoreUpdate};
pub use model::ValidationError;
pub use repo::list_item_repo::{ListItemRepository, SqliteListItemRepository};
pub use repo::list_repo::{ListRepository, SqliteListRepository};
pub use repo::price_repo::{PriceRepository, SqlitePriceRepository};
pub use repo::product_repo::{ProductRepository, SqliteProductRepository};
pub use repo::store_repo::{SqliteStoreRepository, StoreRepository};
pub use repo::{ConstraintKind, RepoError, RepoResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
