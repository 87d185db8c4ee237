//! Product catalog repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Listing and search are ordered by `name ASC, id ASC`.
//! - A duplicate non-null barcode fails with a unique constraint error.
//! - Deleting a product nulls `list_items.product_id` and deletes its prices.

use crate::db::schema::TableName;
use crate::model::product::{NewProduct, Product, ProductId, ProductUpdate, ProductWithLatestPrice};
use crate::repo::{ensure_connection_ready, like_pattern, Assignments, RepoResult, SEARCH_LIMIT};
use rusqlite::{params, Connection, OptionalExtension, Row};

const PRODUCT_SELECT_SQL: &str = "SELECT
    id,
    barcode,
    name,
    brand,
    category,
    created_at,
    updated_at
FROM products";

/// Repository interface for the product catalog.
pub trait ProductRepository {
    /// Returns all products sorted by name.
    fn find_all(&self) -> RepoResult<Vec<Product>>;
    fn find_by_id(&self, id: ProductId) -> RepoResult<Option<Product>>;
    fn find_by_barcode(&self, barcode: &str) -> RepoResult<Option<Product>>;
    /// Substring search on name, at most [`SEARCH_LIMIT`] rows.
    fn search(&self, query: &str) -> RepoResult<Vec<Product>>;
    fn create(&self, product: &NewProduct) -> RepoResult<ProductId>;
    /// Applies populated fields; `Ok(false)` when nothing was written.
    fn update(&self, id: ProductId, update: &ProductUpdate) -> RepoResult<bool>;
    fn delete(&self, id: ProductId) -> RepoResult<bool>;
    /// Returns the product with the cents of its latest captured price.
    fn find_with_latest_price(&self, id: ProductId) -> RepoResult<Option<ProductWithLatestPrice>>;
}

/// SQLite-backed product repository.
pub struct SqliteProductRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProductRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, TableName::Products)?;
        Ok(Self { conn })
    }
}

impl ProductRepository for SqliteProductRepository<'_> {
    fn find_all(&self) -> RepoResult<Vec<Product>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PRODUCT_SELECT_SQL} ORDER BY name ASC, id ASC;"))?;
        let products = stmt
            .query_map([], parse_product_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(products)
    }

    fn find_by_id(&self, id: ProductId) -> RepoResult<Option<Product>> {
        let product = self
            .conn
            .query_row(
                &format!("{PRODUCT_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_product_row,
            )
            .optional()?;
        Ok(product)
    }

    fn find_by_barcode(&self, barcode: &str) -> RepoResult<Option<Product>> {
        let product = self
            .conn
            .query_row(
                &format!("{PRODUCT_SELECT_SQL} WHERE barcode = ?1;"),
                [barcode],
                parse_product_row,
            )
            .optional()?;
        Ok(product)
    }

    fn search(&self, query: &str) -> RepoResult<Vec<Product>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PRODUCT_SELECT_SQL}
             WHERE name LIKE ?1 ESCAPE '\\'
             ORDER BY name ASC, id ASC
             LIMIT ?2;"
        ))?;
        let products = stmt
            .query_map(params![like_pattern(query), SEARCH_LIMIT], parse_product_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(products)
    }

    fn create(&self, product: &NewProduct) -> RepoResult<ProductId> {
        product.validate()?;

        self.conn.execute(
            "INSERT INTO products (barcode, name, brand, category) VALUES (?1, ?2, ?3, ?4);",
            params![
                product.barcode.as_deref(),
                product.name.as_str(),
                product.brand.as_deref(),
                product.category.as_deref(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, id: ProductId, update: &ProductUpdate) -> RepoResult<bool> {
        if update.is_empty() {
            return Ok(false);
        }
        update.validate()?;

        let mut assignments = Assignments::default();
        if let Some(barcode) = &update.barcode {
            assignments.set("barcode", barcode.clone());
        }
        if let Some(name) = &update.name {
            assignments.set("name", name.clone());
        }
        if let Some(brand) = &update.brand {
            assignments.set("brand", brand.clone());
        }
        if let Some(category) = &update.category {
            assignments.set("category", category.clone());
        }
        assignments.apply(self.conn, TableName::Products, id, true)
    }

    fn delete(&self, id: ProductId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM products WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }

    fn find_with_latest_price(&self, id: ProductId) -> RepoResult<Option<ProductWithLatestPrice>> {
        let product = self
            .conn
            .query_row(
                "SELECT
                    p.id AS id,
                    p.barcode AS barcode,
                    p.name AS name,
                    p.brand AS brand,
                    p.category AS category,
                    p.created_at AS created_at,
                    p.updated_at AS updated_at,
                    (
                        SELECT pr.price_cents
                        FROM prices pr
                        WHERE pr.product_id = p.id
                        ORDER BY pr.captured_at DESC, pr.id DESC
                        LIMIT 1
                    ) AS latest_price
                 FROM products p
                 WHERE p.id = ?1;",
                [id],
                |row| {
                    Ok(ProductWithLatestPrice {
                        product: parse_product_row(row)?,
                        latest_price: row.get("latest_price")?,
                    })
                },
            )
            .optional()?;
        Ok(product)
    }
}

fn parse_product_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get("id")?,
        barcode: row.get("barcode")?,
        name: row.get("name")?,
        brand: row.get("brand")?,
        category: row.get("category")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
