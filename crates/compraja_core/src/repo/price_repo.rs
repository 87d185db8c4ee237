//! Price observation repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Record and query product prices per store.
//! - Answer the "current price" question for a product/store pair.
//!
//! # Invariants
//! - Every listing is ordered newest first: `captured_at DESC, id DESC`.
//! - `update` refreshes no timestamp; `created_at` and `captured_at` keep
//!   their creation values.

use crate::db::schema::TableName;
use crate::model::price::{
    NewPrice, Price, PriceDetailsFilter, PriceId, PriceUpdate, PriceWithDetails,
};
use crate::model::product::ProductId;
use crate::model::store::StoreId;
use crate::repo::{ensure_connection_ready, Assignments, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const PRICE_SELECT_SQL: &str = "SELECT
    id,
    product_id,
    store_id,
    price_cents,
    currency,
    captured_at,
    photo_uri,
    created_at
FROM prices";

/// Repository interface for price observations.
pub trait PriceRepository {
    fn find_all(&self) -> RepoResult<Vec<Price>>;
    fn find_by_id(&self, id: PriceId) -> RepoResult<Option<Price>>;
    /// Price history of one product across stores.
    fn find_by_product(&self, product_id: ProductId) -> RepoResult<Vec<Price>>;
    fn find_by_store(&self, store_id: StoreId) -> RepoResult<Vec<Price>>;
    /// Most recently captured price for one product at one store.
    fn find_latest(&self, product_id: ProductId, store_id: StoreId)
        -> RepoResult<Option<Price>>;
    /// Price history joined with product and store names.
    fn find_with_details(&self, filter: &PriceDetailsFilter) -> RepoResult<Vec<PriceWithDetails>>;
    fn create(&self, price: &NewPrice) -> RepoResult<PriceId>;
    /// Applies populated fields; never refreshes a timestamp.
    fn update(&self, id: PriceId, update: &PriceUpdate) -> RepoResult<bool>;
    fn delete(&self, id: PriceId) -> RepoResult<bool>;
}

/// SQLite-backed price repository.
pub struct SqlitePriceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePriceRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, TableName::Prices)?;
        Ok(Self { conn })
    }

    fn query_prices(&self, filter_sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Price>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PRICE_SELECT_SQL} {filter_sql} ORDER BY captured_at DESC, id DESC;"
        ))?;
        let prices = stmt
            .query_map(params_from_iter(bind_values), parse_price_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(prices)
    }
}

impl PriceRepository for SqlitePriceRepository<'_> {
    fn find_all(&self) -> RepoResult<Vec<Price>> {
        self.query_prices("", Vec::new())
    }

    fn find_by_id(&self, id: PriceId) -> RepoResult<Option<Price>> {
        let price = self
            .conn
            .query_row(
                &format!("{PRICE_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_price_row,
            )
            .optional()?;
        Ok(price)
    }

    fn find_by_product(&self, product_id: ProductId) -> RepoResult<Vec<Price>> {
        self.query_prices("WHERE product_id = ?", vec![Value::Integer(product_id)])
    }

    fn find_by_store(&self, store_id: StoreId) -> RepoResult<Vec<Price>> {
        self.query_prices("WHERE store_id = ?", vec![Value::Integer(store_id)])
    }

    fn find_latest(
        &self,
        product_id: ProductId,
        store_id: StoreId,
    ) -> RepoResult<Option<Price>> {
        let price = self
            .conn
            .query_row(
                &format!(
                    "{PRICE_SELECT_SQL}
                     WHERE product_id = ?1 AND store_id = ?2
                     ORDER BY captured_at DESC, id DESC
                     LIMIT 1;"
                ),
                [product_id, store_id],
                parse_price_row,
            )
            .optional()?;
        Ok(price)
    }

    fn find_with_details(&self, filter: &PriceDetailsFilter) -> RepoResult<Vec<PriceWithDetails>> {
        let mut sql = String::from(
            "SELECT
                p.id AS id,
                p.product_id AS product_id,
                p.store_id AS store_id,
                p.price_cents AS price_cents,
                p.currency AS currency,
                p.captured_at AS captured_at,
                p.photo_uri AS photo_uri,
                p.created_at AS created_at,
                pr.name AS product_name,
                s.name AS store_name
             FROM prices p
             INNER JOIN products pr ON pr.id = p.product_id
             INNER JOIN stores s ON s.id = p.store_id
             WHERE 1 = 1",
        );
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(product_id) = filter.product_id {
            sql.push_str(" AND p.product_id = ?");
            bind_values.push(Value::Integer(product_id));
        }
        if let Some(store_id) = filter.store_id {
            sql.push_str(" AND p.store_id = ?");
            bind_values.push(Value::Integer(store_id));
        }
        sql.push_str(" ORDER BY p.captured_at DESC, p.id DESC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let details = stmt
            .query_map(params_from_iter(bind_values), |row| {
                Ok(PriceWithDetails {
                    price: parse_price_row(row)?,
                    product_name: row.get("product_name")?,
                    store_name: row.get("store_name")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(details)
    }

    fn create(&self, price: &NewPrice) -> RepoResult<PriceId> {
        price.validate()?;

        self.conn.execute(
            "INSERT INTO prices (
                product_id,
                store_id,
                price_cents,
                currency,
                photo_uri
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                price.product_id,
                price.store_id,
                price.price_cents,
                price.currency_or_default(),
                price.photo_uri.as_deref(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, id: PriceId, update: &PriceUpdate) -> RepoResult<bool> {
        if update.is_empty() {
            return Ok(false);
        }
        update.validate()?;

        let mut assignments = Assignments::default();
        if let Some(price_cents) = update.price_cents {
            assignments.set("price_cents", price_cents);
        }
        if let Some(currency) = &update.currency {
            assignments.set("currency", currency.clone());
        }
        if let Some(photo_uri) = &update.photo_uri {
            assignments.set("photo_uri", photo_uri.clone());
        }
        // No `updated_at` column; `captured_at` keeps the capture time.
        assignments.apply(self.conn, TableName::Prices, id, false)
    }

    fn delete(&self, id: PriceId) -> RepoResult<bool> {
        let changed = self.conn.execute("DELETE FROM prices WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }
}

fn parse_price_row(row: &Row<'_>) -> rusqlite::Result<Price> {
    Ok(Price {
        id: row.get("id")?,
        product_id: row.get("product_id")?,
        store_id: row.get("store_id")?,
        price_cents: row.get("price_cents")?,
        currency: row.get("currency")?,
        captured_at: row.get("captured_at")?,
        photo_uri: row.get("photo_uri")?,
        created_at: row.get("created_at")?,
    })
}
