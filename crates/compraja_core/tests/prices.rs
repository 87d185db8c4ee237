use compraja_core::db::open_db_in_memory;
use compraja_core::{
    NewPrice, NewProduct, NewStore, PriceDetailsFilter, PriceRepository, PriceUpdate,
    ProductId, ProductRepository, RepoError, SqlitePriceRepository, SqliteProductRepository,
    SqliteStoreRepository, StoreId, StoreRepository,
};
use rusqlite::Connection;

struct Fixture {
    conn: Connection,
    milk: ProductId,
    bread: ProductId,
    local: StoreId,
    market: StoreId,
}

fn setup() -> Fixture {
    let conn = open_db_in_memory().unwrap();
    let (milk, bread, local, market) = {
        let products = SqliteProductRepository::try_new(&conn).unwrap();
        let stores = SqliteStoreRepository::try_new(&conn).unwrap();
        (
            products
                .create(&NewProduct::new("Milk").with_barcode("123"))
                .unwrap(),
            products.create(&NewProduct::new("Bread")).unwrap(),
            stores.create(&NewStore::new("Local")).unwrap(),
            stores.create(&NewStore::new("Market")).unwrap(),
        )
    };
    Fixture {
        conn,
        milk,
        bread,
        local,
        market,
    }
}

fn set_captured_at(conn: &Connection, id: i64, captured_at: i64) {
    conn.execute(
        "UPDATE prices SET captured_at = ?1 WHERE id = ?2;",
        [captured_at, id],
    )
    .unwrap();
}

#[test]
fn create_applies_currency_default() {
    let fx = setup();
    let repo = SqlitePriceRepository::try_new(&fx.conn).unwrap();

    let id = repo.create(&NewPrice::new(fx.milk, fx.local, 150)).unwrap();

    let price = repo.find_by_id(id).unwrap().unwrap();
    assert_eq!(price.price_cents, 150);
    assert_eq!(price.currency, "EUR");
    assert_eq!(price.photo_uri, None);
    assert!(price.captured_at > 0);
}

#[test]
fn create_keeps_explicit_currency_and_photo() {
    let fx = setup();
    let repo = SqlitePriceRepository::try_new(&fx.conn).unwrap();

    let id = repo
        .create(
            &NewPrice::new(fx.milk, fx.local, 499)
                .with_currency("BRL")
                .with_photo("file:///receipts/1.jpg"),
        )
        .unwrap();

    let price = repo.find_by_id(id).unwrap().unwrap();
    assert_eq!(price.currency, "BRL");
    assert_eq!(price.photo_uri.as_deref(), Some("file:///receipts/1.jpg"));
}

#[test]
fn find_latest_returns_most_recent_capture() {
    let fx = setup();
    let repo = SqlitePriceRepository::try_new(&fx.conn).unwrap();

    // Insert the later observation first so id order and capture order differ.
    let t2 = repo.create(&NewPrice::new(fx.milk, fx.local, 139)).unwrap();
    let t1 = repo.create(&NewPrice::new(fx.milk, fx.local, 150)).unwrap();
    set_captured_at(&fx.conn, t1, 1_000);
    set_captured_at(&fx.conn, t2, 2_000);
    let other_store = repo
        .create(&NewPrice::new(fx.milk, fx.market, 99))
        .unwrap();
    set_captured_at(&fx.conn, other_store, 3_000);

    let latest = repo.find_latest(fx.milk, fx.local).unwrap().unwrap();
    assert_eq!(latest.id, t2);
    assert_eq!(latest.price_cents, 139);

    assert!(repo.find_latest(fx.bread, fx.local).unwrap().is_none());
}

#[test]
fn listings_are_newest_first() {
    let fx = setup();
    let repo = SqlitePriceRepository::try_new(&fx.conn).unwrap();

    let a = repo.create(&NewPrice::new(fx.milk, fx.local, 100)).unwrap();
    let b = repo.create(&NewPrice::new(fx.bread, fx.local, 200)).unwrap();
    let c = repo.create(&NewPrice::new(fx.milk, fx.market, 300)).unwrap();
    set_captured_at(&fx.conn, a, 3_000);
    set_captured_at(&fx.conn, b, 1_000);
    set_captured_at(&fx.conn, c, 2_000);

    let ids = |prices: Vec<compraja_core::Price>| -> Vec<i64> {
        prices.into_iter().map(|price| price.id).collect()
    };
    assert_eq!(ids(repo.find_all().unwrap()), vec![a, c, b]);
    assert_eq!(ids(repo.find_by_product(fx.milk).unwrap()), vec![a, c]);
    assert_eq!(ids(repo.find_by_store(fx.local).unwrap()), vec![a, b]);
}

#[test]
fn find_with_details_joins_names_and_filters() {
    let fx = setup();
    let repo = SqlitePriceRepository::try_new(&fx.conn).unwrap();

    let a = repo.create(&NewPrice::new(fx.milk, fx.local, 100)).unwrap();
    let b = repo.create(&NewPrice::new(fx.bread, fx.market, 200)).unwrap();
    set_captured_at(&fx.conn, a, 2_000);
    set_captured_at(&fx.conn, b, 1_000);

    let all = repo
        .find_with_details(&PriceDetailsFilter::default())
        .unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].price.id, a);
    assert_eq!(all[0].product_name, "Milk");
    assert_eq!(all[0].store_name, "Local");
    assert_eq!(all[1].product_name, "Bread");
    assert_eq!(all[1].store_name, "Market");

    let market_only = repo
        .find_with_details(&PriceDetailsFilter {
            store_id: Some(fx.market),
            ..PriceDetailsFilter::default()
        })
        .unwrap();
    assert_eq!(market_only.len(), 1);
    assert_eq!(market_only[0].price.id, b);

    let none = repo
        .find_with_details(&PriceDetailsFilter {
            product_id: Some(fx.milk),
            store_id: Some(fx.market),
        })
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn update_changes_fields_without_touching_timestamps() {
    let fx = setup();
    let repo = SqlitePriceRepository::try_new(&fx.conn).unwrap();

    let id = repo
        .create(&NewPrice::new(fx.milk, fx.local, 150).with_photo("a.jpg"))
        .unwrap();
    fx.conn
        .execute(
            "UPDATE prices SET captured_at = 1000, created_at = 1000 WHERE id = ?1;",
            [id],
        )
        .unwrap();

    let update = PriceUpdate {
        price_cents: Some(145),
        photo_uri: Some(None),
        ..PriceUpdate::default()
    };
    assert!(repo.update(id, &update).unwrap());

    let price = repo.find_by_id(id).unwrap().unwrap();
    assert_eq!(price.price_cents, 145);
    assert_eq!(price.currency, "EUR");
    assert_eq!(price.photo_uri, None);
    assert_eq!(price.captured_at, 1000);
    assert_eq!(price.created_at, 1000);

    assert!(!repo.update(id, &PriceUpdate::default()).unwrap());
}

#[test]
fn price_for_missing_store_is_a_foreign_key_violation() {
    let fx = setup();
    let repo = SqlitePriceRepository::try_new(&fx.conn).unwrap();

    let err = repo
        .create(&NewPrice::new(fx.milk, 9_999, 150))
        .unwrap_err();
    assert!(err.is_foreign_key_violation(), "unexpected error: {err}");
}

#[test]
fn invalid_price_payloads_are_rejected() {
    let fx = setup();
    let repo = SqlitePriceRepository::try_new(&fx.conn).unwrap();

    let negative = repo
        .create(&NewPrice::new(fx.milk, fx.local, -1))
        .unwrap_err();
    assert!(matches!(negative, RepoError::Validation(_)));

    let currency = repo
        .create(&NewPrice::new(fx.milk, fx.local, 100).with_currency("euro"))
        .unwrap_err();
    assert!(matches!(currency, RepoError::Validation(_)));

    assert!(repo.find_all().unwrap().is_empty());
}

#[test]
fn delete_reports_whether_a_row_was_removed() {
    let fx = setup();
    let repo = SqlitePriceRepository::try_new(&fx.conn).unwrap();

    let id = repo.create(&NewPrice::new(fx.milk, fx.local, 150)).unwrap();
    assert!(repo.delete(id).unwrap());
    assert!(!repo.delete(id).unwrap());
}

#[test]
fn price_update_keeps_clear_requests_through_json() {
    let fx = setup();
    let repo = SqlitePriceRepository::try_new(&fx.conn).unwrap();

    let id = repo
        .create(&NewPrice::new(fx.milk, fx.local, 150).with_photo("a.jpg"))
        .unwrap();

    let update = PriceUpdate {
        photo_uri: Some(None),
        ..PriceUpdate::default()
    };
    let json = serde_json::to_string(&update).unwrap();
    assert_eq!(json, r#"{"price_cents":null,"currency":null,"photo_uri":null}"#);

    let decoded: PriceUpdate = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, update);
    assert!(repo.update(id, &decoded).unwrap());
    assert_eq!(repo.find_by_id(id).unwrap().unwrap().photo_uri, None);

    let empty = serde_json::to_string(&PriceUpdate::default()).unwrap();
    let decoded_empty: PriceUpdate = serde_json::from_str(&empty).unwrap();
    assert_eq!(decoded_empty, PriceUpdate::default());
}
