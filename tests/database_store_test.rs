mod common;

use assert_matches::assert_matches;
use common::{new_product, TestApp};
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use serde_json::json;
use std::sync::Arc;
use storefront_api::config::AppConfig;
use storefront_api::db::{self, DbConfig};
use storefront_api::entities::{record, StoredRecord};
use storefront_api::errors::StoreError;
use storefront_api::models::{Cart, Product};
use storefront_api::store::{DatabaseRecordStore, RecordStore};
use uuid::Uuid;

async fn memory_db() -> Arc<DatabaseConnection> {
    let config = DbConfig {
        url: "sqlite::memory:".to_string(),
        ..DbConfig::default()
    };
    let conn = db::establish_connection_with_config(&config)
        .await
        .expect("failed to open in-memory database");
    db::run_migrations(&conn)
        .await
        .expect("failed to run migrations in tests");
    Arc::new(conn)
}

fn product(code: &str) -> Product {
    new_product(code).into_product(Uuid::new_v4())
}

#[tokio::test]
async fn empty_table_loads_as_empty_collection() {
    let conn = memory_db().await;
    let store = DatabaseRecordStore::<Product>::new(conn);
    assert!(store.load_all().await.is_empty());
}

#[tokio::test]
async fn persist_then_load_preserves_records_and_order() {
    let conn = memory_db().await;
    let store = DatabaseRecordStore::<Product>::new(conn.clone());
    let products: Vec<Product> = ["C", "A", "B"].iter().map(|code| product(code)).collect();

    store.persist(&products).await.unwrap();
    assert_eq!(store.load_all().await, products);

    // A second persist replaces, never appends.
    store.persist(&products[1..]).await.unwrap();
    assert_eq!(store.load_all().await, products[1..].to_vec());
}

#[tokio::test]
async fn collections_are_partitioned() {
    let conn = memory_db().await;
    let products = DatabaseRecordStore::<Product>::new(conn.clone());
    let carts = DatabaseRecordStore::<Cart>::new(conn.clone());

    products.persist(&[product("P1")]).await.unwrap();
    carts
        .persist(&[Cart::new(Uuid::new_v4()), Cart::new(Uuid::new_v4())])
        .await
        .unwrap();
    carts.persist(&[]).await.unwrap();

    assert_eq!(products.load_all().await.len(), 1);
    assert!(carts.load_all().await.is_empty());
}

#[tokio::test]
async fn unique_index_violation_rolls_back() {
    let conn = memory_db().await;
    let store = DatabaseRecordStore::<Product>::new(conn);
    let original = vec![product("DUP")];
    store.persist(&original).await.unwrap();

    let clash = vec![original[0].clone(), product("DUP")];
    assert_matches!(store.persist(&clash).await, Err(StoreError::Database(_)));
    assert_eq!(store.load_all().await, original);
}

#[tokio::test]
async fn large_collections_are_written_in_batches() {
    let conn = memory_db().await;
    let store = DatabaseRecordStore::<Product>::new(conn);
    let products: Vec<Product> = (0..250).map(|i| product(&format!("B{:03}", i))).collect();

    store.persist(&products).await.unwrap();
    assert_eq!(store.load_all().await, products);
}

#[tokio::test]
async fn undecodable_rows_are_skipped() {
    let conn = memory_db().await;
    let store = DatabaseRecordStore::<Product>::new(conn.clone());
    let good = product("OK1");
    store.persist(&[good.clone()]).await.unwrap();

    StoredRecord::insert(record::ActiveModel {
        collection: Set("products".to_string()),
        id: Set(Uuid::new_v4()),
        position: Set(1),
        unique_key: Set(Some("BAD".to_string())),
        body: Set(json!({ "title": 3 })),
    })
    .exec(&*conn)
    .await
    .unwrap();

    assert_eq!(store.load_all().await, vec![good]);
}

#[tokio::test]
async fn services_run_over_the_database_backend() {
    let app = TestApp::with_database().await;
    let product = app.seed_product("DB1").await;

    let cart = app.state.services.carts.create().await.unwrap();
    let cart = app
        .state
        .services
        .carts
        .add_product(cart.id, product.id)
        .await
        .unwrap();
    assert_eq!(cart.lines[0].quantity, 1);
    assert_eq!(
        app.state.services.products.get_by_id(product.id).await.unwrap(),
        product
    );
}

#[tokio::test]
async fn app_config_selects_connection_settings() {
    let config = AppConfig {
        database_url: "sqlite::memory:".into(),
        db_max_connections: 7,
        ..AppConfig::default()
    };
    let db_config = DbConfig::from_app_config(&config);
    assert_eq!(db_config.url, "sqlite::memory:");
    assert_eq!(db_config.max_connections, 7);
}
