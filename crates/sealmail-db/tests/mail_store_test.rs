//! Integration tests for the mail stores.
//!
//! PostgreSQL tests are ignored by default. Run them against a scratch
//! database with: `DATABASE_URL=... cargo test -p sealmail-db -- --ignored`

use sealmail_core::{MailStore, NewMail, ServerConfig, StoreBackend};
use sealmail_db::{
    create_pool, open_store, MemoryMailStore, PgMailStore, PoolConfig, DEFAULT_TEST_DATABASE_URL,
};

async fn pg_store() -> PgMailStore {
    dotenvy::dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_TEST_DATABASE_URL.to_string());
    let pool = create_pool(&database_url, PoolConfig::new().max_connections(2))
        .await
        .expect("Failed to connect to test database");
    let store = PgMailStore::new(pool);
    store.ensure_schema().await.expect("Failed to create schema");
    store
}

/// Recipient unique to one test run so parallel runs do not collide.
fn unique_recipient(tag: &str) -> String {
    format!("{}-{}", tag, chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

async fn exercise_store(store: &dyn MailStore, recipient: &str) {
    let first = store
        .store(NewMail::new("alice", recipient, "line one\nline two".into()))
        .await
        .unwrap();
    let second = store
        .store(NewMail::new("carol", recipient, "second".into()))
        .await
        .unwrap();
    assert!(second > first);

    let list = store.list_by_recipient(recipient).await.unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].id, first);
    assert_eq!(list[1].sender, "carol");

    let mail = store.fetch_by_id(recipient, first).await.unwrap().unwrap();
    assert_eq!(mail.body, "line one\nline two");
    assert_eq!(mail.sender, "alice");
    assert!(store.fetch_by_id("someone-else", first).await.unwrap().is_none());

    assert!(store.delete(recipient, first).await.unwrap());
    assert!(!store.delete(recipient, first).await.unwrap());
    assert!(store.fetch_by_id(recipient, first).await.unwrap().is_none());
    assert_eq!(store.list_by_recipient(recipient).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_memory_store_lifecycle() {
    let store = MemoryMailStore::new();
    exercise_store(&store, "bob").await;
}

#[tokio::test]
async fn test_open_store_memory_backend() {
    let config = ServerConfig {
        store: StoreBackend::Memory,
        ..ServerConfig::default()
    };
    let store = open_store(&config).await.unwrap();

    let id = store.store(NewMail::new("a", "b", "c".into())).await.unwrap();
    assert_eq!(id, 1);
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_pg_store_lifecycle() {
    let store = pg_store().await;
    exercise_store(&store, &unique_recipient("pg-lifecycle")).await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_pg_ensure_schema_is_repeatable() {
    let store = pg_store().await;
    store.ensure_schema().await.unwrap();
    store.ensure_schema().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_pg_body_preserved_byte_exact() {
    let store = pg_store().await;
    let recipient = unique_recipient("pg-bytes");
    let body = "SM1-SIG AAAA\nSM1-IV BBBB\nSM1-KEY CCCC\nSM1-DATA DDDD".to_string();

    let id = store
        .store(NewMail::new("alice", recipient.as_str(), body.clone()))
        .await
        .unwrap();
    let mail = store.fetch_by_id(&recipient, id).await.unwrap().unwrap();

    assert_eq!(mail.body, body);
    assert_eq!(mail.body.len(), body.len());
}
