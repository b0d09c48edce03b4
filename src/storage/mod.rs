//! Key-value storage port
//!
//! Products overrides, orders and sessions are stored as JSON strings under
//! well-known keys. Readers treat a missing key as empty and skip records
//! that fail to parse, logging them rather than failing the whole load.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgKeyValueStore;

/// Well-known storage keys
pub mod keys {
    pub const ADMIN_PRODUCTS: &str = "admin-products";
    pub const LATEST_ORDER: &str = "latest-order";
    pub const ORDER_PREFIX: &str = "order-";
    pub const ADMIN_SESSION: &str = "admin-session";
    pub const USER_SESSION: &str = "pharmacy_user";
    pub const DEMO_USER: &str = "demoUser";

    pub fn order(id: &str) -> String { format!("{ORDER_PREFIX}{id}") }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
    /// Entries whose key starts with `prefix`, ordered by key.
    async fn list(&self, prefix: &str) -> Result<Vec<(String, String)>, StorageError>;
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("could not serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Reads and parses `key`; malformed JSON is logged and reported as absent.
pub async fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key).await? else { return Ok(None) };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(error) => {
            tracing::warn!(key, %error, "skipping malformed record");
            Ok(None)
        }
    }
}

pub async fn write_json<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), StorageError> {
    store.set(key, serde_json::to_string(value)?).await
}

/// Parses every entry under `prefix`, skipping the ones that do not parse.
pub async fn read_all_json<T: DeserializeOwned>(store: &dyn KeyValueStore, prefix: &str) -> Result<Vec<T>, StorageError> {
    let entries = store.list(prefix).await?;
    Ok(entries.into_iter().filter_map(|(key, raw)| match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(%key, %error, "skipping malformed record");
            None
        }
    }).collect())
}

/// Parses `key` as a JSON array element by element. Elements that do not
/// parse are skipped; `None` means the key is missing or is not an array.
pub async fn read_json_list<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<Vec<T>>, StorageError> {
    let Some(raw) = read_json::<serde_json::Value>(store, key).await? else { return Ok(None) };
    let serde_json::Value::Array(elements) = raw else {
        tracing::warn!(key, "expected a JSON array, ignoring record");
        return Ok(None);
    };
    Ok(Some(elements.into_iter().enumerate().filter_map(|(index, element)| match serde_json::from_value(element) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(key, index, %error, "skipping malformed list element");
            None
        }
    }).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note { text: String }

    #[tokio::test]
    async fn test_missing_key_reads_as_none() {
        let store = MemoryStore::new();
        assert_eq!(read_json::<Note>(&store, "nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_malformed_record_reads_as_none() {
        let store = MemoryStore::new();
        store.set("note", "{not json".into()).await.unwrap();
        assert_eq!(read_json::<Note>(&store, "note").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_all_skips_bad_records() {
        let store = MemoryStore::new();
        write_json(&store, "order-1", &Note { text: "a".into() }).await.unwrap();
        store.set("order-2", "garbage".into()).await.unwrap();
        store.set("order-3", r#"{"other": 1}"#.into()).await.unwrap();
        write_json(&store, "order-4", &Note { text: "b".into() }).await.unwrap();
        write_json(&store, "latest-order", &Note { text: "c".into() }).await.unwrap();

        let notes: Vec<Note> = read_all_json(&store, keys::ORDER_PREFIX).await.unwrap();
        assert_eq!(notes, vec![Note { text: "a".into() }, Note { text: "b".into() }]);
    }

    #[tokio::test]
    async fn test_read_list_keeps_valid_elements() {
        let store = MemoryStore::new();
        store.set("notes", r#"[{"text": "a"}, {"text": 7}, "junk", {"text": "b"}]"#.into()).await.unwrap();
        let notes: Option<Vec<Note>> = read_json_list(&store, "notes").await.unwrap();
        assert_eq!(notes, Some(vec![Note { text: "a".into() }, Note { text: "b".into() }]));

        store.set("object", r#"{"text": "a"}"#.into()).await.unwrap();
        assert_eq!(read_json_list::<Note>(&store, "object").await.unwrap(), None);
        assert_eq!(read_json_list::<Note>(&store, "missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_backend_errors_propagate() {
        let mut store = MockKeyValueStore::new();
        store.expect_get().returning(|_| Err(StorageError::Unavailable("down".into())));
        assert!(matches!(read_json::<Note>(&store, "note").await, Err(StorageError::Unavailable(_))));
    }

    #[test]
    fn test_order_key() {
        assert_eq!(keys::order("ORD-1"), "order-ORD-1");
    }
}
