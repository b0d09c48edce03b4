//! Document store boundary, used for user profiles written at registration

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use crate::auth::Role;
use crate::domain::Money;
use crate::storage::StorageError;

pub const USERS: &str = "users";

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn set_document(&self, collection: &str, id: &str, fields: Value) -> Result<(), StorageError>;
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>, StorageError>;
    async fn list_documents(&self, collection: &str) -> Result<Vec<Value>, StorageError>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub wallet: Money,
    #[serde(default)]
    pub loyalty_points: u32,
}

impl UserProfile {
    pub fn new(uid: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self { uid: uid.into(), name: name.into(), email: email.into(), role: Role::User, created_at: Utc::now(), wallet: Money::ZERO, loyalty_points: 0 }
    }
}

/// Every parseable profile in the `users` collection.
pub async fn user_profiles(docs: &dyn DocumentStore) -> Result<Vec<UserProfile>, StorageError> {
    Ok(docs.list_documents(USERS).await?.into_iter().filter_map(|doc| match serde_json::from_value(doc) {
        Ok(profile) => Some(profile),
        Err(error) => {
            tracing::warn!(%error, "skipping malformed user profile");
            None
        }
    }).collect())
}

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<BTreeMap<String, BTreeMap<String, Value>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn set_document(&self, collection: &str, id: &str, fields: Value) -> Result<(), StorageError> {
        self.collections.write().await.entry(collection.to_string()).or_default().insert(id.to_string(), fields);
        Ok(())
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.collections.read().await.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn list_documents(&self, collection: &str) -> Result<Vec<Value>, StorageError> {
        Ok(self.collections.read().await.get(collection).map(|docs| docs.values().cloned().collect()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_profiles_round_trip_and_skip_malformed() {
        let docs = MemoryDocumentStore::new();
        let profile = UserProfile::new("u1", "Ada", "ada@example.com");
        docs.set_document(USERS, "u1", serde_json::to_value(&profile).unwrap()).await.unwrap();
        docs.set_document(USERS, "u2", serde_json::json!({"uid": 7})).await.unwrap();

        let stored = docs.get_document(USERS, "u1").await.unwrap().unwrap();
        assert_eq!(stored["role"], "user");
        assert_eq!(user_profiles(&docs).await.unwrap().len(), 1);
        assert!(docs.list_documents("missing").await.unwrap().is_empty());
    }
}
