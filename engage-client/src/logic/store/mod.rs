//! Persisted Store
//!
//! Opaque async key-value store that survives process restarts.
//! Values are JSON documents addressed by string keys.
//!
//! ## Structure
//! - `memory.rs` - In-process map (tests, web fallback)
//! - `file.rs` - One JSON file per key under a data directory

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;

/// Async key-value store
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the raw value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value stored under `key`
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Delete `key` (no-op when absent)
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Read and decode a JSON value
pub async fn load_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encode and write a JSON value
pub async fn save_json<T: Serialize + ?Sized>(
    store: &dyn KvStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, raw).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_json_helpers() {
        let store = MemoryStore::new();

        let mut map = HashMap::new();
        map.insert("open:event:e1".to_string(), 1_000_i64);
        save_json(&store, "hits.lastSent", &map).await.unwrap();

        let loaded: Option<HashMap<String, i64>> = load_json(&store, "hits.lastSent").await.unwrap();
        assert_eq!(loaded, Some(map));

        let missing: Option<HashMap<String, i64>> = load_json(&store, "nothing").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_load_json_rejects_garbage() {
        let store = MemoryStore::new();
        store.set("hits.pending", "not json".to_string()).await.unwrap();

        let result: Result<Option<Vec<String>>, _> = load_json(&store, "hits.pending").await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
