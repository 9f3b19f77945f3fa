//! File-backed store
//!
//! One JSON document per key. Writes go to a temporary sibling first and
//! are renamed into place, so a crash mid-write leaves the previous value.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use super::KvStore;
use crate::error::StoreError;

/// Default store directory name
const STORE_DIR: &str = "engage-client";

/// File extension of stored values
const VALUE_EXT: &str = "json";

/// Key-value store persisted under a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `base_dir` (created on first write)
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Platform app-data directory, e.g. `~/.local/share/engage-client`
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(STORE_DIR)
    }

    /// Map a key to its file, keeping keys from escaping the directory
    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' => '_',
                c => c,
            })
            .collect();
        self.base_dir.join(format!("{}.{}", name, VALUE_EXT))
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new(Self::default_dir())
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.base_dir).await?;

        let path = self.path_for(key);
        let tmp = path.with_extension(format!("{}.tmp", VALUE_EXT));
        tokio::fs::write(&tmp, value.as_bytes()).await?;
        tokio::fs::rename(&tmp, &path).await?;

        log::trace!("Persisted {} ({} bytes)", key, value.len());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_values_survive_new_instance() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("store"));

        store.set("hits.pending", "[]".to_string()).await.unwrap();

        // A fresh instance over the same directory sees the value (restart)
        let reopened = FileStore::new(temp_dir.path().join("store"));
        assert_eq!(reopened.get("hits.pending").await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_missing_key_and_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        assert!(store.get("hits.session").await.unwrap().is_none());
        store.remove("hits.session").await.unwrap();

        store.set("hits.session", "{}".to_string()).await.unwrap();
        store.remove("hits.session").await.unwrap();
        assert!(store.get("hits.session").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        store.set("auth.credentials", "1".to_string()).await.unwrap();
        store.set("auth.credentials", "2".to_string()).await.unwrap();

        assert_eq!(store.get("auth.credentials").await.unwrap().as_deref(), Some("2"));
        let files: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_keys_cannot_escape_directory() {
        let store = FileStore::new("/data");
        assert_eq!(store.path_for("../etc/passwd"), PathBuf::from("/data/.._etc_passwd.json"));
        assert_eq!(store.path_for("hits.session"), PathBuf::from("/data/hits.session.json"));
    }
}
