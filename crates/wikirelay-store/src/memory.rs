//! In-process key-value store.
//!
//! Used by tests and single-process deployments. Compare-and-set is exact
//! because every operation holds the map lock.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use wikirelay_core::{KvStore, Result};

#[derive(Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        new: &[u8],
    ) -> Result<bool> {
        let mut entries = self.entries.write().await;
        if entries.get(key).map(Vec::as_slice) != expected {
            return Ok(false);
        }
        entries.insert(key.to_string(), new.to_vec());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_absent_is_distinct_from_empty() {
        let store = MemoryKvStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", b"").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_compare_and_set_on_absent_key() {
        let store = MemoryKvStore::new();
        assert!(store.compare_and_set("k", None, b"v1").await.unwrap());
        // the key now exists, so "expect absent" must fail
        assert!(!store.compare_and_set("k", None, b"v2").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some(b"v1".to_vec()));
    }

    #[tokio::test]
    async fn test_compare_and_set_stale_expected() {
        let store = MemoryKvStore::new();
        store.set("k", b"v1").await.unwrap();

        assert!(!store.compare_and_set("k", Some(b"v0"), b"v2").await.unwrap());
        assert!(store.compare_and_set("k", Some(b"v1"), b"v2").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some(b"v2".to_vec()));
    }

    #[tokio::test]
    async fn test_empty_expected_does_not_match_absent() {
        let store = MemoryKvStore::new();
        assert!(!store.compare_and_set("k", Some(b""), b"v").await.unwrap());
    }
}
