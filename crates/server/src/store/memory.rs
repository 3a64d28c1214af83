//! [`MemorySecretStore`]: process-local store for development and tests.
//!
//! Contents are lost on restart, which for short-lived one-time secrets is
//! often acceptable on a single-node deployment.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{SecretStore, StoreError};
use crate::secret::SecretRecord;

/// Thread-safe in-memory store.
///
/// Wraps an `Arc<RwLock<HashMap<_, _>>>`: lookups share the read lock, while
/// create and delete take the write lock, which makes
/// [`SecretStore::delete_if_present`] atomic.
#[derive(Clone, Debug, Default)]
pub struct MemorySecretStore {
    inner: Arc<RwLock<HashMap<String, SecretRecord>>>,
}

impl MemorySecretStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held, expired ones included.
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn create(&self, record: &SecretRecord) -> Result<(), StoreError> {
        let mut map = self.inner.write().await;
        if map.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id.clone()));
        }
        map.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn find_if_present(&self, id: &str) -> Result<Option<SecretRecord>, StoreError> {
        Ok(self.inner.read().await.get(id).cloned())
    }

    async fn delete_if_present(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.remove(id).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut map = self.inner.write().await;
        let before = map.len();
        map.retain(|_, record| !record.is_expired(now));
        Ok((before - map.len()) as u64)
    }
}
