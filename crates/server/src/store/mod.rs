//! Durable keyed storage for [`SecretRecord`]s, plus the expired-row reaper.
//!
//! # Read-once guarantee
//!
//! [`SecretStore::delete_if_present`] is the only way a record leaves the
//! store on the retrieval path. Implementations must make it a single atomic
//! conditional operation that reports whether *this* call removed the row;
//! the lifecycle engine only releases plaintext to the caller that did.

pub mod memory;
pub mod sqlite;

pub use memory::MemorySecretStore;
pub use sqlite::SqliteSecretStore;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ots_common::ServiceError;
use thiserror::Error;
use tokio::time;
use tracing::{debug, info, warn};

use crate::secret::{Clock, SecretRecord};

/// Errors produced by store adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be decoded back into a record.
    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    /// A record with this id already exists.
    #[error("duplicate secret id: {0}")]
    Duplicate(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

/// Keyed storage the lifecycle engine reads, writes and deletes through.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Persist a new record.
    async fn create(&self, record: &SecretRecord) -> Result<(), StoreError>;

    /// Load a record by id, or `None` if it is not (or no longer) stored.
    async fn find_if_present(&self, id: &str) -> Result<Option<SecretRecord>, StoreError>;

    /// Atomically delete the record if it is still stored.
    ///
    /// Returns `true` only for the call that actually removed it.
    async fn delete_if_present(&self, id: &str) -> Result<bool, StoreError>;

    /// Delete every record with `expires_at <= now`, returning how many went.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Spawn a background task that periodically purges expired records.
///
/// The first purge fires after one full interval. On failure a warning is
/// emitted and the purge is retried on the next tick.
pub fn reaper_task(
    store: Arc<dyn SecretStore>,
    clock: Arc<dyn Clock>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        // First tick fires immediately; skip it.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match store.purge_expired(clock.now()).await {
                Ok(0) => debug!("reaper found no expired secrets"),
                Ok(purged) => info!(purged, "expired secrets purged"),
                Err(e) => warn!(error = %e, "expired secret purge failed; retrying next tick"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::secret::clock::ManualClock;

    #[test]
    fn store_errors_become_internal() {
        let err: ServiceError = StoreError::Duplicate("abc".into()).into();
        assert!(matches!(err, ServiceError::Internal(ref m) if m.contains("abc")));
        assert_eq!(err.http_status(), 500);
    }

    #[tokio::test]
    async fn reaper_purges_on_each_tick() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let mut store = MockSecretStore::new();
        store.expect_purge_expired().returning(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        });

        let clock = Arc::new(ManualClock::new(Utc::now()));
        let handle = reaper_task(Arc::new(store), clock, Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn reaper_survives_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let mut store = MockSecretStore::new();
        store.expect_purge_expired().returning(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Duplicate("x".into()))
        });

        let clock = Arc::new(ManualClock::new(Utc::now()));
        let handle = reaper_task(Arc::new(store), clock, Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!handle.is_finished());
        assert!(calls.load(Ordering::SeqCst) >= 2);
        handle.abort();
    }
}
