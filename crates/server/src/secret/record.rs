//! [`SecretRecord`]: the stored form of one secret.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::crypto::Sealed;

/// One stored secret.
///
/// Records are immutable once created: there is no update path, only
/// creation, lookup and deletion.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretRecord {
    /// Canonical hyphenated UUID v4; the lookup key embedded in the URL.
    pub id: String,
    /// AES-256-GCM-SIV ciphertext (payload + tag).
    pub ciphertext: Vec<u8>,
    /// Per-record random IV. Kept as raw bytes so that a malformed stored
    /// value is reported by the cipher rather than the store.
    pub iv: Vec<u8>,
    /// The record is unreachable at and after this instant.
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl SecretRecord {
    /// Build a record with a fresh id from `sealed`, created at `now` and
    /// expiring `ttl` later.
    pub fn new(sealed: Sealed, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ciphertext: sealed.ciphertext,
            iv: sealed.iv.to_vec(),
            expires_at: now + ttl,
            created_at: now,
        }
    }

    /// Returns `true` once `now` has reached `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRecord")
            .field("id", &self.id)
            .field("ciphertext_len", &self.ciphertext.len())
            .field("expires_at", &self.expires_at)
            .field("created_at", &self.created_at)
            .finish()
    }
}
