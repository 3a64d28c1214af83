//! [`SecretEngine`]: create and read-once retrieval of secrets.
//!
//! # Security invariants
//!
//! - Generated tokens are **never** persisted or logged; they exist only in the
//!   create response.
//! - A failed decryption leaves the record untouched so the key holder can retry.
//! - Plaintext is released only to the caller whose conditional delete removed
//!   the record; see [`SecretStore::delete_if_present`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ots_common::{
    protocol::{CreateSecretRequest, RetrieveSecretQuery},
    ServiceError,
};
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::record::SecretRecord;
use super::validation::{resolve_key, validate_create};
use crate::crypto::{self, KeyMaterial};
use crate::store::SecretStore;

/// Returned with passphrase-mode URLs.
pub const PASSPHRASE_NOTE: &str = "This secret requires the passphrase at the end of the URL \
    to decrypt and must be provided by the recipient.";

/// Returned with every successfully retrieved secret.
pub const DELETED_NOTE: &str = "This secret has been deleted and can no longer be retrieved.";

/// Which kind of key protects a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    /// System-generated token embedded in the URL.
    Token,
    /// User passphrase shared out-of-band.
    Passphrase,
}

/// Outcome of a successful create.
#[derive(Clone)]
pub struct CreatedSecret {
    pub id: String,
    /// Retrieval URL; in token mode this carries the only copy of the key.
    pub url: String,
    pub expires_at: DateTime<Utc>,
    pub mode: KeyMode,
}

impl CreatedSecret {
    /// Notice for the creator, present in passphrase mode only.
    pub fn note(&self) -> Option<&'static str> {
        match self.mode {
            KeyMode::Passphrase => Some(PASSPHRASE_NOTE),
            KeyMode::Token => None,
        }
    }
}

impl std::fmt::Debug for CreatedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreatedSecret")
            .field("id", &self.id)
            .field("expires_at", &self.expires_at)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// A decrypted secret whose record has already been deleted.
pub struct RevealedSecret {
    pub secret: String,
}

impl std::fmt::Debug for RevealedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RevealedSecret([REDACTED])")
    }
}

/// Orchestrates key selection, encryption, expiry and read-once deletion.
///
/// Stateless between requests and cheap to clone; all durable state lives in
/// the [`SecretStore`].
#[derive(Clone)]
pub struct SecretEngine {
    store: Arc<dyn SecretStore>,
    clock: Arc<dyn Clock>,
    public_url: Arc<str>,
}

impl SecretEngine {
    /// `public_url` is the externally visible base used to build retrieval
    /// URLs (e.g. `https://secrets.example.com`).
    pub fn new(
        store: Arc<dyn SecretStore>,
        clock: Arc<dyn Clock>,
        public_url: impl Into<String>,
    ) -> Self {
        let public_url: String = public_url.into();
        Self {
            store,
            clock,
            public_url: Arc::from(public_url.trim_end_matches('/')),
        }
    }

    /// Validate, encrypt and persist a new secret.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] naming each field out of bounds.
    /// - [`ServiceError::Internal`] if encryption or storage fails.
    #[tracing::instrument(skip_all)]
    pub async fn create(&self, req: CreateSecretRequest) -> Result<CreatedSecret, ServiceError> {
        let new = validate_create(req)?;

        let (key, token, mode) = match new.passphrase {
            Some(passphrase) => (KeyMaterial::from(passphrase.as_str()), None, KeyMode::Passphrase),
            None => {
                let token = crypto::generate_token();
                (KeyMaterial::from(token.as_str()), Some(token), KeyMode::Token)
            }
        };

        let sealed = crypto::encrypt(new.payload.as_bytes(), &key)
            .map_err(|e| ServiceError::Internal(format!("encrypt: {e}")))?;

        let record = SecretRecord::new(sealed, self.clock.now(), new.ttl);
        self.store.create(&record).await?;

        let url = match token {
            Some(token) => format!(
                "{}/secrets/{}?token={}",
                self.public_url,
                record.id,
                token.as_str()
            ),
            None => format!("{}/secrets/{}?passphrase=", self.public_url, record.id),
        };

        info!(
            secret_id = %record.id,
            mode = ?mode,
            expires_at = %record.expires_at,
            "secret created"
        );

        Ok(CreatedSecret {
            id: record.id,
            url,
            expires_at: record.expires_at,
            mode,
        })
    }

    /// Decrypt and delete the secret `id`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::AmbiguousKey`] if both a token and a passphrase are given.
    /// - [`ServiceError::Validation`] if no key, or an over-long key, is given.
    /// - [`ServiceError::NotFound`] if no record exists, including when a
    ///   concurrent retrieval deleted it first.
    /// - [`ServiceError::Expired`] once `expires_at` has passed.
    /// - [`ServiceError::InvalidKey`] if decryption fails; the record survives.
    /// - [`ServiceError::Internal`] on storage failure.
    #[tracing::instrument(skip_all, fields(secret_id = %id))]
    pub async fn retrieve(
        &self,
        id: &str,
        query: RetrieveSecretQuery,
    ) -> Result<RevealedSecret, ServiceError> {
        let key = resolve_key(query)?;

        let record = self
            .store
            .find_if_present(id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        if record.is_expired(self.clock.now()) {
            // Unreachable already; removing it here is housekeeping only.
            if let Err(e) = self.store.delete_if_present(id).await {
                warn!(error = %e, "failed to remove expired secret");
            }
            debug!("secret expired");
            return Err(ServiceError::Expired);
        }

        let plaintext = match crypto::decrypt(&record.ciphertext, &record.iv, &key) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                debug!(reason = %e, "decryption failed; secret left intact");
                return Err(ServiceError::InvalidKey);
            }
        };

        if !self.store.delete_if_present(id).await? {
            debug!("secret claimed by a concurrent retrieval");
            return Err(ServiceError::NotFound);
        }

        info!("secret retrieved and deleted");
        Ok(RevealedSecret {
            secret: String::from_utf8_lossy(&plaintext).into_owned(),
        })
    }
}
