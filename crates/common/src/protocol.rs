//! Request and response types exchanged over the public HTTP API.
//!
//! Types that carry secret material (payloads, passphrases, tokens) implement
//! `Debug` by hand so that a stray `?req` in a log line never prints them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FieldErrors, ServiceError};

// ---------------------------------------------------------------------------
// Create endpoint
// ---------------------------------------------------------------------------

/// Request body for `POST /secrets`.
///
/// Every field is optional at the wire level so that a missing `password`
/// surfaces as a field-level validation error rather than a parse failure.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateSecretRequest {
    /// The secret payload. Required.
    pub password: Option<String>,
    /// Optional user-chosen key, shared with the recipient out-of-band.
    pub passphrase: Option<String>,
    /// Time-to-live in minutes.
    pub expires_in: Option<i64>,
}

impl fmt::Debug for CreateSecretRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateSecretRequest")
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("passphrase", &self.passphrase.as_ref().map(|_| "[REDACTED]"))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Successful response body for `POST /secrets`.
#[derive(Clone, Serialize, Deserialize)]
pub struct CreateSecretResponse {
    /// One-time retrieval URL. In token mode it embeds the decryption key.
    pub url: String,
    /// Instant after which the secret can no longer be retrieved.
    pub expires_at: DateTime<Utc>,
    /// Present in passphrase mode: the passphrase must travel separately.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl fmt::Debug for CreateSecretResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateSecretResponse")
            .field("url", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("note", &self.note)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Retrieve endpoint
// ---------------------------------------------------------------------------

/// Query string for `GET /secrets/{id}`: exactly one of the two keys.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieveSecretQuery {
    /// System-generated token taken from the retrieval URL.
    pub token: Option<String>,
    /// User-chosen passphrase received out-of-band.
    pub passphrase: Option<String>,
}

impl fmt::Debug for RetrieveSecretQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrieveSecretQuery")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("passphrase", &self.passphrase.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Successful response body for `GET /secrets/{id}`.
#[derive(Clone, Serialize, Deserialize)]
pub struct RetrieveSecretResponse {
    /// The decrypted payload.
    pub secret: String,
    /// Reminder that the secret is now gone.
    pub note: String,
}

impl fmt::Debug for RetrieveSecretResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrieveSecretResponse")
            .field("secret", &"[REDACTED]")
            .field("note", &self.note)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"not_found"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
    /// Field-level detail for validation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            errors: None,
        }
    }
}

impl From<&ServiceError> for ErrorResponse {
    fn from(err: &ServiceError) -> Self {
        Self {
            code: err.code().into(),
            message: err.public_message(),
            errors: err.field_errors(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /up`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process is serving.
    pub status: String,
}
