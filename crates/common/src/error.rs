//! Common error types shared across crates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-field validation messages, keyed by request field name.
///
/// Serialised as a plain JSON object: `{"expires_in": ["..."]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Create an empty error set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Returns `true` if no field has failed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if `field` has at least one message.
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Messages recorded against `field`, if any.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Names of all failing fields, in sorted order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Message returned when both `token` and `passphrase` are supplied.
pub const AMBIGUOUS_KEY_MESSAGE: &str =
    "Only one parameter (token or passphrase) should be provided, not both";

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::Validation`] → 422
/// - [`ServiceError::AmbiguousKey`] → 400
/// - [`ServiceError::InvalidKey`] → 401
/// - [`ServiceError::NotFound`] → 404
/// - [`ServiceError::Expired`] → 410
/// - [`ServiceError::RateLimited`] → 429
/// - [`ServiceError::Internal`] → 500
#[derive(Debug, Error)]
pub enum ServiceError {
    /// One or more request fields are missing or out of bounds.
    #[error("validation failed: {}", .0.fields().collect::<Vec<_>>().join(", "))]
    Validation(FieldErrors),

    /// Both a token and a passphrase were supplied on retrieval.
    #[error("{}", AMBIGUOUS_KEY_MESSAGE)]
    AmbiguousKey,

    /// Decryption with the supplied key failed.
    #[error("Invalid token or passphrase")]
    InvalidKey,

    /// No secret exists with the requested id.
    #[error("Secret not found")]
    NotFound,

    /// The secret exists but its time-to-live has elapsed.
    #[error("Secret has expired")]
    Expired,

    /// The caller exceeded the per-client request cap.
    #[error("Too Many Requests")]
    RateLimited,

    /// An unexpected internal error occurred (storage failure, corrupt row).
    ///
    /// The payload is for server-side logs only and is never sent to callers.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::Validation(_) => 422,
            ServiceError::AmbiguousKey => 400,
            ServiceError::InvalidKey => 401,
            ServiceError::NotFound => 404,
            ServiceError::Expired => 410,
            ServiceError::RateLimited => 429,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation_failed",
            ServiceError::AmbiguousKey => "ambiguous_key",
            ServiceError::InvalidKey => "invalid_key",
            ServiceError::NotFound => "not_found",
            ServiceError::Expired => "expired",
            ServiceError::RateLimited => "too_many_requests",
            ServiceError::Internal(_) => "internal_error",
        }
    }

    /// Human-readable description safe to expose to callers.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Validation(_) => "The given data was invalid.".into(),
            ServiceError::Internal(_) => "An internal error occurred.".into(),
            other => other.to_string(),
        }
    }

    /// Field-level detail for the error body, when the error has any.
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            ServiceError::Validation(errors) => Some(errors.clone()),
            ServiceError::AmbiguousKey => {
                let mut errors = FieldErrors::new();
                errors.add("token", AMBIGUOUS_KEY_MESSAGE);
                errors.add("passphrase", AMBIGUOUS_KEY_MESSAGE);
                Some(errors)
            }
            _ => None,
        }
    }
}

impl From<FieldErrors> for ServiceError {
    fn from(errors: FieldErrors) -> Self {
        ServiceError::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_codes() {
        assert_eq!(ServiceError::Validation(FieldErrors::new()).http_status(), 422);
        assert_eq!(ServiceError::AmbiguousKey.http_status(), 400);
        assert_eq!(ServiceError::InvalidKey.http_status(), 401);
        assert_eq!(ServiceError::NotFound.http_status(), 404);
        assert_eq!(ServiceError::Expired.http_status(), 410);
        assert_eq!(ServiceError::RateLimited.http_status(), 429);
        assert_eq!(ServiceError::Internal("x".into()).http_status(), 500);
    }

    #[test]
    fn validation_display_names_fields() {
        let mut errors = FieldErrors::new();
        errors.add("expires_in", "too large");
        errors.add("password", "required");
        let e = ServiceError::Validation(errors);
        assert_eq!(e.to_string(), "validation failed: expires_in, password");
    }

    #[test]
    fn internal_detail_is_not_public() {
        let e = ServiceError::Internal("disk I/O error on secrets.db".into());
        assert!(e.to_string().contains("secrets.db"));
        assert!(!e.public_message().contains("secrets.db"));
    }

    #[test]
    fn ambiguous_key_reports_both_fields() {
        let errors = ServiceError::AmbiguousKey.field_errors().unwrap();
        assert!(errors.contains("token"));
        assert!(errors.contains("passphrase"));
        assert!(ServiceError::NotFound.field_errors().is_none());
    }

    #[test]
    fn field_errors_serialise_as_object() {
        let mut errors = FieldErrors::new();
        errors.add("password", "The password field is required.");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["password"][0], "The password field is required.");
        assert!(errors.clone().into_result().is_err());
        assert!(FieldErrors::new().into_result().is_ok());
    }
}
