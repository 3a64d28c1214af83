//! Input bounds for create and retrieve requests.
//!
//! Empty strings count as absent: an empty `passphrase` on create selects token
//! mode, and the empty `?passphrase=` slot of a passphrase-mode URL counts as
//! no key at all.

use std::fmt;

use chrono::Duration;
use ots_common::{
    protocol::{CreateSecretRequest, RetrieveSecretQuery},
    FieldErrors, ServiceError,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use zeroize::Zeroizing;

use crate::crypto::KeyMaterial;

/// Maximum payload length in bytes.
pub const MAX_SECRET_LENGTH: usize = 255;

/// Maximum passphrase / token length in bytes.
pub const MAX_PASSPHRASE_LENGTH: usize = 255;

/// Shortest allowed time-to-live, in minutes.
pub const MIN_TTL_MINUTES: i64 = 5;

/// Longest allowed time-to-live, in minutes (one day).
pub const MAX_TTL_MINUTES: i64 = 60 * 24;

/// Time-to-live applied when `expires_in` is omitted.
pub const DEFAULT_TTL_MINUTES: i64 = 60;

/// A create request that passed validation, with its TTL resolved.
pub struct NewSecret {
    pub payload: Zeroizing<String>,
    pub passphrase: Option<Zeroizing<String>>,
    pub ttl: Duration,
}

impl fmt::Debug for NewSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewSecret")
            .field("payload_len", &self.payload.len())
            .field("passphrase", &self.passphrase.as_ref().map(|_| "[REDACTED]"))
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Read a create request out of a JSON body, typing each known field.
///
/// A field of the wrong JSON type is reported under its own name, together
/// with any rule failures on the other fields. `null` counts as absent.
pub fn parse_create(body: Value) -> Result<CreateSecretRequest, FieldErrors> {
    let mut fields = match body {
        Value::Object(fields) => fields,
        _ => {
            let mut errors = FieldErrors::new();
            errors.add("body", "The request body must be a JSON object.");
            return Err(errors);
        }
    };

    let mut errors = FieldErrors::new();
    let req = CreateSecretRequest {
        password: typed_field(&mut fields, "password", "a string", &mut errors),
        passphrase: typed_field(&mut fields, "passphrase", "a string", &mut errors),
        expires_in: typed_field(&mut fields, "expires_in", "an integer", &mut errors),
    };
    if errors.is_empty() {
        return Ok(req);
    }

    if let Err(rule_errors) = validate_create(req) {
        for field in rule_errors.fields() {
            if errors.contains(field) {
                continue;
            }
            for message in rule_errors.get(field).unwrap_or_default() {
                errors.add(field, message.clone());
            }
        }
    }
    Err(errors)
}

fn typed_field<T: DeserializeOwned>(
    fields: &mut Map<String, Value>,
    name: &str,
    kind: &str,
    errors: &mut FieldErrors,
) -> Option<T> {
    let value = fields.remove(name)?;
    match serde_json::from_value::<Option<T>>(value) {
        Ok(typed) => typed,
        Err(_) => {
            errors.add(name, format!("The {name} field must be {kind}."));
            None
        }
    }
}

/// Validate a create request, collecting every failing field.
pub fn validate_create(req: CreateSecretRequest) -> Result<NewSecret, FieldErrors> {
    let mut errors = FieldErrors::new();

    let payload = filled(req.password).map(Zeroizing::new);
    match &payload {
        None => errors.add("password", "The password field is required."),
        Some(p) if p.len() > MAX_SECRET_LENGTH => errors.add(
            "password",
            format!("The password field must not be greater than {MAX_SECRET_LENGTH} bytes."),
        ),
        Some(_) => {}
    }

    let passphrase = filled(req.passphrase).map(Zeroizing::new);
    if let Some(p) = &passphrase {
        check_key_length("passphrase", p, &mut errors);
    }

    let ttl_minutes = req.expires_in.unwrap_or(DEFAULT_TTL_MINUTES);
    if ttl_minutes < MIN_TTL_MINUTES {
        errors.add(
            "expires_in",
            format!("The expires_in field must be at least {MIN_TTL_MINUTES}."),
        );
    } else if ttl_minutes > MAX_TTL_MINUTES {
        errors.add(
            "expires_in",
            format!("The expires_in field must not be greater than {MAX_TTL_MINUTES}."),
        );
    }

    errors.into_result()?;
    Ok(NewSecret {
        // Present: a missing payload was recorded as an error above.
        payload: payload.unwrap_or_default(),
        passphrase,
        ttl: Duration::minutes(ttl_minutes),
    })
}

/// Resolve the decryption key from a retrieve query.
///
/// # Errors
///
/// - [`ServiceError::AmbiguousKey`] when both `token` and `passphrase` are given,
///   regardless of their values.
/// - [`ServiceError::Validation`] when neither is given or the key is too long.
pub fn resolve_key(query: RetrieveSecretQuery) -> Result<KeyMaterial, ServiceError> {
    let mut errors = FieldErrors::new();
    let token = filled(query.token).map(Zeroizing::new);
    let passphrase = filled(query.passphrase).map(Zeroizing::new);
    let (field, key) = match (token, passphrase) {
        (Some(_), Some(_)) => return Err(ServiceError::AmbiguousKey),
        (Some(token), None) => ("token", token),
        (None, Some(passphrase)) => ("passphrase", passphrase),
        (None, None) => {
            errors.add("token", "Either a token or a passphrase is required.");
            errors.add("passphrase", "Either a token or a passphrase is required.");
            return Err(ServiceError::Validation(errors));
        }
    };

    check_key_length(field, &key, &mut errors);
    errors.into_result()?;
    Ok(KeyMaterial::from(key.as_str()))
}

fn check_key_length(field: &str, value: &str, errors: &mut FieldErrors) {
    if value.len() > MAX_PASSPHRASE_LENGTH {
        errors.add(
            field,
            format!("The {field} field must not be greater than {MAX_PASSPHRASE_LENGTH} bytes."),
        );
    }
}

fn filled(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
