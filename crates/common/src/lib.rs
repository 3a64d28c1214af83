//! Wire types and the error taxonomy shared across the one-time secret service crates.

pub mod error;
pub mod protocol;

pub use error::{FieldErrors, ServiceError};
