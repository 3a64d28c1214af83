//! The secret lifecycle: records, input bounds, time, and the engine that ties
//! them to the crypto and store layers.
//!
//! # Lifecycle
//!
//! 1. [`SecretEngine::create`] validates input, picks a key (the caller's
//!    passphrase or a fresh token), encrypts, and persists a [`SecretRecord`].
//! 2. [`SecretEngine::retrieve`] resolves the key, checks expiry, decrypts, and
//!    conditionally deletes; only the deleting caller sees the plaintext.
//! 3. Records nobody retrieves expire lazily at read time and are swept by the
//!    reaper in [`crate::store`].
//!
//! # Module invariants
//!
//! - **No HTTP dependencies.** Errors are [`ots_common::ServiceError`] values;
//!   mapping them to responses is the server layer's job.

pub mod clock;
pub mod engine;
pub mod record;
pub mod validation;

pub use clock::{Clock, SystemClock};
pub use engine::{SecretEngine, DELETED_NOTE};
pub use record::SecretRecord;
