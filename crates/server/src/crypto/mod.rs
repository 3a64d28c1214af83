//! AES-256-GCM-SIV payload encryption primitives.
//!
//! This module is intentionally free of storage and HTTP dependencies.
//! Keys are either generated tokens or user passphrases; both are treated as
//! opaque bytes and stretched per record (see [`cipher`]).

pub mod cipher;

pub use cipher::{decrypt, encrypt, generate_token, CipherError, KeyMaterial, Sealed};
