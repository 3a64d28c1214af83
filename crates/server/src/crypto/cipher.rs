//! AES-256-GCM-SIV encryption and decryption of secret payloads.
//!
//! **Key schedule:** every record gets a fresh 16-byte IV from the OS CSPRNG.
//! The AES key is `HMAC-SHA256(key = iv, msg = key material)`, an HKDF-extract
//! step with the IV as salt, so token and passphrase keys of any length map to
//! a 256-bit key that is unique per record. The AEAD nonce is the first
//! [`NONCE_LEN`] bytes of the IV.
//!
//! Because the mode is authenticated, decrypting under the wrong key fails the
//! tag check instead of producing plausible-looking garbage.

use std::fmt;

use aes_gcm_siv::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256GcmSiv, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

type HmacSha256 = Hmac<Sha256>;

/// Byte length of the per-record initialisation vector.
pub const IV_LEN: usize = 16;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Bytes of CSPRNG output behind each generated token.
pub const TOKEN_BYTES: usize = 32;

/// Raw key bytes: either a generated token or a user passphrase.
///
/// The buffer is zeroed on drop and never printed by `Debug`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial(Vec<u8>);

impl KeyMaterial {
    /// Wrap raw key bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for KeyMaterial {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<&str> for KeyMaterial {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial([REDACTED])")
    }
}

/// Ciphertext and the IV it was produced under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// Raw ciphertext + authentication tag bytes.
    pub ciphertext: Vec<u8>,
    /// Per-record IV.
    pub iv: [u8; IV_LEN],
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// Encryption or decryption was attempted with a zero-length key.
    #[error("key material is empty")]
    EmptyKey,

    /// The stored IV is not [`IV_LEN`] bytes.
    #[error("invalid IV length: expected {IV_LEN} bytes, got {0}")]
    InvalidIvLength(usize),

    /// The record key could not be derived.
    #[error("key derivation failed")]
    KeyDerivation,

    /// AEAD encryption failed, or decryption failed authentication
    /// (wrong key or tampered data).
    #[error("aead operation failed")]
    AeadFailure,
}

/// Encrypt `plaintext` under `key`, generating a fresh IV via the OS CSPRNG.
///
/// # Errors
///
/// Returns [`CipherError::EmptyKey`] for a zero-length key and
/// [`CipherError::AeadFailure`] on an internal AEAD error.
pub fn encrypt(plaintext: &[u8], key: &KeyMaterial) -> Result<Sealed, CipherError> {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let cipher = record_cipher(key, &iv)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv[..NONCE_LEN]), plaintext)
        .map_err(|_| CipherError::AeadFailure)?;

    Ok(Sealed { ciphertext, iv })
}

/// Decrypt `ciphertext` produced by [`encrypt`] under the same key and IV.
///
/// # Errors
///
/// Returns [`CipherError::AeadFailure`] if authentication fails (wrong key or
/// tampered data), [`CipherError::InvalidIvLength`] for a malformed IV, and
/// [`CipherError::EmptyKey`] for a zero-length key.
pub fn decrypt(ciphertext: &[u8], iv: &[u8], key: &KeyMaterial) -> Result<Vec<u8>, CipherError> {
    let iv: &[u8; IV_LEN] = iv
        .try_into()
        .map_err(|_| CipherError::InvalidIvLength(iv.len()))?;

    let cipher = record_cipher(key, iv)?;
    cipher
        .decrypt(Nonce::from_slice(&iv[..NONCE_LEN]), ciphertext)
        .map_err(|_| CipherError::AeadFailure)
}

/// Generate a fresh retrieval token: [`TOKEN_BYTES`] of CSPRNG output,
/// URL-safe base64 without padding.
pub fn generate_token() -> Zeroizing<String> {
    let mut bytes = Zeroizing::new([0u8; TOKEN_BYTES]);
    OsRng.fill_bytes(bytes.as_mut_slice());
    Zeroizing::new(URL_SAFE_NO_PAD.encode(bytes.as_slice()))
}

fn record_cipher(key: &KeyMaterial, iv: &[u8; IV_LEN]) -> Result<Aes256GcmSiv, CipherError> {
    if key.is_empty() {
        return Err(CipherError::EmptyKey);
    }
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(iv).map_err(|_| CipherError::KeyDerivation)?;
    mac.update(key.as_bytes());
    let mut derived = mac.finalize().into_bytes();

    let cipher = <Aes256GcmSiv as KeyInit>::new_from_slice(&derived)
        .map_err(|_| CipherError::KeyDerivation);
    derived.as_mut_slice().zeroize();
    cipher
}
