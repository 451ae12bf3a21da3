//! Symmetric keys
//!
//! A key is 32 random bytes: the first half signs tokens (HMAC-SHA256), the
//! second half encrypts them (AES-128-CBC). It is exchanged as a single
//! padded base64url string of 44 characters.

use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::armor;
use crate::error::{FernboxError, Result};

/// Length of each sub-key in bytes
pub const SUBKEY_LEN: usize = 16;

/// Length of the full key in bytes
pub const KEY_LEN: usize = 2 * SUBKEY_LEN;

#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Key {
    signing: [u8; SUBKEY_LEN],
    encryption: [u8; SUBKEY_LEN],
}

impl Key {
    /// Generate a fresh key from the operating system's CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut bytes[..]);
        Self::split(&bytes)
    }

    /// Parse candidate key material in its exported (base64url) form.
    ///
    /// The candidate is accepted only if it is canonically padded and decodes
    /// to exactly `KEY_LEN` bytes. Surrounding whitespace is the caller's
    /// business.
    pub fn validate(candidate: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(candidate)
            .map_err(|_| FernboxError::invalid_key("key must be base64url text"))?;
        if text.trim() != text {
            return Err(FernboxError::invalid_key(
                "key must not contain surrounding whitespace",
            ));
        }
        let decoded = Zeroizing::new(
            armor::decode(text)
                .map_err(|_| FernboxError::invalid_key("key is not valid base64url"))?,
        );
        Self::from_bytes(&decoded)
    }

    /// Build a key from its raw 32-byte form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: &[u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            FernboxError::invalid_key(format!(
                "key must decode to {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self::split(bytes))
    }

    fn split(bytes: &[u8; KEY_LEN]) -> Self {
        let mut signing = [0u8; SUBKEY_LEN];
        let mut encryption = [0u8; SUBKEY_LEN];
        signing.copy_from_slice(&bytes[..SUBKEY_LEN]);
        encryption.copy_from_slice(&bytes[SUBKEY_LEN..]);
        Self {
            signing,
            encryption,
        }
    }

    pub(crate) fn signing_key(&self) -> &[u8; SUBKEY_LEN] {
        &self.signing
    }

    pub(crate) fn encryption_key(&self) -> &[u8; SUBKEY_LEN] {
        &self.encryption
    }

    /// The exported form: padded base64url of signing || encryption.
    pub fn to_base64(&self) -> Zeroizing<String> {
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        bytes[..SUBKEY_LEN].copy_from_slice(&self.signing);
        bytes[SUBKEY_LEN..].copy_from_slice(&self.encryption);
        Zeroizing::new(armor::wrap(&bytes[..]))
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Key(<redacted>)")
    }
}
