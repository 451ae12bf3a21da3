//! Fernet tokens: AES-128-CBC + HMAC-SHA256
//!
//! The binary format is:
//! - version: 1 byte, always 0x80
//! - timestamp: 8 bytes (big-endian u64, seconds since the Unix epoch)
//! - iv: 16 bytes
//! - ciphertext: variable length, a positive multiple of 16 (PKCS#7 padded)
//! - hmac: 32 bytes, HMAC-SHA256 under the signing key over all of the above
//!
//! Decryption is all-or-nothing: the tag is verified before any block is
//! decrypted, and every failure surfaces as the same `InvalidToken` error.

use std::time::{SystemTime, UNIX_EPOCH};

use aes::Aes128;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use tracing::debug;

use crate::armor;
use crate::error::{ErrorCategory, ErrorKind, FernboxError, Result};
use crate::key::Key;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type HmacSha256 = Hmac<Sha256>;

/// The only token version in existence
pub const VERSION: u8 = 0x80;

/// Length of the IV in bytes
pub const IV_LEN: usize = 16;

const TIMESTAMP_LEN: usize = 8;
const BLOCK_LEN: usize = 16;
const TAG_LEN: usize = 32;
const HEADER_LEN: usize = 1 + TIMESTAMP_LEN + IV_LEN;

/// Smallest possible token: header, one padding block, tag
pub const MIN_TOKEN_LEN: usize = HEADER_LEN + BLOCK_LEN + TAG_LEN;

/// An encrypted and authenticated payload.
///
/// Constructing a `Token` never validates it; validation happens, in full,
/// in `decrypt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token(Vec<u8>);

impl Token {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Parse the text rendering of a token.
    pub fn from_base64(armored: &str) -> Result<Self> {
        armor::unwrap(armored).map(Self)
    }

    pub fn to_base64(&self) -> String {
        armor::wrap(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Creation time claimed by the (unauthenticated) header, if present.
    pub fn issued_at(&self) -> Option<u64> {
        if self.0.first() != Some(&VERSION) {
            return None;
        }
        let ts: [u8; TIMESTAMP_LEN] = self.0.get(1..1 + TIMESTAMP_LEN)?.try_into().ok()?;
        Some(u64::from_be_bytes(ts))
    }
}

fn hmac(key: &Key) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(key.signing_key()).map_err(|_| {
        FernboxError::new(
            ErrorCategory::Internal,
            ErrorKind::Unexpected,
            "failed to initialise HMAC-SHA256",
        )
    })
}

fn compute_tag(key: &Key, signed: &[u8]) -> Result<Vec<u8>> {
    let mut mac = hmac(key)?;
    mac.update(signed);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Encrypt a payload with a fresh random IV and the current time
pub fn encrypt(key: &Key, plaintext: &[u8]) -> Result<Token> {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    encrypt_at(key, plaintext, now, &iv)
}

/// Encrypt a payload with a provided timestamp and IV
///
/// This function is ONLY for testing purposes to generate deterministic output.
/// NEVER use this in production - always use `encrypt()` which generates a random IV.
pub fn encrypt_at(key: &Key, plaintext: &[u8], timestamp: u64, iv: &[u8; IV_LEN]) -> Result<Token> {
    let ciphertext = Aes128CbcEnc::new(key.encryption_key().into(), iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut output = Vec::with_capacity(HEADER_LEN + ciphertext.len() + TAG_LEN);
    output.push(VERSION);
    output.extend_from_slice(&timestamp.to_be_bytes());
    output.extend_from_slice(iv);
    output.extend_from_slice(&ciphertext);

    let tag = compute_tag(key, &output)?;
    output.extend_from_slice(&tag);

    Ok(Token(output))
}

/// Verify and decrypt a token
pub fn decrypt(key: &Key, token: &Token) -> Result<Vec<u8>> {
    let data = token.as_bytes();

    if data.len() < MIN_TOKEN_LEN || (data.len() - HEADER_LEN - TAG_LEN) % BLOCK_LEN != 0 {
        debug!(len = data.len(), "rejecting token with impossible length");
        return Err(FernboxError::invalid_token());
    }
    if data[0] != VERSION {
        debug!(version = data[0], "rejecting token with unknown version");
        return Err(FernboxError::invalid_token());
    }

    let (signed, tag) = data.split_at(data.len() - TAG_LEN);
    let mut mac = hmac(key)?;
    mac.update(signed);
    if mac.verify_slice(tag).is_err() {
        debug!("rejecting token whose tag does not verify");
        return Err(FernboxError::invalid_token());
    }

    let iv: [u8; IV_LEN] = signed[1 + TIMESTAMP_LEN..HEADER_LEN]
        .try_into()
        .map_err(|_| FernboxError::invalid_token())?;
    let ciphertext = &signed[HEADER_LEN..];

    Aes128CbcDec::new(key.encryption_key().into(), &iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| {
            debug!("rejecting authenticated token with bad padding");
            FernboxError::invalid_token()
        })
}
