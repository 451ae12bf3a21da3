//! Text armoring for tokens and keys
//!
//! Tokens and keys travel as URL-safe base64 with `=` padding, the encoding
//! every Fernet implementation emits. The armored form is:
//! - Free of whitespace (including newlines)
//! - Safe to embed in URLs
//! - Safe to pass unescaped in a POSIX shell
//!
//! Decoding tolerates surrounding whitespace and nothing else: padding must
//! be present and canonical, as every Fernet implementation requires.

use crate::error::{ErrorCategory, ErrorKind, FernboxError, Result};
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{DecodeError, Engine, alphabet};

pub(crate) const URL_SAFE_PADDED: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
);

/// Wrap bytes in armor, returning the armored string
pub fn wrap(body: &[u8]) -> String {
    URL_SAFE_PADDED.encode(body)
}

/// Decode armored text without mapping the error.
pub(crate) fn decode(armored: &str) -> std::result::Result<Vec<u8>, DecodeError> {
    URL_SAFE_PADDED.decode(armored.trim())
}

/// Unwrap an armored token, returning the raw token bytes
///
/// Text containing characters outside the base64url alphabet is rejected as
/// `MalformedInput`. Text made of valid characters that still does not
/// decode (bad length, missing or misplaced padding) is rejected as
/// `InvalidToken`.
pub fn unwrap(armored: &str) -> Result<Vec<u8>> {
    decode(armored).map_err(|e| match e {
        DecodeError::InvalidByte(offset, _) => FernboxError::with_source(
            ErrorCategory::User,
            ErrorKind::MalformedInput,
            format!("input is not base64url text (unexpected character at offset {offset})"),
            e,
        ),
        _ => FernboxError::with_source(
            ErrorCategory::User,
            ErrorKind::InvalidToken,
            "invalid token or wrong key",
            e,
        ),
    })
}
