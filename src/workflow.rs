//! Text and file encryption workflows
//!
//! `run` is the single entry point: it takes the session and an explicit
//! request (text or file, encrypt or decrypt) and produces an `Artifact`,
//! the named output a caller displays, saves or offers for download.

use std::fmt;

use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ErrorCategory, ErrorKind, FernboxError, Result};
use crate::key::Key;
use crate::session::Session;
use crate::token::{self, Token};

/// Suffix marking an encrypted file
pub const ENCRYPTED_SUFFIX: &str = ".enc";

/// Name used when a decrypted file's name cannot be derived
pub const FALLBACK_DECRYPTED_NAME: &str = "decrypted.bin";

pub const KEY_FILE_NAME: &str = "key.txt";
pub const ENCRYPTED_TEXT_NAME: &str = "encrypted.txt";
pub const DECRYPTED_TEXT_NAME: &str = "decrypted.txt";

pub const TEXT_MIME: &str = "text/plain";
pub const BINARY_MIME: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Encrypt,
    Decrypt,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Encrypt => f.write_str("encrypt"),
            Mode::Decrypt => f.write_str("decrypt"),
        }
    }
}

/// A file handed to the workflow: its name and full contents.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Upload {
    pub name: String,
    pub contents: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            contents,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Text { mode: Mode, text: String },
    File { mode: Mode, upload: Option<Upload> },
}

/// Output of a workflow step.
///
/// The contents may be plaintext or an exported key, so they are wiped on
/// drop.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Artifact {
    pub file_name: String,
    #[zeroize(skip)]
    pub mime: &'static str,
    pub contents: Vec<u8>,
}

impl Artifact {
    /// The contents as text, for artifacts meant to be displayed.
    pub fn as_text(&self) -> Option<&str> {
        if self.mime == TEXT_MIME {
            std::str::from_utf8(&self.contents).ok()
        } else {
            None
        }
    }
}

/// Run one request against the session's current key.
///
/// Checks happen in a fixed order: a key must be set, then a payload must be
/// present, and only then is any cryptographic work done.
pub fn run(session: &Session, request: Request) -> Result<Artifact> {
    let key = session.require_current()?;
    match request {
        Request::Text { mode, text } => {
            if text.trim().is_empty() {
                return Err(FernboxError::empty_input("please enter text first"));
            }
            match mode {
                Mode::Encrypt => encrypt_text(key, &text),
                Mode::Decrypt => decrypt_text(key, &text),
            }
        }
        Request::File { mode, upload } => {
            let upload =
                upload.ok_or_else(|| FernboxError::empty_input("please choose a file first"))?;
            match mode {
                Mode::Encrypt => encrypt_upload(key, &upload),
                Mode::Decrypt => decrypt_upload(key, &upload),
            }
        }
    }
}

/// Encrypt UTF-8 text into a displayable base64 token.
pub fn encrypt_text(key: &Key, text: &str) -> Result<Artifact> {
    let token = token::encrypt(key, text.as_bytes())?;
    info!(plaintext_len = text.len(), "encrypted text");
    Ok(Artifact {
        file_name: ENCRYPTED_TEXT_NAME.to_string(),
        mime: TEXT_MIME,
        contents: token.to_base64().into_bytes(),
    })
}

/// Decrypt a base64 token back into UTF-8 text.
pub fn decrypt_text(key: &Key, armored: &str) -> Result<Artifact> {
    let token = Token::from_base64(armored.trim())?;
    let plaintext = token::decrypt(key, &token)?;
    let text = String::from_utf8(plaintext).map_err(|e| {
        FernboxError::with_source(
            ErrorCategory::User,
            ErrorKind::Unexpected,
            "decrypted data is not UTF-8 text; decrypt it as a file instead",
            e,
        )
    })?;
    info!(plaintext_len = text.len(), "decrypted text");
    Ok(Artifact {
        file_name: DECRYPTED_TEXT_NAME.to_string(),
        mime: TEXT_MIME,
        contents: text.into_bytes(),
    })
}

/// Encrypt a file into raw token bytes named `<name>.enc`.
pub fn encrypt_upload(key: &Key, upload: &Upload) -> Result<Artifact> {
    let token = token::encrypt(key, &upload.contents)?;
    info!(name = %upload.name, plaintext_len = upload.contents.len(), "encrypted file");
    Ok(Artifact {
        file_name: encrypted_file_name(&upload.name),
        mime: BINARY_MIME,
        contents: token.into_bytes(),
    })
}

/// Decrypt an encrypted file.
///
/// Raw token bytes are expected, but a file holding the base64 text form
/// (what other Fernet tools write) is accepted too; the two cannot be
/// confused since a raw token starts with the non-ASCII version byte.
///
/// Any file is a candidate token, so a file that is neither form fails with
/// the same `InvalidToken` as a wrong key.
pub fn decrypt_upload(key: &Key, upload: &Upload) -> Result<Artifact> {
    let token = if upload.contents.first() == Some(&token::VERSION) {
        Token::from_bytes(upload.contents.clone())
    } else {
        debug!(name = %upload.name, "treating encrypted file as base64 text");
        std::str::from_utf8(&upload.contents)
            .ok()
            .and_then(|armored| Token::from_base64(armored).ok())
            .ok_or_else(|| {
                debug!(name = %upload.name, "encrypted file is not a token");
                FernboxError::invalid_token()
            })?
    };
    let plaintext = token::decrypt(key, &token)?;
    info!(name = %upload.name, plaintext_len = plaintext.len(), "decrypted file");
    Ok(Artifact {
        file_name: decrypted_file_name(&upload.name),
        mime: BINARY_MIME,
        contents: plaintext,
    })
}

/// The exported key, as a `key.txt` artifact.
pub fn key_artifact(key: &Key) -> Artifact {
    Artifact {
        file_name: KEY_FILE_NAME.to_string(),
        mime: TEXT_MIME,
        contents: key.to_base64().as_bytes().to_vec(),
    }
}

pub fn encrypted_file_name(name: &str) -> String {
    format!("{name}{ENCRYPTED_SUFFIX}")
}

pub fn decrypted_file_name(name: &str) -> String {
    match name.strip_suffix(ENCRYPTED_SUFFIX) {
        Some(stem) if !matches!(stem, "" | "." | "..") => stem.to_string(),
        _ => FALLBACK_DECRYPTED_NAME.to_string(),
    }
}
