use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// In particular this means that use of Internal is never a guarantee
    /// the error is not, for example due to a user error - merely that it
    /// cannot be confidently determined by the code.
    Internal,

    /// The user provided invalid input or performed an action that is
    /// unsupported or impossible to complete.
    User,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Candidate key material is not a base64 encoding of exactly 32 bytes.
    InvalidKeyFormat,
    /// An encrypt/decrypt operation was requested with no current key.
    MissingKey,
    /// No text or file was supplied for the requested operation.
    EmptyInput,
    /// The token failed authentication, carried an unknown version, or was
    /// structurally malformed. Wrong key and corruption are not told apart.
    InvalidToken,
    /// The input could not even be parsed as candidate token bytes.
    MalformedInput,
    /// Key material could not be obtained from the configured source.
    KeyUnavailable,
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
    /// Anything else, e.g. a decrypted text payload that is not UTF-8.
    Unexpected,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct FernboxError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Specific condition tag, always provided.
    pub kind: ErrorKind,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl FernboxError {
    /// Creates a new error with a category, a kind and a display message.
    pub fn new(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that retains the originating source error.
    pub fn with_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind,
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::new(ErrorCategory::User, ErrorKind::InvalidKeyFormat, msg)
    }

    pub fn missing_key() -> Self {
        Self::new(
            ErrorCategory::User,
            ErrorKind::MissingKey,
            "no key is set; generate, paste or load a key first",
        )
    }

    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCategory::User, ErrorKind::EmptyInput, msg)
    }

    /// The single, deliberately generic token failure.
    pub fn invalid_token() -> Self {
        Self::new(
            ErrorCategory::User,
            ErrorKind::InvalidToken,
            "invalid token or wrong key",
        )
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Message suitable for showing at an interaction boundary.
    ///
    /// Internal failures are reduced to a generic line; the full chain is
    /// only available through `source_error` for diagnostics.
    pub fn user_message(&self) -> String {
        match (self.category, self.kind) {
            (_, ErrorKind::InvalidToken) => "invalid token or wrong key".to_string(),
            (ErrorCategory::Internal, ErrorKind::Unexpected) => {
                "operation failed unexpectedly".to_string()
            }
            _ => self.msg.clone(),
        }
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Wraps the current error with a higher-level message while preserving the original as source.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, FernboxError>;
