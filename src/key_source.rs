//! Sources of candidate key material

use crate::error::{ErrorCategory, ErrorKind, FernboxError, Result};
use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// Trait for reading candidate key material from various sources
pub trait KeySource {
    /// Read candidate key material as raw bytes. Nothing is validated here.
    ///
    /// Returns the material wrapped in `Zeroizing` to ensure it is securely
    /// wiped from memory when dropped.
    fn read_key_material(&mut self) -> Result<Zeroizing<Vec<u8>>>;

    /// Short description used in log lines.
    fn describe(&self) -> String;
}

/// Returns fixed key material (pasted text, tests)
pub struct ConstantKeySource {
    material: Zeroizing<Vec<u8>>,
}

impl ConstantKeySource {
    pub fn new(material: Vec<u8>) -> Self {
        Self {
            material: Zeroizing::new(material),
        }
    }
}

impl KeySource for ConstantKeySource {
    fn read_key_material(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new((*self.material).clone()))
    }

    fn describe(&self) -> String {
        "pasted key".to_string()
    }
}

/// Reads key material from any io::Read source
pub struct ReaderKeySource {
    reader: Box<dyn Read>,
}

impl ReaderKeySource {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl KeySource for ReaderKeySource {
    fn read_key_material(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let mut data = Zeroizing::new(Vec::new());
        self.reader.read_to_end(&mut data).map_err(|e| {
            FernboxError::with_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("error reading key: {}", e),
                e,
            )
        })?;
        Ok(data)
    }

    fn describe(&self) -> String {
        "key from stream".to_string()
    }
}

/// Reads key material from a key file such as an exported `key.txt`
pub struct FileKeySource {
    path: PathBuf,
}

impl FileKeySource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl KeySource for FileKeySource {
    fn read_key_material(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        fs::read(&self.path).map(Zeroizing::new).map_err(|e| {
            let category = if e.kind() == io::ErrorKind::NotFound {
                ErrorCategory::User
            } else {
                ErrorCategory::Internal
            };
            FernboxError::with_source(
                category,
                ErrorKind::KeyUnavailable,
                format!("failed to read key from {}", self.path.display()),
                e,
            )
        })
    }

    fn describe(&self) -> String {
        format!("key file {}", self.path.display())
    }
}

/// Reads a pasted key from the terminal with no echo
pub struct TerminalKeySource;

impl TerminalKeySource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalKeySource {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySource for TerminalKeySource {
    fn read_key_material(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        if !io::stdin().is_terminal() {
            return Err(FernboxError::new(
                ErrorCategory::User,
                ErrorKind::KeyUnavailable,
                "cannot read key from terminal - stdin is not a terminal",
            ));
        }

        io::stderr().write_all(b"Paste key (fernbox): ").map_err(|e| {
            FernboxError::with_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to write prompt: {}", e),
                e,
            )
        })?;
        io::stderr().flush().map_err(|e| {
            FernboxError::with_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to flush prompt: {}", e),
                e,
            )
        })?;

        // Read *without echo*; rpassword hands back a plain String.
        let pasted = rpassword::read_password().map_err(|e| {
            FernboxError::with_source(
                ErrorCategory::Internal,
                ErrorKind::KeyUnavailable,
                format!("failure reading key: {}", e),
                e,
            )
        })?;

        Ok(Zeroizing::new(pasted.into_bytes()))
    }

    fn describe(&self) -> String {
        "key pasted at terminal".to_string()
    }
}
