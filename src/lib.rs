//! fernbox - key-based text and file encryption with Fernet tokens

#![forbid(unsafe_code)]

pub mod armor;
pub mod config;
pub mod error;
pub mod file_ops;
pub mod key;
pub mod key_source;
pub mod logging;
pub mod session;
pub mod shell;
pub mod token;
pub mod workflow;

pub use error::{ErrorCategory, ErrorKind, FernboxError, Result};
pub use key::Key;
pub use session::Session;
pub use token::Token;
pub use workflow::{Artifact, Mode, Request, Upload};
