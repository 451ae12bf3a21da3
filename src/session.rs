//! The session-scoped key slot
//!
//! A `Session` owns at most one key. There is no process-wide key: every
//! caller that needs isolation creates its own `Session`.

use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::error::{FernboxError, Result};
use crate::key::Key;
use crate::key_source::KeySource;

#[derive(Debug, Default)]
pub struct Session {
    key: Option<Key>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current key. The previous key, if any, is wiped on drop.
    pub fn set_current(&mut self, key: Key) {
        self.install(key);
    }

    fn install(&mut self, key: Key) -> &Key {
        if self.key.is_some() {
            info!("session key replaced");
        } else {
            info!("session key set");
        }
        self.key.insert(key)
    }

    pub fn clear_current(&mut self) {
        if self.key.take().is_some() {
            info!("session key cleared");
        }
    }

    pub fn current(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    /// The current key, or `MissingKey`.
    pub fn require_current(&self) -> Result<&Key> {
        self.key.as_ref().ok_or_else(FernboxError::missing_key)
    }

    /// Generate a fresh key and make it current.
    pub fn generate(&mut self) -> &Key {
        info!("generating new session key");
        self.install(Key::generate())
    }

    /// Read candidate material from `source`, validate it and make it current.
    ///
    /// Surrounding ASCII whitespace is ignored, so a pasted key or a key file
    /// with a trailing newline is accepted. On any failure the slot is left
    /// untouched.
    pub fn load(&mut self, source: &mut dyn KeySource) -> Result<&Key> {
        let material = source.read_key_material()?;
        let candidate = Zeroizing::new(material.trim_ascii().to_vec());
        if candidate.is_empty() {
            return Err(FernboxError::empty_input("no key material supplied"));
        }
        let key = Key::validate(&candidate).inspect_err(|_| {
            warn!(source = %source.describe(), "rejected invalid key");
        })?;
        info!(source = %source.describe(), "loaded key");
        Ok(self.install(key))
    }
}
