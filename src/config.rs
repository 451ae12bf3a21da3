//! Runtime configuration for file output

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory artifacts are written to when no explicit path is given.
    pub output_dir: PathBuf,
    /// Replace existing files instead of refusing to write.
    pub overwrite: bool,
}

impl Config {
    pub fn new(output_dir: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            overwrite,
        }
    }

    /// Where an artifact with the given file name lands.
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(".", false)
    }
}
