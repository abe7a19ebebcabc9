//! File path utilities for run outputs.
//!
//! The token file and the report are written relative to a base directory,
//! normally the process working directory.

use crate::config::Config;
use std::path::{Path, PathBuf};

/// Output path manager
#[derive(Debug, Clone)]
pub struct OutputPaths {
    root: PathBuf,
}

impl OutputPaths {
    /// Create a new OutputPaths with the given base directory
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Use the current working directory as the base
    pub fn from_current_dir() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    /// Get the base directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a configured file name against the base directory
    pub fn resolve(&self, file: impl AsRef<Path>) -> PathBuf {
        let file = file.as_ref();
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.root.join(file)
        }
    }

    /// Get the persisted token path
    pub fn token_file(&self, config: &Config) -> PathBuf {
        self.resolve(&config.oauth.token_file)
    }

    /// Get the report path
    pub fn report_file(&self, config: &Config) -> PathBuf {
        self.resolve(&config.report.file_name)
    }
}
