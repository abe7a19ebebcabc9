//! Durable storage for the OAuth token.
//!
//! The token is written as indented JSON so the file stays human-diffable,
//! overwriting whatever a previous run left behind.

use crate::error::{PipelineError, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use shared::Token;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Token file manager
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the token, replacing any existing file
    pub fn save(&self, token: &Token) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        let content = to_indented_json(token).map_err(|e| self.io_error(e.into()))?;
        std::fs::write(&self.path, content).map_err(|e| self.io_error(e))?;

        info!(path = %self.path.display(), "Token saved");
        Ok(())
    }

    /// Read a previously saved token, if there is one
    pub fn load(&self) -> Result<Option<Token>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No saved token");
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        let token = serde_json::from_str(&content).map_err(|e| self.io_error(e.into()))?;
        Ok(Some(token))
    }

    fn io_error(&self, source: std::io::Error) -> PipelineError {
        PipelineError::TokenStore {
            path: self.path.clone(),
            source,
        }
    }
}

fn to_indented_json<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_token() -> Token {
        Token {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_in: 2678400,
            token_type: "Bearer".to_string(),
        }
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let store = TokenStore::new(temp_dir.path().join("token.json"));

        assert_eq!(store.load()?, None);
        store.save(&sample_token())?;
        assert_eq!(store.load()?, Some(sample_token()));

        Ok(())
    }

    #[test]
    fn test_file_layout_is_stable() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let store = TokenStore::new(temp_dir.path().join("token.json"));
        store.save(&sample_token())?;

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            content,
            "{\n    \"access_token\": \"access\",\n    \"refresh_token\": \"refresh\",\n    \"expires_in\": 2678400,\n    \"token_type\": \"Bearer\"\n}"
        );

        Ok(())
    }

    #[test]
    fn test_save_overwrites() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("token.json");
        std::fs::write(&path, "stale contents that are much longer than the new token file").unwrap();

        let store = TokenStore::new(&path);
        let mut token = sample_token();
        token.refresh_token = None;
        store.save(&token)?;

        assert_eq!(store.load()?, Some(token));
        Ok(())
    }

    #[test]
    fn test_save_creates_parent_dirs() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let store = TokenStore::new(temp_dir.path().join("nested/dir/token.json"));
        store.save(&sample_token())?;
        assert!(store.path().exists());
        Ok(())
    }
}
