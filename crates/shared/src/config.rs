//! Configuration management for the manga-popularity workspace.
//!
//! Settings are loaded from a TOML file with sensible defaults for every
//! section. OAuth client credentials never live in the file: they are read
//! from the process environment into [`Credentials`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory settings
    #[serde(default)]
    pub data: DataConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// OAuth2 settings
    #[serde(default)]
    pub oauth: OAuthConfig,

    /// MyAnimeList API settings
    #[serde(default)]
    pub mal_api: MalApiConfig,

    /// Jikan API settings
    #[serde(default)]
    pub jikan: JikanConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Popularity enrichment settings
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// Report output settings
    #[serde(default)]
    pub report: ReportConfig,
}

/// Data directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Root data directory path
    pub root_dir: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log directory path (relative to data directory or absolute)
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// PKCE code challenge method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeMethod {
    /// Challenge equals the verifier (the only method MyAnimeList accepts)
    #[default]
    Plain,
    /// Challenge is base64url(SHA-256(verifier))
    S256,
}

impl ChallengeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeMethod::Plain => "plain",
            ChallengeMethod::S256 => "S256",
        }
    }
}

/// OAuth2 configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Authorization endpoint, opened by the operator in a browser
    pub authorize_url: String,

    /// Token endpoint
    pub token_url: String,

    /// PKCE challenge method
    pub challenge_method: ChallengeMethod,

    /// Send a random `state` and require it back with the authorization code
    pub require_state: bool,

    /// Token file (relative to the working directory or absolute)
    pub token_file: String,
}

/// MyAnimeList API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MalApiConfig {
    /// MyAnimeList API v2 base URL
    pub base_url: String,
}

/// Jikan API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JikanConfig {
    /// Jikan API v3 base URL
    pub base_url: String,
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// User agent sent with every request
    pub user_agent: String,
}

/// Popularity enrichment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Maximum number of popularity lookups in flight
    pub workers: usize,

    /// Skip entries whose lookup failed instead of aborting the run
    pub allow_partial: bool,
}

/// Report output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Report file (relative to the working directory or absolute)
    pub file_name: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root_dir: "data".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            default_level: "info".to_string(),
            console: true,
            file: true,
            json_format: false,
        }
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            authorize_url: "https://myanimelist.net/v1/oauth2/authorize".to_string(),
            token_url: "https://myanimelist.net/v1/oauth2/token".to_string(),
            challenge_method: ChallengeMethod::Plain,
            require_state: false,
            token_file: "token.json".to_string(),
        }
    }
}

impl Default for MalApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.myanimelist.net/v2".to_string(),
        }
    }
}

impl Default for JikanConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.jikan.moe/v3".to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: "manga-popularity/0.1.0".to_string(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            allow_partial: false,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            file_name: "population_list.csv".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            logging: LoggingConfig::default(),
            oauth: OAuthConfig::default(),
            mal_api: MalApiConfig::default(),
            jikan: JikanConfig::default(),
            http: HttpConfig::default(),
            enrichment: EnrichmentConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration saved successfully"
        );

        Ok(())
    }

    /// Get the path for the data directory
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.root_dir)
    }

    /// Get the path for the log directory
    pub fn log_dir(&self) -> PathBuf {
        let log_path = Path::new(&self.logging.log_dir);
        if log_path.is_absolute() {
            log_path.to_path_buf()
        } else {
            self.data_dir().join(log_path)
        }
    }
}

/// Credential loading failure. Always fatal at startup.
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("missing required environment variable {0}")]
    Missing(String),

    #[error("invalid credentials in environment: {0}")]
    Invalid(String),
}

/// OAuth2 client credentials
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

impl Credentials {
    /// Read `CLIENT_ID` and `CLIENT_SECRET` from the process environment
    pub fn from_env() -> Result<Self, CredentialsError> {
        Self::from_iter(std::env::vars())
    }

    /// Read credentials from an explicit list of variables
    pub fn from_iter<I>(vars: I) -> Result<Self, CredentialsError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let credentials: Credentials = envy::from_iter(vars).map_err(|e| match e {
            envy::Error::MissingValue(field) => {
                CredentialsError::Missing(field.to_ascii_uppercase())
            }
            other => CredentialsError::Invalid(other.to_string()),
        })?;

        if credentials.client_id.trim().is_empty() {
            return Err(CredentialsError::Missing("CLIENT_ID".to_string()));
        }
        if credentials.client_secret.trim().is_empty() {
            return Err(CredentialsError::Missing("CLIENT_SECRET".to_string()));
        }

        Ok(credentials)
    }
}
