//! Error types for the popularity pipeline.
//!
//! Every variant is fatal to the run; nothing is retried.

use reqwest::StatusCode;
use shared::CredentialsError;
use std::path::PathBuf;
use thiserror::Error;

/// Longest response body kept in an error message
const MAX_BODY_SNIPPET: usize = 512;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or invalid client credentials
    #[error("configuration error: {0}")]
    Config(#[from] CredentialsError),

    /// Token endpoint rejected the authorization code
    #[error("token exchange failed with status {status}: {body}")]
    AuthExchange { status: StatusCode, body: String },

    /// An authenticated call was rejected (usually an expired or invalid token)
    #[error("authentication failed with status {status}: {body}")]
    Auth { status: StatusCode, body: String },

    #[error("no authorization code was entered")]
    MissingAuthorizationCode,

    #[error("authorization response state does not match the state that was sent")]
    StateMismatch,

    /// Manga list could not be retrieved
    #[error("failed to fetch manga list from {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// A popularity lookup failed while failing fast
    #[error("popularity lookup failed for manga {mal_id}: {source}")]
    Enrichment {
        mal_id: u32,
        #[source]
        source: ItemError,
    },

    /// A response did not have the expected JSON shape
    #[error("malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to persist token to {path}: {source}")]
    TokenStore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write report {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("console interaction failed: {0}")]
    Console(#[from] std::io::Error),
}

impl PipelineError {
    pub(crate) fn http(url: &str, source: reqwest::Error) -> Self {
        PipelineError::Http {
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn malformed(url: &str, reason: impl ToString) -> Self {
        PipelineError::MalformedResponse {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Failure of a single popularity lookup
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("response has no popularity field")]
    MissingPopularity,

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Shorten a response body for display in an error message
pub(crate) fn body_snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_BODY_SNIPPET {
        return trimmed.to_string();
    }
    let mut snippet: String = trimmed.chars().take(MAX_BODY_SNIPPET).collect();
    snippet.push_str("...");
    snippet
}
