//! Data models for the project.
//!
//! This module defines the data structures that flow through the pipeline:
//! the OAuth token, manga list entries from Jikan, and entries enriched
//! with a MyAnimeList popularity rank.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

const TOKEN_MASK_PREFIX_LEN: usize = 6;
const TOKEN_MASK_SUFFIX_LEN: usize = 4;

/// OAuth2 token returned by the MyAnimeList token endpoint.
///
/// Field order here is the order written to the token file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub token_type: String,
}

impl Token {
    /// Instant at which the access token expires, given when it was issued
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        Duration::try_seconds(self.expires_in).and_then(|d| issued_at.checked_add_signed(d))
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &mask_token(&self.access_token))
            .field(
                "refresh_token",
                &self.refresh_token.as_deref().map(mask_token),
            )
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Mask a secret for display, keeping a short prefix and suffix
pub fn mask_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let len = trimmed.chars().count();
    if len <= TOKEN_MASK_PREFIX_LEN + TOKEN_MASK_SUFFIX_LEN {
        return "*".repeat(len.min(8));
    }

    let prefix: String = trimmed.chars().take(TOKEN_MASK_PREFIX_LEN).collect();
    let suffix: String = trimmed.chars().skip(len - TOKEN_MASK_SUFFIX_LEN).collect();
    format!("{prefix}...{suffix}")
}

/// Reading status as numbered by the Jikan list API
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ReadingStatus {
    Reading,
    Completed,
    OnHold,
    Dropped,
    PlanToRead,
    /// Any code this tool does not know about, kept as-is
    Other(u8),
}

impl From<u8> for ReadingStatus {
    fn from(code: u8) -> Self {
        match code {
            1 => ReadingStatus::Reading,
            2 => ReadingStatus::Completed,
            3 => ReadingStatus::OnHold,
            4 => ReadingStatus::Dropped,
            6 => ReadingStatus::PlanToRead,
            other => ReadingStatus::Other(other),
        }
    }
}

impl From<ReadingStatus> for u8 {
    fn from(status: ReadingStatus) -> Self {
        match status {
            ReadingStatus::Reading => 1,
            ReadingStatus::Completed => 2,
            ReadingStatus::OnHold => 3,
            ReadingStatus::Dropped => 4,
            ReadingStatus::PlanToRead => 6,
            ReadingStatus::Other(code) => code,
        }
    }
}

impl fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadingStatus::Reading => write!(f, "reading"),
            ReadingStatus::Completed => write!(f, "completed"),
            ReadingStatus::OnHold => write!(f, "on_hold"),
            ReadingStatus::Dropped => write!(f, "dropped"),
            ReadingStatus::PlanToRead => write!(f, "plan_to_read"),
            ReadingStatus::Other(code) => write!(f, "status_{}", code),
        }
    }
}

/// One entry of a user's manga list, as returned by Jikan.
///
/// Fields the tool does not interpret are kept in `extra` and written to
/// the report unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MangaListEntry {
    pub mal_id: u32,
    pub title: String,
    #[serde(default)]
    pub score: f64,
    pub reading_status: ReadingStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MangaListEntry {
    /// Unscored entries (score 0) carry no ranking signal
    pub fn is_scored(&self) -> bool {
        self.score != 0.0
    }
}

/// A list entry with its popularity rank attached
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedEntry {
    /// Zero-based index of the entry in the fetched list
    pub position: usize,
    pub entry: MangaListEntry,
    pub popularity: u32,
}
