//! Response types for the MyAnimeList and Jikan APIs.
//!
//! Only the fields the pipeline reads are modelled; everything else in the
//! payloads is ignored.

use serde::{Deserialize, Serialize};

/// `GET /users/@me`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: Option<u64>,
    pub name: Option<String>,
}

/// `GET /manga/{id}?fields=popularity`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MangaPopularity {
    pub id: Option<u32>,
    pub title: Option<String>,
    pub popularity: Option<u32>,
}

/// Error body returned by the MyAnimeList OAuth endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthErrorBody {
    pub error: Option<String>,
    pub message: Option<String>,
    pub hint: Option<String>,
}
