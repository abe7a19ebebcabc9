//! Jikan API v3 client for public user manga lists.

use super::{endpoint, parse_base_url, read_response};
use crate::error::{body_snippet, PipelineError, Result};
use reqwest::{Client, Url};
use serde_json::Value;
use shared::MangaListEntry;
use tracing::{debug, info};

/// Jikan API v3 client
pub struct JikanClient {
    /// HTTP client
    http: Client,
    /// Base URL for Jikan API
    base_url: Url,
}

impl JikanClient {
    pub fn new(http: Client, base_url: &str) -> anyhow::Result<Self> {
        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
        })
    }

    /// Fetch a user's manga list, in the order the API returns it
    pub async fn user_manga_list(&self, username: &str) -> Result<Vec<MangaListEntry>> {
        let url = endpoint(&self.base_url, &["user", username, "mangalist"]);
        let url_str = url.as_str();
        let fetch_error = |reason: String| PipelineError::Fetch {
            url: url_str.to_string(),
            reason,
        };

        debug!(url = %url_str, "Fetching manga list");
        let (status, body) = read_response(self.http.get(url.clone()))
            .await
            .map_err(|e| PipelineError::http(url_str, e))?;

        if !status.is_success() {
            return Err(fetch_error(format!(
                "status {}: {}",
                status,
                body_snippet(&body)
            )));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| fetch_error(format!("response is not valid JSON: {}", e)))?;

        let manga = match value {
            Value::Object(mut fields) => fields.remove("manga"),
            _ => None,
        }
        .ok_or_else(|| fetch_error("response has no manga collection".to_string()))?;

        let entries: Vec<MangaListEntry> =
            serde_json::from_value(manga).map_err(|e| PipelineError::malformed(url_str, e))?;

        info!(username = %username, entries = entries.len(), "Fetched manga list");
        Ok(entries)
    }
}
