//! MyAnimeList API v2 client (bearer-authenticated).

use super::types::{MangaPopularity, UserInfo};
use super::{endpoint, parse_base_url, read_response};
use crate::error::{body_snippet, ItemError, PipelineError, Result};
use reqwest::{Client, Url};
use tracing::{debug, info};

/// MyAnimeList API v2 client
pub struct MalClient {
    /// HTTP client
    http: Client,
    /// Base URL for the v2 API
    base_url: Url,
}

impl MalClient {
    pub fn new(http: Client, base_url: &str) -> anyhow::Result<Self> {
        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
        })
    }

    /// Resolve the name of the user the access token belongs to
    pub async fn current_user_name(&self, access_token: &str) -> Result<String> {
        let url = endpoint(&self.base_url, &["users", "@me"]);
        let url_str = url.as_str();

        debug!(url = %url_str, "Resolving authenticated user");
        let (status, body) = read_response(self.http.get(url.clone()).bearer_auth(access_token))
            .await
            .map_err(|e| PipelineError::http(url_str, e))?;

        if !status.is_success() {
            return Err(PipelineError::Auth {
                status,
                body: body_snippet(&body),
            });
        }

        let user: UserInfo =
            serde_json::from_str(&body).map_err(|e| PipelineError::malformed(url_str, e))?;

        let name = user
            .name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| PipelineError::malformed(url_str, "response has no name field"))?;

        info!(username = %name, "Authenticated");
        Ok(name)
    }

    /// Look up the popularity rank of one manga
    pub async fn manga_popularity(
        &self,
        mal_id: u32,
        access_token: &str,
    ) -> std::result::Result<u32, ItemError> {
        let url = endpoint(&self.base_url, &["manga", &mal_id.to_string()]);

        let request = self
            .http
            .get(url)
            .query(&[("fields", "popularity")])
            .bearer_auth(access_token);
        let (status, body) = read_response(request).await?;

        if !status.is_success() {
            return Err(ItemError::Status {
                status,
                body: body_snippet(&body),
            });
        }

        let stats: MangaPopularity =
            serde_json::from_str(&body).map_err(|e| ItemError::Decode(e.to_string()))?;
        let popularity = stats.popularity.ok_or(ItemError::MissingPopularity)?;

        debug!(mal_id = mal_id, popularity = popularity, "Popularity fetched");
        Ok(popularity)
    }
}
