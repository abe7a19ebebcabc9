//! Clients for the remote APIs used by the pipeline.
//!
//! - [`OAuthClient`]: MyAnimeList OAuth2 authorization and token exchange
//! - [`MalClient`]: authenticated MyAnimeList API v2 lookups
//! - [`JikanClient`]: public manga lists from the Jikan API v3

pub mod jikan;
pub mod mal;
pub mod oauth;
pub mod types;

pub use jikan::JikanClient;
pub use mal::MalClient;
pub use oauth::{build_authorization_url, OAuthClient};
pub use types::*;

use anyhow::{anyhow, Context};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use shared::config::HttpConfig;
use std::time::Duration;

/// Build the HTTP client shared by every API client in a run
pub fn http_client(config: &HttpConfig) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(config.user_agent.as_str())
        .build()
        .context("Failed to create HTTP client")
}

/// Parse a configured base URL that further path segments get appended to
pub(crate) fn parse_base_url(base_url: &str) -> anyhow::Result<Url> {
    let url = Url::parse(base_url).with_context(|| format!("Invalid base URL: {}", base_url))?;
    if url.cannot_be_a_base() {
        return Err(anyhow!("URL cannot be used as a base: {}", base_url));
    }
    Ok(url)
}

/// Append path segments to a base URL, percent-encoding each one
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Send a request and read the whole body regardless of status
pub(crate) async fn read_response(
    request: RequestBuilder,
) -> Result<(StatusCode, String), reqwest::Error> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;
    Ok((status, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        assert!(http_client(&HttpConfig::default()).is_ok());
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let base = parse_base_url("https://api.jikan.moe/v3").unwrap();
        assert_eq!(
            endpoint(&base, &["user", "some one", "mangalist"]).as_str(),
            "https://api.jikan.moe/v3/user/some%20one/mangalist"
        );

        let with_slash = parse_base_url("http://127.0.0.1:1234/").unwrap();
        assert_eq!(
            endpoint(&with_slash, &["users", "@me"]).as_str(),
            "http://127.0.0.1:1234/users/@me"
        );
    }

    #[test]
    fn test_parse_base_url_rejects_garbage() {
        assert!(parse_base_url("not a url").is_err());
        assert!(parse_base_url("mailto:someone@example.com").is_err());
    }
}
