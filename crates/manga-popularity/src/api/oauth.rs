//! MyAnimeList OAuth2 authorization-code flow with PKCE.

use super::read_response;
use super::types::OAuthErrorBody;
use crate::error::{body_snippet, PipelineError, Result};
use crate::pkce::PkcePair;
use crate::token_store::TokenStore;
use anyhow::Context;
use chrono::Utc;
use reqwest::{Client, Url};
use shared::config::OAuthConfig;
use shared::{ChallengeMethod, Credentials, Token};
use tracing::{debug, info, warn};

/// OAuth2 client for the MyAnimeList authorization server
pub struct OAuthClient {
    /// HTTP client
    http: Client,
    /// Authorization endpoint
    authorize_url: Url,
    /// Token endpoint
    token_url: String,
    /// Client id and secret
    credentials: Credentials,
    /// Where exchanged tokens are persisted
    store: TokenStore,
}

impl OAuthClient {
    pub fn new(
        http: Client,
        config: &OAuthConfig,
        credentials: Credentials,
        store: TokenStore,
    ) -> anyhow::Result<Self> {
        let authorize_url = Url::parse(&config.authorize_url)
            .with_context(|| format!("Invalid authorize URL: {}", config.authorize_url))?;
        Url::parse(&config.token_url)
            .with_context(|| format!("Invalid token URL: {}", config.token_url))?;

        Ok(Self {
            http,
            authorize_url,
            token_url: config.token_url.clone(),
            credentials,
            store,
        })
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.store
    }

    /// URL the operator opens to authorize this client
    pub fn authorization_url(&self, pkce: &PkcePair, state: Option<&str>) -> String {
        build_authorization_url(
            &self.authorize_url,
            &self.credentials.client_id,
            pkce,
            state,
        )
    }

    /// Exchange an authorization code for a token and persist it.
    ///
    /// Nothing is written when the token endpoint rejects the code.
    pub async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<Token> {
        let url = self.token_url.as_str();
        let form = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code.trim()),
            ("code_verifier", code_verifier),
            ("grant_type", "authorization_code"),
        ];

        debug!(url = %url, "Exchanging authorization code");
        let (status, body) = read_response(self.http.post(url).form(&form))
            .await
            .map_err(|e| PipelineError::http(url, e))?;

        if !status.is_success() {
            if let Ok(details) = serde_json::from_str::<OAuthErrorBody>(&body) {
                warn!(
                    status = %status,
                    error = details.error.as_deref().unwrap_or("unknown"),
                    message = details.message.as_deref().unwrap_or(""),
                    "Token endpoint rejected the authorization code"
                );
            }
            return Err(PipelineError::AuthExchange {
                status,
                body: body_snippet(&body),
            });
        }

        let token: Token =
            serde_json::from_str(&body).map_err(|e| PipelineError::malformed(url, e))?;

        self.store.save(&token)?;

        let expires_at = token.expires_at(Utc::now());
        info!(
            token_type = %token.token_type,
            expires_in = token.expires_in,
            expires_at = ?expires_at,
            "Token generated"
        );

        Ok(token)
    }
}

/// Build the authorization URL for a client id and PKCE pair.
///
/// Pure: the same inputs always give the same string.
pub fn build_authorization_url(
    authorize_url: &Url,
    client_id: &str,
    pkce: &PkcePair,
    state: Option<&str>,
) -> String {
    let mut url = authorize_url.clone();
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("response_type", "code")
            .append_pair("client_id", client_id)
            .append_pair("code_challenge", &pkce.code_challenge);
        if pkce.method == ChallengeMethod::S256 {
            query.append_pair("code_challenge_method", pkce.method.as_str());
        }
        if let Some(state) = state {
            query.append_pair("state", state);
        }
    }
    url.into()
}
