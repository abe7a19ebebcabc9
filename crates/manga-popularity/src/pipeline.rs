//! Main pipeline orchestrator.
//!
//! Runs the whole job once: authorize, resolve the user, fetch the list,
//! look up popularity, write the report. Stages run strictly in sequence
//! and the report is only written once every earlier stage succeeded.

use crate::api::{JikanClient, MalClient, OAuthClient};
use crate::console::{AuthorizationResponse, Console};
use crate::enrich::{FailurePolicy, PopularityEnricher};
use crate::error::Result;
use crate::pkce::{generate_state, PkcePair};
use crate::report::Report;
use shared::{ChallengeMethod, Config, OutputPaths, ReadingStatus, Token};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

const CODE_PROMPT: &str = "Copy-paste the Authorisation Code: ";

/// Run-level settings for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub challenge_method: ChallengeMethod,
    pub require_state: bool,
    pub workers: usize,
    pub failure_policy: FailurePolicy,
    pub report_path: PathBuf,
}

impl PipelineSettings {
    pub fn from_config(config: &Config, paths: &OutputPaths) -> Self {
        Self {
            challenge_method: config.oauth.challenge_method,
            require_state: config.oauth.require_state,
            workers: config.enrichment.workers,
            failure_policy: FailurePolicy::from_allow_partial(config.enrichment.allow_partial),
            report_path: paths.report_file(config),
        }
    }
}

/// Statistics for one run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub username: String,
    pub listed: usize,
    pub enriched: usize,
    pub skipped: usize,
    pub unscored: usize,
    pub reported: usize,
    pub by_status: BTreeMap<ReadingStatus, usize>,
    pub report_path: PathBuf,
}

pub struct PopularityPipeline<C: Console> {
    oauth: OAuthClient,
    mal: MalClient,
    jikan: JikanClient,
    console: C,
    settings: PipelineSettings,
}

impl<C: Console> PopularityPipeline<C> {
    pub fn new(
        oauth: OAuthClient,
        mal: MalClient,
        jikan: JikanClient,
        console: C,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            oauth,
            mal,
            jikan,
            console,
            settings,
        }
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    /// Run the complete pipeline
    ///
    /// 1. Authorization (operator pastes the code)
    /// 2. User resolution
    /// 3. List fetch
    /// 4. Popularity lookup
    /// 5. Report
    pub async fn run(&mut self) -> Result<PipelineStats> {
        info!("Phase 1: Authorizing with MyAnimeList");
        let token = self.authorize().await?;

        info!("Phase 2: Resolving authenticated user");
        let username = self.mal.current_user_name(&token.access_token).await?;
        self.console
            .show(&format!("\n>>> Authentication worked for: {} <<<", username))?;

        info!("Phase 3: Fetching manga list");
        let entries = self.jikan.user_manga_list(&username).await?;
        let listed = entries.len();

        info!("Phase 4: Looking up popularity");
        let enricher = PopularityEnricher::new(
            &self.mal,
            self.settings.workers,
            self.settings.failure_policy,
        );
        let enrichment = enricher.enrich(entries, &token.access_token).await?;
        let enriched = enrichment.entries.len();
        let skipped = enrichment.skipped.len();

        info!("Phase 5: Writing report");
        let report = Report::build(enrichment.entries);
        report.write_csv(&self.settings.report_path)?;

        let stats = PipelineStats {
            username,
            listed,
            enriched,
            skipped,
            unscored: report.unscored(),
            reported: report.len(),
            by_status: report.status_breakdown(),
            report_path: self.settings.report_path.clone(),
        };

        info!(
            listed = stats.listed,
            enriched = stats.enriched,
            skipped = stats.skipped,
            unscored = stats.unscored,
            reported = stats.reported,
            "Pipeline complete"
        );

        Ok(stats)
    }

    /// Walk the operator through authorization and exchange the code
    async fn authorize(&mut self) -> Result<Token> {
        let pkce = PkcePair::generate(self.settings.challenge_method);
        let state = self.settings.require_state.then(generate_state);

        let url = self.oauth.authorization_url(&pkce, state.as_deref());
        self.console.show(&format!(
            "Authorise your application by clicking here: {}\n",
            url
        ))?;

        let input = self.console.read_line(CODE_PROMPT)?;
        let code = AuthorizationResponse::parse(&input)?.verify_state(state.as_deref())?;

        let token = self.oauth.exchange_code(&code, &pkce.code_verifier).await?;
        self.console.show(&format!(
            "Token saved in \"{}\"",
            self.oauth.token_store().path().display()
        ))?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ScriptedConsole;
    use crate::error::PipelineError;
    use crate::token_store::TokenStore;
    use mockito::{Matcher, Mock, Server, ServerGuard};
    use reqwest::{Client, Url};
    use shared::config::OAuthConfig;
    use shared::Credentials;
    use std::path::Path;
    use tempfile::TempDir;

    const LIST_BODY: &str = r#"{"manga": [
        {"mal_id": 1, "title": "Unscored", "score": 0, "reading_status": 6, "chapters_read": 0},
        {"mal_id": 2, "title": "Berserk", "score": 7, "reading_status": 1, "chapters_read": 364},
        {"mal_id": 3, "title": "Vagabond", "score": 3, "reading_status": 3, "chapters_read": 327}
    ]}"#;

    struct Harness {
        server: ServerGuard,
        dir: TempDir,
        _mocks: Vec<Mock>,
    }

    impl Harness {
        async fn new() -> Self {
            let mut server = Server::new_async().await;
            let mut mocks = Vec::new();

            mocks.push(
                server
                    .mock("POST", "/oauth/token")
                    .match_body(Matcher::AllOf(vec![
                        Matcher::UrlEncoded("code".to_string(), "the-code".to_string()),
                        Matcher::UrlEncoded(
                            "grant_type".to_string(),
                            "authorization_code".to_string(),
                        ),
                        Matcher::Regex("code_verifier=[A-Za-z0-9_-]{43,128}".to_string()),
                    ]))
                    .with_status(200)
                    .with_body(
                        r#"{"token_type":"Bearer","expires_in":3600,"access_token":"acc","refresh_token":"ref"}"#,
                    )
                    .create_async()
                    .await,
            );
            mocks.push(
                server
                    .mock("GET", "/v2/users/@me")
                    .match_header("authorization", "Bearer acc")
                    .with_status(200)
                    .with_body(r#"{"id":7,"name":"reader"}"#)
                    .create_async()
                    .await,
            );
            mocks.push(
                server
                    .mock("GET", "/v3/user/reader/mangalist")
                    .with_status(200)
                    .with_body(LIST_BODY)
                    .create_async()
                    .await,
            );

            Self {
                server,
                dir: TempDir::new().unwrap(),
                _mocks: mocks,
            }
        }

        async fn popularity(&mut self, mal_id: u32, status: usize, body: &str) {
            let mock = self
                .server
                .mock("GET", format!("/v2/manga/{}", mal_id).as_str())
                .match_query(Matcher::UrlEncoded(
                    "fields".to_string(),
                    "popularity".to_string(),
                ))
                .with_status(status)
                .with_body(body)
                .create_async()
                .await;
            self._mocks.push(mock);
        }

        fn report_path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn token_path(&self) -> PathBuf {
            self.dir.path().join("token.json")
        }

        fn pipeline(
            &self,
            input: &str,
            report_name: &str,
            require_state: bool,
        ) -> PopularityPipeline<ScriptedConsole> {
            let base = self.server.url();
            let oauth_config = OAuthConfig {
                authorize_url: format!("{}/oauth/authorize", base),
                token_url: format!("{}/oauth/token", base),
                require_state,
                ..Default::default()
            };
            let credentials = Credentials::from_iter(vec![
                ("CLIENT_ID".to_string(), "client-123".to_string()),
                ("CLIENT_SECRET".to_string(), "secret-456".to_string()),
            ])
            .unwrap();

            let http = Client::new();
            let oauth = OAuthClient::new(
                http.clone(),
                &oauth_config,
                credentials,
                TokenStore::new(self.token_path()),
            )
            .unwrap();
            let mal = MalClient::new(http.clone(), &format!("{}/v2", base)).unwrap();
            let jikan = JikanClient::new(http, &format!("{}/v3", base)).unwrap();

            let settings = PipelineSettings {
                challenge_method: ChallengeMethod::Plain,
                require_state,
                workers: 2,
                failure_policy: FailurePolicy::FailFast,
                report_path: self.report_path(report_name),
            };

            PopularityPipeline::new(oauth, mal, jikan, ScriptedConsole::new([input]), settings)
        }
    }

    fn read_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn run_writes_ranked_report() {
        let mut harness = Harness::new().await;
        harness.popularity(1, 200, r#"{"id":1,"popularity":5}"#).await;
        harness.popularity(2, 200, r#"{"id":2,"popularity":9}"#).await;
        harness.popularity(3, 200, r#"{"id":3,"popularity":9}"#).await;

        let mut pipeline = harness.pipeline("the-code\n", "report.csv", false);
        let stats = pipeline.run().await.unwrap();

        assert_eq!(stats.username, "reader");
        assert_eq!(stats.listed, 3);
        assert_eq!(stats.enriched, 3);
        assert_eq!(stats.unscored, 1);
        assert_eq!(stats.reported, 2);
        assert_eq!(stats.by_status.get(&ReadingStatus::Reading), Some(&1));

        let lines = read_lines(&harness.report_path("report.csv"));
        assert_eq!(
            lines,
            vec![
                ",mal_id,title,reading_status,score,chapters_read,popularity",
                "1,2,Berserk,1,7,364,9",
                "2,3,Vagabond,3,3,327,9",
            ]
        );

        let token = TokenStore::new(harness.token_path()).load().unwrap().unwrap();
        assert_eq!(token.access_token, "acc");

        // Plain PKCE: the challenge shown to the operator is a valid verifier
        let shown = &pipeline.console().shown()[0];
        let url = shown.trim().rsplit(' ').next().unwrap();
        let challenge = Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == "code_challenge")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert!((43..=128).contains(&challenge.len()));
    }

    #[tokio::test]
    async fn run_is_idempotent() {
        let mut harness = Harness::new().await;
        harness.popularity(1, 200, r#"{"popularity":5}"#).await;
        harness.popularity(2, 200, r#"{"popularity":11}"#).await;
        harness.popularity(3, 200, r#"{"popularity":9}"#).await;

        harness
            .pipeline("the-code", "first.csv", false)
            .run()
            .await
            .unwrap();
        harness
            .pipeline("the-code", "second.csv", false)
            .run()
            .await
            .unwrap();

        let first = std::fs::read(harness.report_path("first.csv")).unwrap();
        let second = std::fs::read(harness.report_path("second.csv")).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn run_enrichment_failure_writes_no_report() {
        let mut harness = Harness::new().await;
        harness.popularity(1, 200, r#"{"popularity":5}"#).await;
        harness.popularity(2, 503, "maintenance").await;
        harness.popularity(3, 200, r#"{"popularity":9}"#).await;

        let err = harness
            .pipeline("the-code", "report.csv", false)
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Enrichment { mal_id: 2, .. }));
        assert!(!harness.report_path("report.csv").exists());
    }

    #[tokio::test]
    async fn run_without_code_stops_before_exchange() {
        let harness = Harness::new().await;

        let err = harness
            .pipeline("   ", "report.csv", false)
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::MissingAuthorizationCode));
        assert!(!harness.token_path().exists());
    }

    #[tokio::test]
    async fn run_with_required_state_rejects_bare_code() {
        let harness = Harness::new().await;

        let err = harness
            .pipeline("the-code", "report.csv", true)
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::StateMismatch));
        assert!(!harness.token_path().exists());
    }
}
