//! Rank a MyAnimeList user's manga list by popularity.
//!
//! This library authenticates against MyAnimeList with the OAuth2 PKCE flow,
//! fetches the user's manga list from the Jikan API, looks up the popularity
//! rank of every entry and writes a sorted CSV report.

pub mod api;
pub mod console;
pub mod enrich;
pub mod error;
pub mod pipeline;
pub mod pkce;
pub mod report;
pub mod token_store;

pub use api::{JikanClient, MalClient, OAuthClient};
pub use console::{AuthorizationResponse, Console, ScriptedConsole, StdConsole};
pub use enrich::{Enrichment, FailurePolicy, PopularityEnricher, SkippedEntry};
pub use error::{ItemError, PipelineError, Result};
pub use pipeline::{PipelineSettings, PipelineStats, PopularityPipeline};
pub use pkce::PkcePair;
pub use report::Report;
pub use token_store::TokenStore;
