//! Popularity enrichment of a fetched manga list.
//!
//! Every entry costs one authenticated lookup. Up to `workers` lookups run
//! at once, but results are consumed strictly in list order, so the output
//! and the reported failure never depend on which request finished first.

use crate::api::MalClient;
use crate::error::{ItemError, PipelineError, Result};
use futures::stream::{self, StreamExt};
use shared::{EnrichedEntry, MangaListEntry};
use tracing::{info, warn};

/// What to do when a single lookup fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abort on the first failure; no partial results
    #[default]
    FailFast,
    /// Leave the failed entry out and keep going
    SkipFailed,
}

impl FailurePolicy {
    pub fn from_allow_partial(allow_partial: bool) -> Self {
        if allow_partial {
            FailurePolicy::SkipFailed
        } else {
            FailurePolicy::FailFast
        }
    }
}

/// An entry left out under [`FailurePolicy::SkipFailed`]
#[derive(Debug)]
pub struct SkippedEntry {
    pub position: usize,
    pub mal_id: u32,
    pub title: String,
    pub error: ItemError,
}

/// Result of enriching a list
#[derive(Debug, Default)]
pub struct Enrichment {
    /// Enriched entries, in list order
    pub entries: Vec<EnrichedEntry>,
    /// Entries whose lookup failed (always empty when failing fast)
    pub skipped: Vec<SkippedEntry>,
}

pub struct PopularityEnricher<'a> {
    client: &'a MalClient,
    workers: usize,
    policy: FailurePolicy,
}

impl<'a> PopularityEnricher<'a> {
    pub fn new(client: &'a MalClient, workers: usize, policy: FailurePolicy) -> Self {
        Self {
            client,
            workers: workers.max(1),
            policy,
        }
    }

    pub async fn enrich(
        &self,
        entries: Vec<MangaListEntry>,
        access_token: &str,
    ) -> Result<Enrichment> {
        let total = entries.len();
        info!(
            entries = total,
            workers = self.workers,
            policy = ?self.policy,
            "Looking up popularity"
        );

        let client = self.client;
        let lookups = stream::iter(entries.into_iter().enumerate())
            .map(|(position, entry)| async move {
                let outcome = client.manga_popularity(entry.mal_id, access_token).await;
                (position, entry, outcome)
            })
            .buffered(self.workers);
        let mut lookups = std::pin::pin!(lookups);

        let mut enrichment = Enrichment {
            entries: Vec::with_capacity(total),
            skipped: Vec::new(),
        };

        while let Some((position, entry, outcome)) = lookups.next().await {
            let done = position + 1;
            if done % 50 == 0 || done == total {
                info!(progress = format!("{}/{}", done, total), "Looking up popularity");
            }

            match outcome {
                Ok(popularity) => enrichment.entries.push(EnrichedEntry {
                    position,
                    entry,
                    popularity,
                }),
                Err(error) => match self.policy {
                    FailurePolicy::FailFast => {
                        return Err(PipelineError::Enrichment {
                            mal_id: entry.mal_id,
                            source: error,
                        });
                    }
                    FailurePolicy::SkipFailed => {
                        warn!(
                            mal_id = entry.mal_id,
                            title = %entry.title,
                            error = %error,
                            "Popularity lookup failed, skipping entry"
                        );
                        enrichment.skipped.push(SkippedEntry {
                            position,
                            mal_id: entry.mal_id,
                            title: entry.title,
                            error,
                        });
                    }
                },
            }
        }

        info!(
            enriched = enrichment.entries.len(),
            skipped = enrichment.skipped.len(),
            "Popularity lookup complete"
        );
        Ok(enrichment)
    }
}
