use crate::catalog::{image_url, size, MovieSummary};
use crate::error::{Error, Result};
use crate::store::{DocumentStore, SearchRecord};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Number of entries shown on the trending rail.
pub const TRENDING_RAIL_SIZE: usize = 5;

/// Counts how often each search term is used. The count is advisory: two
/// concurrent searches for the same term may both read `n` and write `n + 1`.
#[derive(Clone)]
pub struct TrendingCounter {
    store: Arc<dyn DocumentStore>,
}

pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

/// Document ids are length and charset limited, so terms are keyed by digest.
pub fn search_doc_id(key: &str) -> String {
    let digest = hex::encode(Sha256::digest(key.as_bytes()));
    digest.chars().take(32).collect()
}

impl TrendingCounter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn record_search(&self, term: &str, movie: &MovieSummary) -> Result<SearchRecord> {
        let key = normalize_term(term);
        let doc_id = search_doc_id(&key);

        match self.store.get_search(&doc_id).await {
            Ok(existing) => self.increment(&doc_id, &existing).await,
            Err(Error::NotFound(_)) => {
                let record = SearchRecord {
                    search_term: key,
                    count: 1,
                    movie_id: movie.id,
                    poster_url: image_url(movie.poster_path.as_deref(), size::POSTER_LARGE)
                        .unwrap_or_default(),
                };
                match self.store.create_search(&doc_id, &record).await {
                    // Someone else created it between our read and write.
                    Err(Error::Duplicate(_)) => {
                        let existing = self.store.get_search(&doc_id).await?;
                        self.increment(&doc_id, &existing).await
                    }
                    other => other,
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn increment(&self, doc_id: &str, existing: &SearchRecord) -> Result<SearchRecord> {
        let next = existing.count.saturating_add(1);
        debug!(term = %existing.search_term, count = next, "bumping search counter");
        self.store.update_search_count(doc_id, next).await
    }

    /// Fire-and-forget variant: returns at once, failures only reach the log.
    pub fn spawn_record_search(&self, term: &str, movie: &MovieSummary) -> JoinHandle<()> {
        let counter = self.clone();
        let term = term.to_string();
        let movie = movie.clone();
        tokio::spawn(async move {
            if let Err(err) = counter.record_search(&term, &movie).await {
                warn!("Failed to update search count for '{}': {}", term, err);
            }
        })
    }

    pub async fn top(&self, limit: usize) -> Result<Vec<SearchRecord>> {
        self.store.top_searches(limit).await
    }
}
