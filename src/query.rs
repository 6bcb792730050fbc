use crate::catalog::{CatalogApi, MovieSummary, SortKey, MAX_PAGES};
use crate::error::{Error, Result};
use crate::trending::TrendingCounter;
use crate::utils::{generate_pagination, PageItem};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Search,
    Discover,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    pub term: String,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default, deserialize_with = "blank_genre_as_none")]
    pub genre: Option<u32>,
    #[serde(default)]
    pub sort: SortKey,
}

fn first_page() -> u32 {
    1
}

// The "All Genres" choice arrives as `genre=`.
fn blank_genre_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawGenre {
        Id(u32),
        Text(String),
    }

    match Option::<RawGenre>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawGenre::Id(id)) => Ok(Some(id)),
        Some(RawGenre::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(RawGenre::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid genre id '{text}'"))),
    }
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            term: String::new(),
            page: 1,
            genre: None,
            sort: SortKey::default(),
        }
    }
}

impl QueryParams {
    /// A non-blank term always wins over genre and sort.
    pub fn mode(&self) -> QueryMode {
        if self.term.trim().is_empty() {
            QueryMode::Discover
        } else {
            QueryMode::Search
        }
    }
}

/// One resolved page of movies. An empty list is a valid result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieListing {
    pub mode: QueryMode,
    pub movies: Vec<MovieSummary>,
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u64,
    #[serde(default)]
    pub pagination: Vec<PageItem>,
}

impl MovieListing {
    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }
}

/// Neighbouring page links shown on each side of the current page.
pub const PAGINATION_DELTA: u32 = 2;

pub fn clamp_total_pages(reported: u32) -> u32 {
    reported.clamp(1, MAX_PAGES)
}

fn clamp_page(page: u32, total_pages: u32) -> u32 {
    page.clamp(1, clamp_total_pages(total_pages))
}

#[derive(Clone)]
pub struct QueryOrchestrator {
    catalog: Arc<dyn CatalogApi>,
    trending: Option<TrendingCounter>,
}

impl QueryOrchestrator {
    pub fn new(catalog: Arc<dyn CatalogApi>, trending: TrendingCounter) -> Self {
        Self {
            catalog,
            trending: Some(trending),
        }
    }

    pub fn without_trending(catalog: Arc<dyn CatalogApi>) -> Self {
        Self {
            catalog,
            trending: None,
        }
    }

    pub async fn resolve_movies(&self, params: &QueryParams) -> Result<MovieListing> {
        let page = clamp_page(params.page, MAX_PAGES);
        let mode = params.mode();
        let term = params.term.trim();

        let upstream = match mode {
            QueryMode::Search => self.catalog.search_movies(term, page).await?,
            QueryMode::Discover => {
                self.catalog
                    .discover_movies(params.sort, page, params.genre)
                    .await?
            }
        };

        let total_pages = clamp_total_pages(upstream.total_pages);
        if upstream.total_pages > MAX_PAGES {
            debug!(
                reported = upstream.total_pages,
                "clamping total pages to {}", MAX_PAGES
            );
        }

        if mode == QueryMode::Search {
            if let (Some(first), Some(trending)) = (upstream.results.first(), &self.trending) {
                trending.spawn_record_search(term, first);
            }
        }

        let page = page.min(total_pages);
        Ok(MovieListing {
            mode,
            movies: upstream.results,
            page,
            total_pages,
            total_results: upstream.total_results,
            pagination: generate_pagination(page, total_pages, PAGINATION_DELTA),
        })
    }
}

/// Browse state for the movie list.
/// Invariant: `1 <= page <= total_pages <= MAX_PAGES`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    pub search_term: String,
    pub debounced_term: String,
    pub page: u32,
    pub total_pages: u32,
    pub genre: Option<u32>,
    pub sort: SortKey,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            debounced_term: String::new(),
            page: 1,
            total_pages: 1,
            genre: None,
            sort: SortKey::default(),
        }
    }
}

impl QueryState {
    pub fn params(&self) -> QueryParams {
        QueryParams {
            term: self.debounced_term.clone(),
            page: self.page,
            genre: self.genre,
            sort: self.sort,
        }
    }

    /// Raw keystrokes only; querying waits for the debounced term.
    pub fn on_search_input(&mut self, term: &str) {
        self.search_term = term.to_string();
    }

    pub fn on_debounced(&mut self, term: &str) -> QueryParams {
        if self.debounced_term != term {
            self.page = 1;
        }
        self.debounced_term = term.to_string();
        self.params()
    }

    pub fn on_page(&mut self, page: u32) -> QueryParams {
        self.page = clamp_page(page, self.total_pages);
        self.params()
    }

    pub fn on_genre(&mut self, genre: Option<u32>) -> QueryParams {
        self.genre = genre;
        self.page = 1;
        self.params()
    }

    pub fn on_sort(&mut self, sort: SortKey) -> QueryParams {
        self.sort = sort;
        self.page = 1;
        self.params()
    }

    pub fn apply(&mut self, listing: &MovieListing) {
        self.total_pages = clamp_total_pages(listing.total_pages);
        self.page = clamp_page(listing.page, self.total_pages);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Fresh { seq: u64 },
    /// A newer request was issued while this one was in flight.
    Stale { seq: u64 },
}

#[derive(Debug, Clone, Default)]
pub struct BrowserView {
    pub state: QueryState,
    pub listing: Option<MovieListing>,
    pub error: Option<Error>,
    pub loading: bool,
}

/// Drives `QueryState` through user actions and applies only the newest
/// response. In-flight fetches are never aborted, just ignored when stale.
pub struct MovieBrowser {
    orchestrator: QueryOrchestrator,
    view: Mutex<BrowserView>,
    latest: AtomicU64,
}

impl MovieBrowser {
    pub fn new(orchestrator: QueryOrchestrator) -> Self {
        Self {
            orchestrator,
            view: Mutex::new(BrowserView::default()),
            latest: AtomicU64::new(0),
        }
    }

    pub async fn snapshot(&self) -> BrowserView {
        self.view.lock().await.clone()
    }

    pub async fn search_input(&self, term: &str) {
        self.view.lock().await.state.on_search_input(term);
    }

    pub async fn load(&self) -> Result<Applied> {
        self.transition(|_| {}).await
    }

    pub async fn debounced(&self, term: &str) -> Result<Applied> {
        self.transition(|state| {
            state.on_debounced(term);
        })
        .await
    }

    pub async fn page(&self, page: u32) -> Result<Applied> {
        self.transition(|state| {
            state.on_page(page);
        })
        .await
    }

    pub async fn genre(&self, genre: Option<u32>) -> Result<Applied> {
        self.transition(|state| {
            state.on_genre(genre);
        })
        .await
    }

    pub async fn sort(&self, sort: SortKey) -> Result<Applied> {
        self.transition(|state| {
            state.on_sort(sort);
        })
        .await
    }

    /// Runs the query for a proposed state. The view only adopts that state
    /// once its response arrives and is still the newest; a failed query
    /// leaves the state describing the listing on screen.
    async fn transition(&self, change: impl FnOnce(&mut QueryState)) -> Result<Applied> {
        let (seq, next) = {
            let mut view = self.view.lock().await;
            let mut next = view.state.clone();
            change(&mut next);
            let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
            view.loading = true;
            (seq, next)
        };
        let params = next.params();
        debug!(seq, term = %params.term, page = params.page, "issuing movie query");

        let result = self.orchestrator.resolve_movies(&params).await;

        let mut view = self.view.lock().await;
        if seq < self.latest.load(Ordering::SeqCst) {
            debug!(seq, "discarding stale movie query response");
            return Ok(Applied::Stale { seq });
        }
        view.loading = false;
        match result {
            Ok(listing) => {
                // Keystrokes typed while the query was in flight are kept.
                let typed = std::mem::take(&mut view.state.search_term);
                view.state = next;
                view.state.search_term = typed;
                view.state.apply(&listing);
                view.listing = Some(listing);
                view.error = None;
                Ok(Applied::Fresh { seq })
            }
            Err(err) => {
                warn!("Error fetching movies: {}", err);
                view.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Feed debounced search terms into the browser until the channel closes.
    /// Each term is queried at once; an older response that lands late is
    /// dropped by the sequence check. Returns after in-flight queries finish.
    pub fn drive(self: Arc<Self>, mut terms: mpsc::UnboundedReceiver<String>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut in_flight = JoinSet::new();
            loop {
                tokio::select! {
                    term = terms.recv() => {
                        let Some(term) = term else { break };
                        info!("Searching for '{}'", term);
                        let browser = self.clone();
                        in_flight.spawn(async move {
                            if let Err(err) = browser.debounced(&term).await {
                                warn!("Search for '{}' failed: {}", term, err);
                            }
                        });
                    }
                    Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
                }
            }
            while in_flight.join_next().await.is_some() {}
        })
    }
}
