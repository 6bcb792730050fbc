#![allow(dead_code)]

use async_trait::async_trait;
use cinescope::catalog::{
    CastMember, CatalogApi, Genre, MovieDetail, MoviePage, MovieSummary, SortKey, TimeWindow,
    Video,
};
use cinescope::error::{Error, Result};
use cinescope::store::{DocumentStore, FavoriteRecord, SearchRecord, UserAccount};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Search { term: String, page: u32 },
    Discover { sort: SortKey, page: u32, genre: Option<u32> },
    Details(u64),
    Credits(u64),
    Videos(u64),
    Recommendations(u64),
    Genres,
    Trending(TimeWindow),
}

pub struct FakeCatalog {
    pub total_pages: u32,
    pub empty_results: bool,
    pub detail: Option<MovieDetail>,
    pub fail_credits: bool,
    pub fail_videos: bool,
    pub fail_recommendations: bool,
    pub search_delays: HashMap<String, Duration>,
    pub failing_terms: Vec<String>,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self {
            total_pages: 3,
            empty_results: false,
            detail: Some(movie_detail(155)),
            fail_credits: false,
            fail_videos: false,
            fail_recommendations: false,
            search_delays: HashMap::new(),
            failing_terms: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn search_terms(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Search { term, .. } => Some(term),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn page_for(&self, label: &str, page: u32) -> MoviePage {
        let results = if self.empty_results {
            Vec::new()
        } else {
            vec![summary(1, &format!("{label} result")), summary(2, "Second")]
        };
        MoviePage {
            page,
            total_results: results.len() as u64,
            results,
            total_pages: self.total_pages,
        }
    }
}

fn upstream_failure() -> Error {
    Error::api(500, "upstream unavailable")
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn search_movies(&self, term: &str, page: u32) -> Result<MoviePage> {
        self.record(Call::Search {
            term: term.to_string(),
            page,
        });
        if let Some(delay) = self.search_delays.get(term) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_terms.iter().any(|t| t == term) {
            return Err(Error::Network("operation timed out".to_string()));
        }
        Ok(self.page_for(term, page))
    }

    async fn discover_movies(
        &self,
        sort: SortKey,
        page: u32,
        genre: Option<u32>,
    ) -> Result<MoviePage> {
        self.record(Call::Discover { sort, page, genre });
        Ok(self.page_for(sort.as_str(), page))
    }

    async fn movie_details(&self, id: u64) -> Result<MovieDetail> {
        self.record(Call::Details(id));
        match &self.detail {
            Some(detail) => Ok(MovieDetail {
                id,
                ..detail.clone()
            }),
            None => Err(Error::api(404, "The resource you requested could not be found.")),
        }
    }

    async fn movie_credits(&self, id: u64) -> Result<Vec<CastMember>> {
        self.record(Call::Credits(id));
        if self.fail_credits {
            return Err(upstream_failure());
        }
        Ok((1..=15)
            .map(|i| CastMember {
                id: i,
                name: format!("Actor {i}"),
                character: format!("Role {i}"),
                profile_path: None,
            })
            .collect())
    }

    async fn movie_videos(&self, id: u64) -> Result<Vec<Video>> {
        self.record(Call::Videos(id));
        if self.fail_videos {
            return Err(upstream_failure());
        }
        let kinds = ["Teaser", "Trailer", "Clip", "Trailer", "Trailer", "Trailer"];
        Ok(kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| Video {
                id: format!("v{i}"),
                name: format!("{kind} {i}"),
                key: format!("key{i}"),
                site: "YouTube".to_string(),
                video_type: kind.to_string(),
            })
            .collect())
    }

    async fn movie_recommendations(&self, id: u64) -> Result<MoviePage> {
        self.record(Call::Recommendations(id));
        if self.fail_recommendations {
            return Err(upstream_failure());
        }
        let results: Vec<_> = (100..110).map(|i| summary(i, "Recommended")).collect();
        Ok(MoviePage {
            page: 1,
            total_results: results.len() as u64,
            results,
            total_pages: 1,
        })
    }

    async fn genres(&self) -> Result<Vec<Genre>> {
        self.record(Call::Genres);
        Ok(vec![
            Genre {
                id: 28,
                name: "Action".to_string(),
            },
            Genre {
                id: 18,
                name: "Drama".to_string(),
            },
        ])
    }

    async fn trending(&self, window: TimeWindow) -> Result<MoviePage> {
        self.record(Call::Trending(window));
        Ok(self.page_for("trending", 1))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub favorites: Mutex<BTreeMap<u64, FavoriteRecord>>,
    pub searches: Mutex<HashMap<String, SearchRecord>>,
    pub sessions: Mutex<HashMap<String, UserAccount>>,
    pub fail_lookups: AtomicBool,
    pub fail_searches: AtomicBool,
}

impl MemoryStore {
    pub fn favorite_count(&self, movie_id: u64) -> usize {
        self.favorites
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.movie_id == movie_id)
            .count()
    }

    pub fn search_records(&self) -> Vec<SearchRecord> {
        self.searches.lock().unwrap().values().cloned().collect()
    }

    fn check_searches(&self) -> Result<()> {
        if self.fail_searches.load(Ordering::SeqCst) {
            return Err(Error::api(401, "Project is not accessible"));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_favorite(&self, record: &FavoriteRecord) -> Result<FavoriteRecord> {
        let mut favorites = self.favorites.lock().unwrap();
        if favorites.contains_key(&record.movie_id) {
            return Err(Error::Duplicate(format!("favorite {}", record.movie_id)));
        }
        favorites.insert(record.movie_id, record.clone());
        Ok(record.clone())
    }

    async fn get_favorite(&self, movie_id: u64) -> Result<FavoriteRecord> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(Error::Network("connection reset".to_string()));
        }
        self.favorites
            .lock()
            .unwrap()
            .get(&movie_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("favorite {movie_id}")))
    }

    async fn list_favorites(&self) -> Result<Vec<FavoriteRecord>> {
        Ok(self.favorites.lock().unwrap().values().cloned().collect())
    }

    async fn delete_favorite(&self, movie_id: u64) -> Result<()> {
        self.favorites
            .lock()
            .unwrap()
            .remove(&movie_id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("favorite {movie_id}")))
    }

    async fn get_search(&self, doc_id: &str) -> Result<SearchRecord> {
        self.check_searches()?;
        self.searches
            .lock()
            .unwrap()
            .get(doc_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("search record {doc_id}")))
    }

    async fn create_search(&self, doc_id: &str, record: &SearchRecord) -> Result<SearchRecord> {
        self.check_searches()?;
        let mut searches = self.searches.lock().unwrap();
        if searches.contains_key(doc_id) {
            return Err(Error::Duplicate(format!("search record {doc_id}")));
        }
        searches.insert(doc_id.to_string(), record.clone());
        Ok(record.clone())
    }

    async fn update_search_count(&self, doc_id: &str, count: u64) -> Result<SearchRecord> {
        self.check_searches()?;
        let mut searches = self.searches.lock().unwrap();
        let record = searches
            .get_mut(doc_id)
            .ok_or_else(|| Error::NotFound(format!("search record {doc_id}")))?;
        record.count = count;
        Ok(record.clone())
    }

    async fn top_searches(&self, limit: usize) -> Result<Vec<SearchRecord>> {
        self.check_searches()?;
        let mut records = self.search_records();
        records.sort_by(|a, b| b.count.cmp(&a.count));
        records.truncate(limit);
        Ok(records)
    }

    async fn current_user(&self, session: &str) -> Result<UserAccount> {
        self.sessions
            .lock()
            .unwrap()
            .get(session)
            .cloned()
            .ok_or_else(|| Error::api(401, "User (role: guests) missing scope (account)"))
    }
}

pub fn summary(id: u64, title: &str) -> MovieSummary {
    MovieSummary {
        id,
        title: title.to_string(),
        poster_path: Some(format!("/poster{id}.jpg")),
        backdrop_path: None,
        vote_average: 7.5,
        original_language: "en".to_string(),
        release_date: Some("2008-07-16".to_string()),
        overview: format!("Overview of {title}"),
    }
}

pub fn movie_detail(id: u64) -> MovieDetail {
    MovieDetail {
        id,
        title: "The Dark Knight".to_string(),
        poster_path: Some("/qJ2tW6WMUDux911r6m7haRef0WH.jpg".to_string()),
        backdrop_path: None,
        vote_average: 8.5,
        vote_count: 33_000,
        original_language: "en".to_string(),
        release_date: Some("2008-07-16".to_string()),
        runtime: Some(152),
        budget: 185_000_000,
        revenue: 1_004_558_444,
        tagline: Some("Why so serious?".to_string()),
        genres: vec![Genre {
            id: 28,
            name: "Action".to_string(),
        }],
        production_companies: Vec::new(),
        production_countries: Vec::new(),
        overview: "Batman raises the stakes.".to_string(),
        status: Some("Released".to_string()),
        imdb_id: Some("tt0468569".to_string()),
        homepage: None,
    }
}

/// Polls until the detached trending task has written `expected` records.
pub async fn wait_for_search_records(store: &MemoryStore, expected: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if store.search_records().len() >= expected {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!(
                "timed out waiting for {} search records (got {})",
                expected,
                store.search_records().len()
            );
        }
        tokio::task::yield_now().await;
    }
}
