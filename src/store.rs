use crate::config::StoreSettings;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Remote document database holding favorites and search counters.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_favorite(&self, record: &FavoriteRecord) -> Result<FavoriteRecord>;
    async fn get_favorite(&self, movie_id: u64) -> Result<FavoriteRecord>;
    async fn list_favorites(&self) -> Result<Vec<FavoriteRecord>>;
    async fn delete_favorite(&self, movie_id: u64) -> Result<()>;

    async fn get_search(&self, doc_id: &str) -> Result<SearchRecord>;
    async fn create_search(&self, doc_id: &str, record: &SearchRecord) -> Result<SearchRecord>;
    async fn update_search_count(&self, doc_id: &str, count: u64) -> Result<SearchRecord>;
    async fn top_searches(&self, limit: usize) -> Result<Vec<SearchRecord>>;

    /// Resolve the account behind a session secret.
    async fn current_user(&self, session: &str) -> Result<UserAccount>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub movie_id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "poster_URL")]
    pub poster_url: String,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub overview: String,
    #[serde(default, alias = "$createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl FavoriteRecord {
    fn to_document(&self) -> Value {
        json!({
            "movie_id": self.movie_id,
            "title": self.title,
            "poster_URL": self.poster_url,
            "vote_average": self.vote_average,
            "release_date": self.release_date,
            "overview": self.overview,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRecord {
    #[serde(alias = "searchTerm")]
    pub search_term: String,
    #[serde(default)]
    pub count: u64,
    pub movie_id: u64,
    #[serde(default, alias = "poster_URL")]
    pub poster_url: String,
}

impl SearchRecord {
    fn to_document(&self) -> Value {
        json!({
            "searchTerm": self.search_term,
            "count": self.count,
            "movie_id": self.movie_id,
            "poster_URL": self.poster_url,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct DocumentList<T> {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    documents: Vec<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collection {
    Favorites,
    Searches,
}

impl Collection {
    fn env_key(self) -> &'static str {
        match self {
            Collection::Favorites => "APPWRITE_FAVORITES_COLLECTION_ID",
            Collection::Searches => "APPWRITE_SEARCH_COLLECTION_ID",
        }
    }
}

/// Appwrite REST adapter.
#[derive(Debug, Clone)]
pub struct AppwriteStore {
    client: Client,
    settings: StoreSettings,
}

/// Page size used when walking the favorites collection.
const FAVORITES_PAGE_SIZE: usize = 100;

impl AppwriteStore {
    pub fn new(settings: StoreSettings) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, settings })
    }

    fn collection_id(&self, collection: Collection) -> &str {
        match collection {
            Collection::Favorites => &self.settings.favorites_collection,
            Collection::Searches => &self.settings.searches_collection,
        }
    }

    /// Only the ids this collection needs are checked, so favorites keep
    /// working when the search counter collection is not set up.
    fn documents_url(&self, collection: Collection) -> Result<String> {
        let collection_id = self.collection_id(collection);
        let missing: Vec<&str> = [
            ("APPWRITE_PROJECT_ID", self.settings.project_id.as_str()),
            ("APPWRITE_DATABASE_ID", self.settings.database_id.as_str()),
            (collection.env_key(), collection_id),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect();
        if !missing.is_empty() {
            return Err(Error::Api {
                status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                message: Some(format!(
                    "document store is not configured (missing {})",
                    missing.join(", ")
                )),
            });
        }
        Ok(format!(
            "{}/databases/{}/collections/{}/documents",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.database_id,
            collection_id
        ))
    }

    fn document_url(&self, collection: Collection, doc_id: &str) -> Result<String> {
        Ok(format!(
            "{}/{}",
            self.documents_url(collection)?,
            urlencoding::encode(doc_id)
        ))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut req = self
            .client
            .request(method, url)
            .header("X-Appwrite-Project", &self.settings.project_id);
        if !self.settings.api_key.is_empty() {
            req = req.header("X-Appwrite-Key", &self.settings.api_key);
        }
        req
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
        let body = self.send_raw(req, what).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_raw(&self, req: RequestBuilder, what: &str) -> Result<String> {
        let res = req
            .send()
            .await
            .map_err(|e| Error::Network(format!("{what}: {e}")))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| Error::Network(format!("{what}: reading body failed: {e}")))?;
        debug!(status = status.as_u16(), what, "document store response");
        match status {
            s if s.is_success() => Ok(text),
            StatusCode::NOT_FOUND => Err(Error::NotFound(what.to_string())),
            StatusCode::CONFLICT => Err(Error::Duplicate(what.to_string())),
            s => Err(Error::Api {
                status: s.as_u16(),
                message: serde_json::from_str::<Value>(&text)
                    .ok()
                    .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                    .or_else(|| (!text.trim().is_empty()).then(|| text.trim().to_string())),
            }),
        }
    }
}

fn query_param(query: Value) -> (&'static str, String) {
    ("queries[]", query.to_string())
}

#[async_trait]
impl DocumentStore for AppwriteStore {
    async fn create_favorite(&self, record: &FavoriteRecord) -> Result<FavoriteRecord> {
        let url = self.documents_url(Collection::Favorites)?;
        let body = json!({
            "documentId": record.movie_id.to_string(),
            "data": record.to_document(),
        });
        let what = format!("favorite {}", record.movie_id);
        self.send(self.request(Method::POST, &url).json(&body), &what)
            .await
    }

    async fn get_favorite(&self, movie_id: u64) -> Result<FavoriteRecord> {
        let url = self.document_url(Collection::Favorites, &movie_id.to_string())?;
        self.send(
            self.request(Method::GET, &url),
            &format!("favorite {movie_id}"),
        )
        .await
    }

    async fn list_favorites(&self) -> Result<Vec<FavoriteRecord>> {
        let url = self.documents_url(Collection::Favorites)?;
        let mut favorites = Vec::new();
        loop {
            let req = self.request(Method::GET, &url).query(&[
                query_param(json!({ "method": "limit", "values": [FAVORITES_PAGE_SIZE] })),
                query_param(json!({ "method": "offset", "values": [favorites.len()] })),
            ]);
            let page: DocumentList<FavoriteRecord> = self.send(req, "favorites").await?;
            let fetched = page.documents.len();
            favorites.extend(page.documents);
            let reached_total = page
                .total
                .is_some_and(|total| favorites.len() as u64 >= total);
            if fetched < FAVORITES_PAGE_SIZE || reached_total {
                break;
            }
            debug!(loaded = favorites.len(), "fetching next favorites page");
        }
        Ok(favorites)
    }

    async fn delete_favorite(&self, movie_id: u64) -> Result<()> {
        let url = self.document_url(Collection::Favorites, &movie_id.to_string())?;
        self.send_raw(
            self.request(Method::DELETE, &url),
            &format!("favorite {movie_id}"),
        )
        .await
        .map(|_| ())
    }

    async fn get_search(&self, doc_id: &str) -> Result<SearchRecord> {
        let url = self.document_url(Collection::Searches, doc_id)?;
        self.send(
            self.request(Method::GET, &url),
            &format!("search record {doc_id}"),
        )
        .await
    }

    async fn create_search(&self, doc_id: &str, record: &SearchRecord) -> Result<SearchRecord> {
        let url = self.documents_url(Collection::Searches)?;
        let body = json!({
            "documentId": doc_id,
            "data": record.to_document(),
        });
        self.send(
            self.request(Method::POST, &url).json(&body),
            &format!("search record {doc_id}"),
        )
        .await
    }

    async fn update_search_count(&self, doc_id: &str, count: u64) -> Result<SearchRecord> {
        let url = self.document_url(Collection::Searches, doc_id)?;
        let body = json!({ "data": { "count": count } });
        self.send(
            self.request(Method::PATCH, &url).json(&body),
            &format!("search record {doc_id}"),
        )
        .await
    }

    async fn top_searches(&self, limit: usize) -> Result<Vec<SearchRecord>> {
        let url = self.documents_url(Collection::Searches)?;
        let req = self.request(Method::GET, &url).query(&[
            query_param(json!({ "method": "orderDesc", "attribute": "count" })),
            query_param(json!({ "method": "limit", "values": [limit] })),
        ]);
        let list: DocumentList<SearchRecord> = self.send(req, "search records").await?;
        Ok(list.documents)
    }

    async fn current_user(&self, session: &str) -> Result<UserAccount> {
        let url = format!("{}/account", self.settings.endpoint.trim_end_matches('/'));
        let req = self
            .client
            .get(&url)
            .header("X-Appwrite-Project", &self.settings.project_id)
            .header("X-Appwrite-Session", session);
        self.send(req, "account").await
    }
}
