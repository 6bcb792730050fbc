use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub const TMDB_BASE: &str = "https://api.themoviedb.org/3";
pub const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
pub const YOUTUBE_BASE: &str = "https://www.youtube.com/watch?v=";

/// TMDB refuses to serve pages past this one.
pub const MAX_PAGES: u32 = 500;

pub mod size {
    pub const POSTER_SMALL: &str = "w185";
    pub const POSTER_MEDIUM: &str = "w300";
    pub const POSTER_LARGE: &str = "w500";
    pub const BACKDROP_LARGE: &str = "w1280";
    pub const PROFILE_MEDIUM: &str = "w185";
    pub const ORIGINAL: &str = "original";
}

#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn search_movies(&self, term: &str, page: u32) -> Result<MoviePage>;
    async fn discover_movies(
        &self,
        sort: SortKey,
        page: u32,
        genre: Option<u32>,
    ) -> Result<MoviePage>;
    async fn movie_details(&self, id: u64) -> Result<MovieDetail>;
    async fn movie_credits(&self, id: u64) -> Result<Vec<CastMember>>;
    async fn movie_videos(&self, id: u64) -> Result<Vec<Video>>;
    async fn movie_recommendations(&self, id: u64) -> Result<MoviePage>;
    async fn genres(&self) -> Result<Vec<Genre>>;
    async fn trending(&self, window: TimeWindow) -> Result<MoviePage>;
}

#[derive(Debug, Clone)]
pub struct TmdbCatalog {
    client: Client,
    base: String,
    token: String,
}

impl TmdbCatalog {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_base(TMDB_BASE, token)
    }

    pub fn with_base(base: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let user_agent = format!("cinescope/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base, path);
        debug!(url = %url, "catalog request");
        let res = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Error::Network(format!("{path}: {e}")))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| Error::Network(format!("{path}: reading body failed: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| status_message(&v))
                .or_else(|| (!text.trim().is_empty()).then(|| text.trim().to_string()));
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let value: Value = serde_json::from_str(&text)?;
        if value.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(Error::Api {
                status: status.as_u16(),
                message: Some(
                    status_message(&value).unwrap_or_else(|| "API request failed".to_string()),
                ),
            });
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl CatalogApi for TmdbCatalog {
    async fn search_movies(&self, term: &str, page: u32) -> Result<MoviePage> {
        let path = format!(
            "/search/movie?query={}&page={page}",
            urlencoding::encode(term)
        );
        self.get_json(&path).await
    }

    async fn discover_movies(
        &self,
        sort: SortKey,
        page: u32,
        genre: Option<u32>,
    ) -> Result<MoviePage> {
        let mut path = format!("/discover/movie?sort_by={}&page={page}", sort.as_str());
        if let Some(genre) = genre {
            path.push_str(&format!("&with_genres={genre}"));
        }
        self.get_json(&path).await
    }

    async fn movie_details(&self, id: u64) -> Result<MovieDetail> {
        self.get_json(&format!("/movie/{id}")).await
    }

    async fn movie_credits(&self, id: u64) -> Result<Vec<CastMember>> {
        #[derive(Deserialize)]
        struct Credits {
            #[serde(default)]
            cast: Vec<CastMember>,
        }
        let credits: Credits = self.get_json(&format!("/movie/{id}/credits")).await?;
        Ok(credits.cast)
    }

    async fn movie_videos(&self, id: u64) -> Result<Vec<Video>> {
        #[derive(Deserialize)]
        struct Videos {
            #[serde(default)]
            results: Vec<Video>,
        }
        let videos: Videos = self.get_json(&format!("/movie/{id}/videos")).await?;
        Ok(videos.results)
    }

    async fn movie_recommendations(&self, id: u64) -> Result<MoviePage> {
        self.get_json(&format!("/movie/{id}/recommendations")).await
    }

    async fn genres(&self) -> Result<Vec<Genre>> {
        #[derive(Deserialize)]
        struct GenreList {
            #[serde(default)]
            genres: Vec<Genre>,
        }
        let list: GenreList = self.get_json("/genre/movie/list").await?;
        Ok(list.genres)
    }

    async fn trending(&self, window: TimeWindow) -> Result<MoviePage> {
        self.get_json(&format!("/trending/movie/{}", window.as_str()))
            .await
    }
}

fn status_message(value: &Value) -> Option<String> {
    value
        .get("status_message")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieSummary {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub original_language: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub release_date: Option<String>,
    #[serde(default)]
    pub overview: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoviePage {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<MovieSummary>,
    #[serde(default = "first_page")]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u64,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetail {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u64,
    #[serde(default)]
    pub original_language: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub budget: u64,
    #[serde(default)]
    pub revenue: u64,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub tagline: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub production_companies: Vec<ProductionCompany>,
    #[serde(default)]
    pub production_countries: Vec<ProductionCountry>,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub imdb_id: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub homepage: Option<String>,
}

impl MovieDetail {
    pub fn summary(&self) -> MovieSummary {
        MovieSummary {
            id: self.id,
            title: self.title.clone(),
            poster_path: self.poster_path.clone(),
            backdrop_path: self.backdrop_path.clone(),
            vote_average: self.vote_average,
            original_language: self.original_language.clone(),
            release_date: self.release_date.clone(),
            overview: self.overview.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionCompany {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub logo_path: Option<String>,
    #[serde(default)]
    pub origin_country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionCountry {
    pub iso_3166_1: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastMember {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub character: String,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub key: String,
    #[serde(default)]
    pub site: String,
    #[serde(rename = "type", default)]
    pub video_type: String,
}

impl Video {
    pub fn is_trailer(&self) -> bool {
        self.video_type == "Trailer"
    }

    pub fn watch_url(&self) -> String {
        youtube_url(&self.key)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Day,
    #[default]
    Week,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
        }
    }
}

/// Discover ordering accepted by `/discover/movie?sort_by=`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortKey {
    #[default]
    #[serde(rename = "popularity.desc")]
    PopularityDesc,
    #[serde(rename = "popularity.asc")]
    PopularityAsc,
    #[serde(rename = "release_date.desc")]
    ReleaseDateDesc,
    #[serde(rename = "release_date.asc")]
    ReleaseDateAsc,
    #[serde(rename = "vote_average.desc")]
    VoteAverageDesc,
    #[serde(rename = "vote_average.asc")]
    VoteAverageAsc,
    #[serde(rename = "vote_count.desc")]
    VoteCountDesc,
    #[serde(rename = "vote_count.asc")]
    VoteCountAsc,
    #[serde(rename = "title.asc")]
    TitleAsc,
    #[serde(rename = "title.desc")]
    TitleDesc,
}

impl SortKey {
    pub const ALL: [SortKey; 10] = [
        SortKey::PopularityDesc,
        SortKey::PopularityAsc,
        SortKey::ReleaseDateDesc,
        SortKey::ReleaseDateAsc,
        SortKey::VoteAverageDesc,
        SortKey::VoteAverageAsc,
        SortKey::VoteCountDesc,
        SortKey::VoteCountAsc,
        SortKey::TitleAsc,
        SortKey::TitleDesc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::PopularityDesc => "popularity.desc",
            SortKey::PopularityAsc => "popularity.asc",
            SortKey::ReleaseDateDesc => "release_date.desc",
            SortKey::ReleaseDateAsc => "release_date.asc",
            SortKey::VoteAverageDesc => "vote_average.desc",
            SortKey::VoteAverageAsc => "vote_average.asc",
            SortKey::VoteCountDesc => "vote_count.desc",
            SortKey::VoteCountAsc => "vote_count.asc",
            SortKey::TitleAsc => "title.asc",
            SortKey::TitleDesc => "title.desc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::PopularityDesc => "Most Popular",
            SortKey::PopularityAsc => "Least Popular",
            SortKey::ReleaseDateDesc => "Newest First",
            SortKey::ReleaseDateAsc => "Oldest First",
            SortKey::VoteAverageDesc => "Highest Rated",
            SortKey::VoteAverageAsc => "Lowest Rated",
            SortKey::VoteCountDesc => "Most Voted",
            SortKey::VoteCountAsc => "Least Voted",
            SortKey::TitleAsc => "A-Z",
            SortKey::TitleDesc => "Z-A",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort key '{0}'")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        SortKey::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownSortKey(s.to_string()))
    }
}

/// Build a CDN URL for an image path such as `/abc.jpg`.
pub fn image_url(path: Option<&str>, size: &str) -> Option<String> {
    let path = path?.trim().trim_start_matches('/');
    if path.is_empty() || path == "null" {
        return None;
    }
    Some(format!("{IMAGE_BASE}/{size}/{path}"))
}

pub fn youtube_url(key: &str) -> String {
    format!("{YOUTUBE_BASE}{key}")
}

// TMDB sends "" for unknown dates and taglines.
fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}
