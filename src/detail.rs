use crate::catalog::{CastMember, CatalogApi, MovieDetail, MovieSummary, Video};
use crate::error::Result;
use crate::favorites::FavoritesSync;
use crate::utils::{format_currency, format_rating, format_runtime, language_name, release_year};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

pub const MAX_CAST: usize = 10;
pub const MAX_TRAILERS: usize = 3;
pub const MAX_RECOMMENDATIONS: usize = 6;

/// Everything the detail page renders for one movie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetailView {
    pub movie: MovieDetail,
    pub cast: Vec<CastMember>,
    pub trailers: Vec<Video>,
    pub recommendations: Vec<MovieSummary>,
    pub is_favorite: bool,
    pub facts: MovieFacts,
}

/// Display strings for the detail sidebar; missing values read "N/A".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieFacts {
    pub year: String,
    pub runtime: String,
    pub rating: String,
    pub language: String,
    pub budget: String,
    pub revenue: String,
}

impl MovieFacts {
    pub fn from_detail(movie: &MovieDetail) -> Self {
        Self {
            year: release_year(movie.release_date.as_deref()),
            runtime: format_runtime(movie.runtime),
            rating: format_rating(movie.vote_average),
            language: language_name(&movie.original_language),
            budget: format_currency(movie.budget),
            revenue: format_currency(movie.revenue),
        }
    }
}

#[derive(Clone)]
pub struct DetailAggregator {
    catalog: Arc<dyn CatalogApi>,
    favorites: FavoritesSync,
}

impl DetailAggregator {
    pub fn new(catalog: Arc<dyn CatalogApi>, favorites: FavoritesSync) -> Self {
        Self { catalog, favorites }
    }

    /// Details are mandatory; cast, trailers, recommendations and the
    /// favorite flag fall back to empty/false when their lookup fails.
    pub async fn load_movie_detail(&self, id: u64) -> Result<MovieDetailView> {
        let (details, credits, videos, recommendations, favorite) = tokio::join!(
            self.catalog.movie_details(id),
            self.catalog.movie_credits(id),
            self.catalog.movie_videos(id),
            self.catalog.movie_recommendations(id),
            self.favorites.is_favorite(id),
        );

        let movie = details?;

        let cast = match credits {
            Ok(cast) => cast.into_iter().take(MAX_CAST).collect(),
            Err(e) => {
                warn!("Credits unavailable for movie {}: {}", id, e);
                Vec::new()
            }
        };
        let trailers = match videos {
            Ok(videos) => videos
                .into_iter()
                .filter(Video::is_trailer)
                .take(MAX_TRAILERS)
                .collect(),
            Err(e) => {
                warn!("Videos unavailable for movie {}: {}", id, e);
                Vec::new()
            }
        };
        let recommendations = match recommendations {
            Ok(page) => page
                .results
                .into_iter()
                .take(MAX_RECOMMENDATIONS)
                .collect(),
            Err(e) => {
                warn!("Recommendations unavailable for movie {}: {}", id, e);
                Vec::new()
            }
        };
        // TODO: surface an "unknown" state instead of false once the detail
        // view can render a neutral favorite button.
        let is_favorite = favorite.unwrap_or_else(|e| {
            warn!("Favorite check failed for movie {}: {}", id, e);
            false
        });

        info!(
            "Loaded detail for '{}' ({} cast, {} trailers, {} recommendations)",
            movie.title,
            cast.len(),
            trailers.len(),
            recommendations.len()
        );

        Ok(MovieDetailView {
            facts: MovieFacts::from_detail(&movie),
            movie,
            cast,
            trailers,
            recommendations,
            is_favorite,
        })
    }
}
