use crate::catalog::{image_url, size, MovieDetail};
use crate::error::{Error, Result};
use crate::store::{DocumentStore, FavoriteRecord};
use std::future::Future;
use std::sync::Arc;
use tracing::info;

impl FavoriteRecord {
    pub fn from_detail(movie: &MovieDetail) -> Self {
        Self {
            movie_id: movie.id,
            title: movie.title.clone(),
            poster_url: image_url(movie.poster_path.as_deref(), size::POSTER_LARGE)
                .unwrap_or_default(),
            vote_average: movie.vote_average,
            release_date: movie.release_date.clone(),
            overview: movie.overview.clone(),
            created_at: None,
        }
    }
}

/// Keeps the favorites list in the document store. Uniqueness is enforced by
/// the store (records are keyed by movie id), there is no local lock.
#[derive(Clone)]
pub struct FavoritesSync {
    store: Arc<dyn DocumentStore>,
}

impl FavoritesSync {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn is_favorite(&self, movie_id: u64) -> Result<bool> {
        match self.store.get_favorite(movie_id).await {
            Ok(_) => Ok(true),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Fails with `Error::Duplicate` when the movie is already a favorite.
    pub async fn add(&self, movie: &MovieDetail) -> Result<FavoriteRecord> {
        let record = FavoriteRecord::from_detail(movie);
        let created = self.store.create_favorite(&record).await?;
        info!("Added '{}' ({}) to favorites", movie.title, movie.id);
        Ok(created)
    }

    /// Fails with `Error::NotFound` when the movie is not a favorite.
    pub async fn remove(&self, movie_id: u64) -> Result<()> {
        self.store.delete_favorite(movie_id).await?;
        info!("Removed {} from favorites", movie_id);
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<FavoriteRecord>> {
        self.store.list_favorites().await
    }

    /// Check-then-act; two overlapping toggles on the same movie can both
    /// take the same branch, so callers disable the control while in flight.
    pub async fn toggle(&self, movie: &MovieDetail) -> Result<bool> {
        self.toggle_by_id(movie.id, || async { Ok(movie.clone()) })
            .await
    }

    /// Same as `toggle`, but the movie is only loaded when it has to be added.
    pub async fn toggle_by_id<F, Fut>(&self, movie_id: u64, load: F) -> Result<bool>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<MovieDetail>> + Send,
    {
        if self.is_favorite(movie_id).await? {
            self.remove(movie_id).await?;
            Ok(false)
        } else {
            let movie = load().await?;
            self.add(&movie).await?;
            Ok(true)
        }
    }
}
