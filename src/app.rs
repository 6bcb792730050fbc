use crate::catalog::{CatalogApi, MoviePage, SortKey, TimeWindow, TmdbCatalog, MAX_PAGES};
use crate::config::{Settings, DEFAULT_DEBOUNCE_MS};
use crate::detail::{DetailAggregator, MovieDetailView};
use crate::error::Error;
use crate::favorites::FavoritesSync;
use crate::query::{MovieListing, QueryOrchestrator, QueryParams};
use crate::store::{AppwriteStore, DocumentStore, FavoriteRecord, SearchRecord};
use crate::trending::{TrendingCounter, TRENDING_RAIL_SIZE};
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{info, warn};

const MAX_BODY_BYTES: usize = 64 * 1024;

type ApiResult<T> = std::result::Result<T, Error>;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogApi>,
    pub query: QueryOrchestrator,
    pub details: DetailAggregator,
    pub favorites: FavoritesSync,
    pub trending: TrendingCounter,
    pub store: Arc<dyn DocumentStore>,
    pub require_session: bool,
    pub search_debounce: Duration,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        store: Arc<dyn DocumentStore>,
        require_session: bool,
    ) -> Self {
        let trending = TrendingCounter::new(store.clone());
        let favorites = FavoritesSync::new(store.clone());
        Self {
            query: QueryOrchestrator::new(catalog.clone(), trending.clone()),
            details: DetailAggregator::new(catalog.clone(), favorites.clone()),
            catalog,
            favorites,
            trending,
            store,
            require_session,
            search_debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }

    pub fn with_search_debounce(mut self, delay: Duration) -> Self {
        self.search_debounce = delay;
        self
    }
}

pub async fn run_server(settings: Settings) -> Result<()> {
    let catalog: Arc<dyn CatalogApi> = Arc::new(
        TmdbCatalog::with_base(&settings.tmdb_base, &settings.tmdb_token)
            .context("Failed to build catalog client")?,
    );
    let store: Arc<dyn DocumentStore> = Arc::new(
        AppwriteStore::new(settings.store.clone()).context("Failed to build store client")?,
    );
    if settings.require_session {
        info!("Favorites routes require a store session");
    }

    let state = AppState::new(catalog, store, settings.require_session)
        .with_search_debounce(settings.search_debounce);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_addr))?;
    info!("Listening on {}", settings.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let favorites = Router::new()
        .route("/favorites", get(list_favorites))
        .route(
            "/favorites/:id",
            get(favorite_status)
                .post(add_favorite)
                .delete(remove_favorite),
        )
        .route("/favorites/:id/toggle", post(toggle_favorite))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/options", get(options))
        .route("/genres", get(genres))
        .route("/movies", get(movies))
        .route("/movies/:id", get(movie_detail))
        .route("/trending", get(trending_movies))
        .route("/trending/searches", get(trending_searches))
        .merge(favorites)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn require_session(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    req: Request,
    next: Next,
) -> Response {
    if !state.require_session {
        return next.run(req).await;
    }
    let Some(TypedHeader(Authorization(bearer))) = auth else {
        warn!("Rejecting favorites request without a session");
        return StatusCode::UNAUTHORIZED.into_response();
    };
    match state.store.current_user(bearer.token()).await {
        Ok(user) => {
            tracing::debug!(user = %user.id, "session accepted");
            next.run(req).await
        }
        Err(e) => {
            warn!("Session check failed: {}", e);
            StatusCode::UNAUTHORIZED.into_response()
        }
    }
}

/// Static choices the browse UI needs to render its controls.
async fn options(State(state): State<AppState>) -> impl IntoResponse {
    let sort_options: Vec<_> = SortKey::ALL
        .iter()
        .map(|k| json!({ "value": k.as_str(), "label": k.label() }))
        .collect();
    Json(json!({
        "sort_options": sort_options,
        "default_sort": SortKey::default().as_str(),
        "max_pages": MAX_PAGES,
        "search_debounce_ms": u64::try_from(state.search_debounce.as_millis()).unwrap_or(u64::MAX),
    }))
}

async fn genres(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let genres = state.catalog.genres().await?;
    Ok(Json(json!({ "genres": genres })))
}

async fn movies(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Json<MovieListing>> {
    Ok(Json(state.query.resolve_movies(&params).await?))
}

async fn movie_detail(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<MovieDetailView>> {
    Ok(Json(state.details.load_movie_detail(id).await?))
}

#[derive(Debug, Deserialize)]
struct TrendingQuery {
    #[serde(default)]
    window: TimeWindow,
}

async fn trending_movies(
    State(state): State<AppState>,
    Query(q): Query<TrendingQuery>,
) -> ApiResult<Json<MoviePage>> {
    Ok(Json(state.catalog.trending(q.window).await?))
}

async fn trending_searches(State(state): State<AppState>) -> ApiResult<Json<Vec<SearchRecord>>> {
    Ok(Json(state.trending.top(TRENDING_RAIL_SIZE).await?))
}

async fn list_favorites(State(state): State<AppState>) -> ApiResult<Json<Vec<FavoriteRecord>>> {
    Ok(Json(state.favorites.list().await?))
}

async fn favorite_status(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<impl IntoResponse> {
    let is_favorite = state.favorites.is_favorite(id).await?;
    Ok(Json(json!({ "movie_id": id, "is_favorite": is_favorite })))
}

async fn add_favorite(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<impl IntoResponse> {
    let movie = state.catalog.movie_details(id).await?;
    let record = state.favorites.add(&movie).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn remove_favorite(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    state.favorites.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_favorite(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<impl IntoResponse> {
    let is_favorite = state
        .favorites
        .toggle_by_id(id, || state.catalog.movie_details(id))
        .await?;
    Ok(Json(json!({ "movie_id": id, "is_favorite": is_favorite })))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
