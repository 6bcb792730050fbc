//! Query the live catalog and print what the browse and detail views would get.
//! Usage:
//!   cargo run --bin catalog_probe -- search <term> [page]
//!   cargo run --bin catalog_probe -- discover <sort_key> [page] [genre_id]
//!   cargo run --bin catalog_probe -- detail <tmdb_id>
//! Requires TMDB_API_TOKEN in the environment (.env supported). APPWRITE_*
//! settings are optional; without them the favorite flag reads false.

use anyhow::{Context, Result};
use cinescope::catalog::{CatalogApi, SortKey, TmdbCatalog};
use cinescope::config::StoreSettings;
use cinescope::detail::DetailAggregator;
use cinescope::favorites::FavoritesSync;
use cinescope::query::{MovieListing, QueryOrchestrator, QueryParams};
use cinescope::store::AppwriteStore;
use cinescope::utils::{truncate_text, CARD_OVERVIEW_CHARS};
use dotenvy::dotenv;
use std::env;
use std::sync::Arc;

fn usage() {
    eprintln!("Usage: cargo run --bin catalog_probe -- search <term> [page]");
    eprintln!("       cargo run --bin catalog_probe -- discover <sort_key> [page] [genre_id]");
    eprintln!("       cargo run --bin catalog_probe -- detail <tmdb_id>");
}

// Cards only show the start of the overview; keep the dump readable the same way.
fn as_cards(mut listing: MovieListing) -> MovieListing {
    for movie in &mut listing.movies {
        movie.overview = truncate_text(&movie.overview, CARD_OVERVIEW_CHARS);
    }
    listing
}

fn page_arg(args: &[String], idx: usize) -> Result<u32> {
    match args.get(idx) {
        Some(raw) => raw.parse::<u32>().context("page must be a positive integer"),
        None => Ok(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        usage();
        std::process::exit(1);
    }

    let token = env::var("TMDB_API_TOKEN").context("TMDB_API_TOKEN must be set")?;
    let catalog: Arc<dyn CatalogApi> = Arc::new(TmdbCatalog::new(token)?);

    let output = match args[1].as_str() {
        "search" => {
            let params = QueryParams {
                term: args[2].clone(),
                page: page_arg(&args, 3)?,
                ..Default::default()
            };
            let listing = QueryOrchestrator::without_trending(catalog)
                .resolve_movies(&params)
                .await?;
            serde_json::to_value(as_cards(listing))?
        }
        "discover" => {
            let sort: SortKey = args[2].parse()?;
            let genre = match args.get(4) {
                Some(raw) => Some(raw.parse::<u32>().context("genre_id must be an integer")?),
                None => None,
            };
            let params = QueryParams {
                term: String::new(),
                page: page_arg(&args, 3)?,
                genre,
                sort,
            };
            let listing = QueryOrchestrator::without_trending(catalog)
                .resolve_movies(&params)
                .await?;
            serde_json::to_value(as_cards(listing))?
        }
        "detail" => {
            let id: u64 = args[2].parse().context("tmdb_id must be an integer")?;
            let store = Arc::new(AppwriteStore::new(StoreSettings::from_env())?);
            let view = DetailAggregator::new(catalog, FavoritesSync::new(store))
                .load_movie_detail(id)
                .await?;
            serde_json::to_value(view)?
        }
        _ => {
            usage();
            std::process::exit(1);
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
