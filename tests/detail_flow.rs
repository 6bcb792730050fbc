mod common;

use cinescope::detail::{DetailAggregator, MAX_CAST, MAX_RECOMMENDATIONS};
use cinescope::error::Error;
use cinescope::favorites::FavoritesSync;
use common::{movie_detail, Call, FakeCatalog, MemoryStore};
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn aggregator(catalog: FakeCatalog) -> (DetailAggregator, Arc<FakeCatalog>, Arc<MemoryStore>) {
    let catalog = Arc::new(catalog);
    let store = Arc::new(MemoryStore::default());
    let favorites = FavoritesSync::new(store.clone());
    (
        DetailAggregator::new(catalog.clone(), favorites),
        catalog,
        store,
    )
}

#[tokio::test]
async fn loads_every_section_with_caps() {
    let (details, catalog, _store) = aggregator(FakeCatalog::new());

    let view = details.load_movie_detail(155).await.unwrap();

    assert_eq!(view.movie.id, 155);
    assert_eq!(view.cast.len(), MAX_CAST);
    assert_eq!(view.cast[0].name, "Actor 1");
    assert_eq!(view.recommendations.len(), MAX_RECOMMENDATIONS);
    let keys: Vec<_> = view.trailers.iter().map(|v| v.key.as_str()).collect();
    assert_eq!(keys, vec!["key1", "key3", "key4"]);
    assert!(!view.is_favorite);

    let calls = catalog.calls();
    for expected in [
        Call::Details(155),
        Call::Credits(155),
        Call::Videos(155),
        Call::Recommendations(155),
    ] {
        assert!(calls.contains(&expected), "missing {:?}", expected);
    }
}

#[tokio::test]
async fn formats_sidebar_facts() {
    let (details, _catalog, _store) = aggregator(FakeCatalog::new());

    let facts = details.load_movie_detail(155).await.unwrap().facts;

    assert_eq!(facts.year, "2008");
    assert_eq!(facts.runtime, "2h 32m");
    assert_eq!(facts.rating, "8.5");
    assert_eq!(facts.language, "English");
    assert_eq!(facts.budget, "$185,000,000");
    assert_eq!(facts.revenue, "$1,004,558,444");
}

#[tokio::test]
async fn credits_failure_leaves_cast_empty() {
    let mut catalog = FakeCatalog::new();
    catalog.fail_credits = true;
    let (details, _catalog, _store) = aggregator(catalog);

    let view = details.load_movie_detail(155).await.unwrap();

    assert!(view.cast.is_empty());
    assert_eq!(view.trailers.len(), 3);
    assert_eq!(view.movie.title, "The Dark Knight");
}

#[tokio::test]
async fn secondary_failures_degrade_independently() {
    let mut catalog = FakeCatalog::new();
    catalog.fail_videos = true;
    catalog.fail_recommendations = true;
    let (details, _catalog, _store) = aggregator(catalog);

    let view = details.load_movie_detail(155).await.unwrap();

    assert!(view.trailers.is_empty());
    assert!(view.recommendations.is_empty());
    assert_eq!(view.cast.len(), MAX_CAST);
}

#[tokio::test]
async fn missing_details_fail_the_whole_view() {
    let mut catalog = FakeCatalog::new();
    catalog.detail = None;
    let (details, _catalog, _store) = aggregator(catalog);

    let err = details.load_movie_detail(999_999).await.unwrap_err();

    assert!(matches!(err, Error::Api { status: 404, .. }));
}

#[tokio::test]
async fn reports_existing_favorite() {
    let (details, _catalog, store) = aggregator(FakeCatalog::new());
    FavoritesSync::new(store.clone())
        .add(&movie_detail(155))
        .await
        .unwrap();

    let view = details.load_movie_detail(155).await.unwrap();

    assert!(view.is_favorite);
}

#[tokio::test]
async fn favorite_lookup_failure_reads_as_not_favorite() {
    let (details, _catalog, store) = aggregator(FakeCatalog::new());
    FavoritesSync::new(store.clone())
        .add(&movie_detail(155))
        .await
        .unwrap();
    store.fail_lookups.store(true, Ordering::SeqCst);

    let view = details.load_movie_detail(155).await.unwrap();

    assert!(!view.is_favorite);
    assert_eq!(view.movie.id, 155);
}
