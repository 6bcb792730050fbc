use crate::catalog::TMDB_BASE;
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_APPWRITE_ENDPOINT: &str = "https://cloud.appwrite.io/v1";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3146";
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct Settings {
    pub tmdb_token: String,
    pub tmdb_base: String,
    pub store: StoreSettings,
    pub require_session: bool,
    pub bind_addr: String,
    pub search_debounce: Duration,
}

/// Document store coordinates. Empty values are allowed here; the store
/// itself rejects them on first use.
#[derive(Debug, Clone, Default)]
pub struct StoreSettings {
    pub endpoint: String,
    pub project_id: String,
    pub api_key: String,
    pub database_id: String,
    pub favorites_collection: String,
    pub searches_collection: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let tmdb_token = env::var("TMDB_API_TOKEN")
            .ok()
            .filter(|s| !s.is_empty())
            .context("TMDB_API_TOKEN must be set")?;

        let search_debounce = match env::var("SEARCH_DEBOUNCE_MS") {
            Ok(raw) => Duration::from_millis(
                raw.trim()
                    .parse()
                    .with_context(|| format!("SEARCH_DEBOUNCE_MS is not a number: {raw}"))?,
            ),
            Err(_) => Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        };

        let settings = Self {
            tmdb_token,
            tmdb_base: var_or("TMDB_BASE_URL", TMDB_BASE),
            store: StoreSettings::from_env(),
            require_session: env::var("REQUIRE_SESSION")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            bind_addr: var_or("BIND_ADDR", DEFAULT_BIND_ADDR),
            search_debounce,
        };
        settings.store.log_missing();
        Ok(settings)
    }
}

impl StoreSettings {
    pub fn from_env() -> Self {
        Self {
            endpoint: var_or("APPWRITE_ENDPOINT", DEFAULT_APPWRITE_ENDPOINT),
            project_id: var_or("APPWRITE_PROJECT_ID", ""),
            api_key: var_or("APPWRITE_API_KEY", ""),
            database_id: var_or("APPWRITE_DATABASE_ID", ""),
            favorites_collection: var_or("APPWRITE_FAVORITES_COLLECTION_ID", ""),
            searches_collection: var_or("APPWRITE_SEARCH_COLLECTION_ID", ""),
        }
    }

    pub fn missing(&self) -> Vec<&'static str> {
        let fields = [
            ("APPWRITE_PROJECT_ID", &self.project_id),
            ("APPWRITE_DATABASE_ID", &self.database_id),
            ("APPWRITE_FAVORITES_COLLECTION_ID", &self.favorites_collection),
            ("APPWRITE_SEARCH_COLLECTION_ID", &self.searches_collection),
        ];
        fields
            .into_iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(k, _)| k)
            .collect()
    }

    fn log_missing(&self) {
        let missing = self.missing();
        if missing.is_empty() {
            info!("Document store configured at {}", self.endpoint);
        } else {
            warn!(
                "Document store settings missing ({}); favorites and trending will fail on use",
                missing.join(", ")
            );
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
