use anyhow::{Context, Result};
use std::sync::Arc;

use wardrobe_intake::config::Settings;
use wardrobe_intake::domain::location::LocationKey;
use wardrobe_intake::domain::recommend::RecommendationRequest;
use wardrobe_intake::domain::TargetCategorySet;
use wardrobe_intake::logging;
use wardrobe_intake::services::{
    LocationResolver, SessionStore, TagCatalog, WardrobeApi, WeatherCache, WeatherLookup,
};
use wardrobe_intake::storage::{FileStore, KeyValueStore};
use wardrobe_intake::WardrobeError;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        api_url = %settings.api_url,
        storage = %settings.storage_path.display(),
        "Starting wardrobe client"
    );

    // Durable client state
    let store: Arc<dyn KeyValueStore> = Arc::new(
        FileStore::open(&settings.storage_path).context("Failed to open client state")?,
    );

    // Backend client
    let api = Arc::new(WardrobeApi::new(
        &settings.api_url,
        settings.api_timeout_seconds,
    )?);

    // Optionally check backend health (non-blocking)
    tokio::spawn({
        let api = api.clone();
        async move {
            match api.health_check().await {
                Ok(()) => tracing::info!("Wardrobe backend is healthy"),
                Err(e) => tracing::warn!(error = %e, "Wardrobe backend health check failed"),
            }
        }
    });

    // Restore session
    let sessions = SessionStore::new(api.clone(), store.clone());
    match sessions.current() {
        Some(session) => {
            api.set_bearer_token(Some(session.token.clone()));
            tracing::info!(username = %session.username, "Session restored");
        }
        None => tracing::info!("No saved session, continuing as guest"),
    }
    let user_id = sessions.effective_user_id();

    // Location: last successful one first, then the fallback chain
    let weather = WeatherCache::new(api.clone(), store.clone(), settings.weather_cache_ttl())
        .with_default_location(
            settings
                .default_location
                .as_deref()
                .and_then(LocationKey::from_place),
        );

    let location = match weather.bootstrap_location() {
        Some(key) => key,
        None => {
            let resolver = LocationResolver::from_settings(&settings)?;
            match resolver.resolve().await {
                Ok(resolved) => resolved.key,
                Err(e @ WardrobeError::LocationUnresolved) => {
                    tracing::warn!(error = %e, "{}", e.user_message());
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }
    };

    match weather.get_or_stale(&location, false).await {
        WeatherLookup::Fresh(snapshot) | WeatherLookup::Cached(snapshot) => {
            tracing::info!(
                location = %location,
                temp = snapshot.temp_now,
                feels_like = snapshot.temp_feel,
                condition = %snapshot.condition,
                aqi = %snapshot.aqi_label(),
                "Current weather"
            );
        }
        WeatherLookup::Stale(snapshot) => {
            tracing::warn!(
                location = %location,
                temp = snapshot.temp_now,
                "Showing outdated weather"
            );
        }
        WeatherLookup::Unavailable => {
            tracing::warn!(location = %location, "Weather is currently unavailable");
        }
    }

    // Preference tags for the recommendation form
    let tags = TagCatalog::new(api.clone(), user_id.clone());
    tags.load().await;

    let request = RecommendationRequest {
        user_id,
        location: location.to_string(),
        gender: sessions.preferred_gender(),
        style: tags.selected_style(),
        scenario: tags.selected_occasion(),
        target_categories: TargetCategorySet::default(),
    };
    tracing::info!(
        style = %request.style,
        scenario = %request.scenario,
        categories = ?request.target_categories.as_slice(),
        "Recommendation form ready"
    );

    Ok(())
}
