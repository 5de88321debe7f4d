use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,

    // Wardrobe backend
    pub api_url: String,
    pub api_timeout_seconds: u64,

    // Location
    pub ip_geolocation_url: String,
    pub geolocation_timeout_ms: u64,
    pub device_position: Option<(f64, f64)>,
    pub manual_location: Option<String>,
    pub default_location: Option<String>,

    // Weather cache
    pub weather_cache_ttl_seconds: u64,

    // Durable client state
    pub storage_path: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));

        // Wardrobe backend
        let api_url =
            env::var("WARDROBE_API_URL").unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());
        let api_timeout_seconds = parse_or("WARDROBE_API_TIMEOUT_SECONDS", 120);

        // Location
        let ip_geolocation_url = env::var("IP_GEOLOCATION_URL")
            .unwrap_or_else(|_| "https://get.geojs.io/v1/ip/geo.json".to_string());
        let geolocation_timeout_ms = parse_or("GEOLOCATION_TIMEOUT_MS", 5000);
        let device_position = match (env::var("DEVICE_LATITUDE"), env::var("DEVICE_LONGITUDE")) {
            (Ok(lat), Ok(lon)) => {
                let lat: f64 = lat.trim().parse().context("DEVICE_LATITUDE must be a number")?;
                let lon: f64 = lon.trim().parse().context("DEVICE_LONGITUDE must be a number")?;
                Some((lat, lon))
            }
            _ => None,
        };
        let manual_location = non_empty("MANUAL_LOCATION");
        let default_location = non_empty("DEFAULT_LOCATION");

        // Weather cache
        let weather_cache_ttl_seconds = parse_or("WEATHER_CACHE_TTL_SECONDS", 3600); // 1 hour default

        let storage_path = env::var("WARDROBE_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("wardrobe-state.json"));

        Ok(Settings {
            env,
            api_url,
            api_timeout_seconds,
            ip_geolocation_url,
            geolocation_timeout_ms,
            device_position,
            manual_location,
            default_location,
            weather_cache_ttl_seconds,
            storage_path,
        })
    }

    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_millis(self.geolocation_timeout_ms)
    }

    pub fn weather_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.weather_cache_ttl_seconds)
    }
}

fn parse_or(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
