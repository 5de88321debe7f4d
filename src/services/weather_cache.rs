//! Location-keyed weather cache.
//!
//! Each [`LocationKey`] is its own bucket in durable storage holding the
//! normalized snapshot and the time it was fetched. Entries younger than the
//! TTL are served without network access; older ones are refetched and
//! overwritten. A failed refresh never touches the stored entry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::domain::location::LocationKey;
use crate::domain::weather::{WeatherPayload, WeatherSnapshot};
use crate::error::{WardrobeError, WardrobeResult};
use crate::services::WardrobeApi;
use crate::storage::{self, keys, KeyValueStore};

/// Remote weather provider.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch(&self, location: &LocationKey) -> WardrobeResult<WeatherPayload>;
}

#[async_trait]
impl WeatherSource for WardrobeApi {
    async fn fetch(&self, location: &LocationKey) -> WardrobeResult<WeatherPayload> {
        self.weather(location).await
    }
}

/// Wall-clock source, swappable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Stored cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedWeather {
    snapshot: WeatherSnapshot,
    fetched_at: DateTime<Utc>,
}

/// Outcome of [`WeatherCache::get_or_stale`].
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherLookup {
    /// Just fetched from the provider
    Fresh(WeatherSnapshot),
    /// Served from cache within the TTL
    Cached(WeatherSnapshot),
    /// Refresh failed; this is the last known snapshot, past its TTL
    Stale(WeatherSnapshot),
    /// Refresh failed and nothing was cached
    Unavailable,
}

impl WeatherLookup {
    pub fn snapshot(&self) -> Option<&WeatherSnapshot> {
        match self {
            Self::Fresh(s) | Self::Cached(s) | Self::Stale(s) => Some(s),
            Self::Unavailable => None,
        }
    }
}

#[derive(Clone)]
pub struct WeatherCache {
    source: Arc<dyn WeatherSource>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    default_location: Option<LocationKey>,
}

impl WeatherCache {
    pub fn new(source: Arc<dyn WeatherSource>, store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self {
            source,
            store,
            clock: Arc::new(SystemClock),
            ttl,
            default_location: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Location used at bootstrap when none has been persisted yet.
    pub fn with_default_location(mut self, location: Option<LocationKey>) -> Self {
        self.default_location = location;
        self
    }

    /// Snapshot for `location`, from cache when younger than the TTL unless
    /// `force_refresh` is set.
    #[instrument(skip(self, location), fields(location = %location, cache_hit = tracing::field::Empty))]
    pub async fn get(
        &self,
        location: &LocationKey,
        force_refresh: bool,
    ) -> WardrobeResult<WeatherSnapshot> {
        if !force_refresh {
            if let Some(entry) = self.fresh_entry(location) {
                debug!("Weather cache hit");
                tracing::Span::current().record("cache_hit", true);
                return Ok(entry.snapshot);
            }
        }
        tracing::Span::current().record("cache_hit", false);

        self.refresh(location).await
    }

    /// Like [`get`](Self::get), but falls back to the last stored snapshot
    /// when the refresh fails: `Cached` while it is within the TTL, `Stale`
    /// once past it.
    pub async fn get_or_stale(&self, location: &LocationKey, force_refresh: bool) -> WeatherLookup {
        if !force_refresh {
            if let Some(entry) = self.fresh_entry(location) {
                debug!(location = %location, "Weather cache hit");
                return WeatherLookup::Cached(entry.snapshot);
            }
        }

        match self.refresh(location).await {
            Ok(snapshot) => WeatherLookup::Fresh(snapshot),
            Err(e) => match self.entry(location) {
                Some(entry) if self.is_fresh(&entry) => {
                    warn!(location = %location, error = %e, "Forced refresh failed, cache still fresh");
                    WeatherLookup::Cached(entry.snapshot)
                }
                Some(entry) => {
                    warn!(location = %location, error = %e, "Serving stale weather");
                    WeatherLookup::Stale(entry.snapshot)
                }
                None => {
                    warn!(location = %location, error = %e, "No weather available");
                    WeatherLookup::Unavailable
                }
            },
        }
    }

    /// Last stored snapshot regardless of age, with its fetch time.
    pub fn cached(&self, location: &LocationKey) -> Option<(WeatherSnapshot, DateTime<Utc>)> {
        self.entry(location).map(|e| (e.snapshot, e.fetched_at))
    }

    /// Location to show when a session starts: the last one fetched
    /// successfully, else the configured default.
    pub fn bootstrap_location(&self) -> Option<LocationKey> {
        self.store
            .get(keys::PREFERRED_LOCATION)
            .and_then(|raw| LocationKey::from_place(&raw))
            .or_else(|| self.default_location.clone())
    }

    async fn refresh(&self, location: &LocationKey) -> WardrobeResult<WeatherSnapshot> {
        debug!(location = %location, "Fetching weather");

        let payload = self.source.fetch(location).await.map_err(|e| match e {
            WardrobeError::WeatherFetchFailed(msg) => WardrobeError::WeatherFetchFailed(msg),
            other => WardrobeError::WeatherFetchFailed(other.to_string()),
        })?;

        let now = self.clock.now();
        let snapshot = WeatherSnapshot::from_payload(payload, now)?;

        let entry = CachedWeather {
            snapshot: snapshot.clone(),
            fetched_at: now,
        };
        if let Err(e) = storage::set_json(self.store.as_ref(), &keys::weather(location), &entry) {
            warn!(location = %location, error = %e, "Failed to store weather entry");
        }
        if let Err(e) = self.store.set(keys::PREFERRED_LOCATION, location.as_str()) {
            warn!(location = %location, error = %e, "Failed to store preferred location");
        }

        info!(location = %location, temp = snapshot.temp_now, "Weather refreshed");
        Ok(snapshot)
    }

    fn entry(&self, location: &LocationKey) -> Option<CachedWeather> {
        storage::get_json(self.store.as_ref(), &keys::weather(location))
    }

    fn fresh_entry(&self, location: &LocationKey) -> Option<CachedWeather> {
        self.entry(location).filter(|entry| self.is_fresh(entry))
    }

    fn is_fresh(&self, entry: &CachedWeather) -> bool {
        // A timestamp in the future reads as age zero
        let age = (self.clock.now() - entry.fetched_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        age < self.ttl
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        pub fn new(start: DateTime<Utc>) -> Self {
            Self(Mutex::new(start))
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.0.lock();
            *now += chrono::Duration::from_std(by).expect("duration in range");
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock()
        }
    }

    /// Counts fetches; replies from a script, then with a default payload.
    #[derive(Default)]
    pub struct CountingSource {
        pub calls: AtomicUsize,
        pub script: Mutex<VecDeque<WardrobeResult<WeatherPayload>>>,
    }

    impl CountingSource {
        pub fn then(self, reply: WardrobeResult<WeatherPayload>) -> Self {
            self.script.lock().push_back(reply);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WeatherSource for CountingSource {
        async fn fetch(&self, _location: &LocationKey) -> WardrobeResult<WeatherPayload> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(payload(21.0)))
        }
    }

    pub fn payload(temp: f64) -> WeatherPayload {
        serde_json::from_value(serde_json::json!({
            "current": {"temp_real": temp, "skycon": "clear"},
            "today_stat": {"temp_min": temp - 5.0, "temp_max": temp + 3.0}
        }))
        .expect("valid weather fixture")
    }
}
