//! Location resolution with an ordered fallback chain.
//!
//! Tiers are tried strictly in order and the first success wins. The default
//! chain is device position (bounded by a hard timeout), then IP geolocation,
//! then manual text. When every tier fails the caller gets
//! [`WardrobeError::LocationUnresolved`] and must prompt the user.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::config::Settings;
use crate::domain::location::{
    Coordinates, IpGeoResponse, LocationKey, LocationSource, ResolvedLocation,
};
use crate::error::{WardrobeError, WardrobeResult};

/// One step of the fallback chain.
#[async_trait]
pub trait LocationTier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn locate(&self) -> WardrobeResult<ResolvedLocation>;
}

// =============================================================================
// Device tier
// =============================================================================

/// Platform positioning (GPS, OS location service).
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self) -> WardrobeResult<Coordinates>;
}

/// Fixed position from configuration. `None` behaves like a denied permission.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticPosition(pub Option<Coordinates>);

#[async_trait]
impl PositionSource for StaticPosition {
    async fn current_position(&self) -> WardrobeResult<Coordinates> {
        self.0.ok_or(WardrobeError::LocationUnresolved)
    }
}

pub struct DeviceTier {
    source: Arc<dyn PositionSource>,
    timeout: Duration,
}

impl DeviceTier {
    pub fn new(source: Arc<dyn PositionSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }
}

#[async_trait]
impl LocationTier for DeviceTier {
    fn name(&self) -> &'static str {
        "device"
    }

    async fn locate(&self) -> WardrobeResult<ResolvedLocation> {
        let coords = tokio::time::timeout(self.timeout, self.source.current_position())
            .await
            .map_err(|_| {
                debug!(timeout_ms = self.timeout.as_millis() as u64, "Device position timed out");
                WardrobeError::LocationUnresolved
            })??;

        Ok(ResolvedLocation {
            key: LocationKey::from_coordinates(coords),
            display_name: None,
            source: LocationSource::Device,
        })
    }
}

// =============================================================================
// IP tier
// =============================================================================

#[async_trait]
pub trait IpGeoLookup: Send + Sync {
    async fn lookup(&self) -> WardrobeResult<IpGeoResponse>;
}

/// HTTP IP-geolocation client (geojs-compatible response).
#[derive(Clone)]
pub struct GeoJsClient {
    client: Client,
    url: String,
}

impl GeoJsClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create geolocation client: {e}"))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl IpGeoLookup for GeoJsClient {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn lookup(&self) -> WardrobeResult<IpGeoResponse> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                warn!(error = %e, "IP geolocation request failed");
                WardrobeError::LocationUnresolved
            })?;

        response.json().await.map_err(|e| {
            warn!(error = %e, "Failed to parse IP geolocation response");
            WardrobeError::LocationUnresolved
        })
    }
}

pub struct IpTier {
    lookup: Arc<dyn IpGeoLookup>,
}

impl IpTier {
    pub fn new(lookup: Arc<dyn IpGeoLookup>) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl LocationTier for IpTier {
    fn name(&self) -> &'static str {
        "ip"
    }

    async fn locate(&self) -> WardrobeResult<ResolvedLocation> {
        let geo = self.lookup.lookup().await?;
        let coords = geo.coordinates().ok_or(WardrobeError::LocationUnresolved)?;

        Ok(ResolvedLocation {
            key: LocationKey::from_coordinates(coords),
            display_name: geo.city().map(str::to_string),
            source: LocationSource::IpLookup,
        })
    }
}

// =============================================================================
// Manual tier
// =============================================================================

/// Text typed by the user. Terminal tier: blank input fails.
pub struct ManualTier {
    input: Option<String>,
}

impl ManualTier {
    pub fn new(input: Option<String>) -> Self {
        Self { input }
    }
}

#[async_trait]
impl LocationTier for ManualTier {
    fn name(&self) -> &'static str {
        "manual"
    }

    async fn locate(&self) -> WardrobeResult<ResolvedLocation> {
        self.input
            .as_deref()
            .and_then(manual_location)
            .ok_or(WardrobeError::LocationUnresolved)
    }
}

/// Resolve a place name entered directly by the user.
pub fn manual_location(input: &str) -> Option<ResolvedLocation> {
    let key = LocationKey::from_place(input)?;
    Some(ResolvedLocation {
        display_name: Some(key.as_str().to_string()),
        key,
        source: LocationSource::Manual,
    })
}

// =============================================================================
// Resolver
// =============================================================================

pub struct LocationResolver {
    tiers: Vec<Box<dyn LocationTier>>,
}

impl LocationResolver {
    pub fn new(tiers: Vec<Box<dyn LocationTier>>) -> Self {
        Self { tiers }
    }

    /// Device, IP and manual tiers wired from settings.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let position = StaticPosition(settings.device_position.map(|(latitude, longitude)| {
            Coordinates {
                latitude,
                longitude,
            }
        }));
        let geo = GeoJsClient::new(
            settings.ip_geolocation_url.clone(),
            Duration::from_secs(settings.api_timeout_seconds),
        )?;

        Ok(Self::new(vec![
            Box::new(DeviceTier::new(Arc::new(position), settings.geolocation_timeout())),
            Box::new(IpTier::new(Arc::new(geo))),
            Box::new(ManualTier::new(settings.manual_location.clone())),
        ]))
    }

    /// Append a tier after the existing ones.
    pub fn push_tier(&mut self, tier: Box<dyn LocationTier>) {
        self.tiers.push(tier);
    }

    #[instrument(skip(self), fields(tiers = self.tiers.len()))]
    pub async fn resolve(&self) -> WardrobeResult<ResolvedLocation> {
        for tier in &self.tiers {
            match tier.locate().await {
                Ok(resolved) => {
                    info!(
                        tier = tier.name(),
                        location = %resolved.key,
                        display_name = resolved.display_name.as_deref().unwrap_or(""),
                        "Location resolved"
                    );
                    return Ok(resolved);
                }
                Err(e) => debug!(tier = tier.name(), error = %e, "Location tier failed"),
            }
        }

        warn!("All location tiers failed");
        Err(WardrobeError::LocationUnresolved)
    }
}
