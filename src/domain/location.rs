//! Location keys used to partition the weather cache.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::serde_helpers::lenient_number;

/// Canonical weather cache partition key: a place name or `"lon,lat"`.
///
/// Keys are compared verbatim. Two keys naming the same physical place are
/// still distinct cache buckets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationKey(String);

impl LocationKey {
    /// Key for a place name typed by the user. Blank input yields `None`.
    pub fn from_place(name: &str) -> Option<Self> {
        let name = name.trim();
        (!name.is_empty()).then(|| Self(name.to_string()))
    }

    /// Coordinate-pair key, longitude first.
    pub fn from_coordinates(coords: Coordinates) -> Self {
        Self(format!("{},{}", coords.longitude, coords.latitude))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Which tier of the fallback chain produced a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationSource {
    Device,
    IpLookup,
    Manual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub key: LocationKey,
    /// Human-readable place name for user feedback, when the tier knows one.
    pub display_name: Option<String>,
    pub source: LocationSource,
}

/// IP geolocation response. Providers disagree on whether coordinates are
/// numbers or numeric strings, so both are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IpGeoResponse {
    #[serde(default, deserialize_with = "lenient_number")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub longitude: Option<f64>,
    pub city: Option<String>,
}

impl IpGeoResponse {
    pub fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates {
            latitude: self.latitude?,
            longitude: self.longitude?,
        })
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}
