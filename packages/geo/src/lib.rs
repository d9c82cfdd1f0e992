#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Coordinate handling for the rescue feed.
//!
//! Complaint records arrive in two coordinate shapes depending on backend
//! version: a `GeoJSON`-style `location.coordinates` array (`[lng, lat]`)
//! or legacy flat `latitude`/`longitude` fields, sometimes as strings.
//! [`extract_coordinates`] handles all of them leniently; a record that
//! yields no valid pair is simply treated as location-less, never as an
//! error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// A validated WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
}

impl Coordinates {
    /// Creates a coordinate pair, returning `None` unless both values are
    /// finite and within range (lat -90..=90, lng -180..=180).
    ///
    /// Zero is a valid coordinate; records on the equator or prime
    /// meridian are not discarded.
    #[must_use]
    pub fn validated(lat: f64, lng: f64) -> Option<Self> {
        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return None;
        }
        Some(Self { lat, lng })
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lng)
    }
}

/// Extracts a coordinate pair from a raw complaint record.
///
/// Tries the `GeoJSON`-style shape first:
/// `{"location": {"coordinates": [lng, lat]}}` (note the lng-first order),
/// then falls back to legacy flat fields, first non-null wins per axis:
/// `latitude`, `lat`, `location.latitude`, `location.lat` and the
/// equivalent longitude chain. Each field may be a JSON number or a
/// numeric string.
///
/// Returns `None` when no valid in-range pair can be produced.
#[must_use]
pub fn extract_coordinates(record: &serde_json::Value) -> Option<Coordinates> {
    let location = record.get("location");

    // GeoJSON Point: {"coordinates": [lng, lat]}
    if let Some(coords) = location
        .and_then(|l| l.get("coordinates"))
        .and_then(serde_json::Value::as_array)
    {
        let lng = coords.first().and_then(coerce_f64)?;
        let lat = coords.get(1).and_then(coerce_f64)?;
        return Coordinates::validated(lat, lng);
    }

    // Legacy flat fields, top-level first, then nested under location.
    let lat = field_chain(record, location, &["latitude", "lat"])?;
    let lng = field_chain(record, location, &["longitude", "lng"])?;
    Coordinates::validated(lat, lng)
}

/// Tries each field name on the record itself, then on the nested
/// `location` object, returning the first coercible value.
fn field_chain(
    record: &serde_json::Value,
    location: Option<&serde_json::Value>,
    fields: &[&str],
) -> Option<f64> {
    for field in fields {
        if let Some(v) = record.get(field).and_then(coerce_f64) {
            return Some(v);
        }
    }
    for field in fields {
        if let Some(v) = location.and_then(|l| l.get(field)).and_then(coerce_f64) {
            return Some(v);
        }
    }
    None
}

/// Coerces a JSON value to f64, accepting numbers and numeric strings.
fn coerce_f64(value: &serde_json::Value) -> Option<f64> {
    value
        .as_str()
        .and_then(|s| s.trim().parse().ok())
        .or_else(|| value.as_f64())
}

/// Great-circle distance between two points in kilometers (haversine).
#[must_use]
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Error returned when a viewer location cannot be determined.
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    /// The lookup failed (network, provider, or response shape).
    #[error("location lookup failed: {message}")]
    Lookup {
        /// Description of what went wrong.
        message: String,
    },
}

/// Source of the viewer's current location.
///
/// Implementations must be `Send + Sync` so the feed driver can await
/// them from spawned tasks.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Resolves the viewer's current coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError`] if the position cannot be determined.
    async fn locate(&self) -> Result<Coordinates, LocationError>;
}

/// A [`LocationProvider`] that always returns a fixed position.
///
/// Used when the viewer location is supplied up front (CLI flags, tests).
pub struct StaticLocation {
    coordinates: Coordinates,
}

impl StaticLocation {
    /// Creates a provider pinned to the given coordinates.
    #[must_use]
    pub const fn new(coordinates: Coordinates) -> Self {
        Self { coordinates }
    }
}

#[async_trait]
impl LocationProvider for StaticLocation {
    async fn locate(&self) -> Result<Coordinates, LocationError> {
        Ok(self.coordinates)
    }
}
