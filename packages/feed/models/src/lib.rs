#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Shared types for the rescue live feed: the canonical incident record
//! the reconciler materializes, feed configuration, ingest source tags,
//! and the per-session stats tally.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rescue_complaint_models::{Category, Reporter, Severity, Status};
use rescue_geo::Coordinates;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A complaint normalized into the feed's canonical shape.
///
/// Created exactly once per unique complaint id and never mutated
/// afterwards; the distance is computed at ingestion against the viewer
/// location of that session and is not recomputed when the viewer moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    /// Backend complaint id (deduplication key).
    pub id: String,
    /// Validated WGS84 position of the complaint.
    pub coordinates: Coordinates,
    /// Complaint category.
    pub category: Category,
    /// Complaint severity.
    pub severity: Severity,
    /// Lifecycle status.
    pub status: Status,
    /// Short headline of the complaint.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Human-readable address string from the report.
    pub address: String,
    /// When the complaint was filed. Falls back to ingestion time when
    /// the source record has a missing or unparseable `createdAt`.
    pub reported_at: DateTime<Utc>,
    /// Distance from the viewer location in kilometers, computed once at
    /// ingestion.
    pub distance_km: f64,
    /// Reporter details, when the backend included them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter: Option<Reporter>,
}

/// Which of the three feed inputs delivered a raw complaint payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum IngestSource {
    /// The one-shot nearby fetch at feed startup.
    InitialFetch,
    /// A real-time `newComplaint` push event.
    Push,
    /// A periodic re-poll batch.
    Refresh,
}

/// User-facing degradation banners the feed can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedNotice {
    /// The viewer location could not be determined in time; the feed is
    /// showing reports around the configured default location.
    DegradedLocation,
    /// The initial fetch returned no complaints.
    NoRecentReports,
}

impl std::fmt::Display for FeedNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DegradedLocation => {
                write!(f, "Location unavailable, showing reports near the default area")
            }
            Self::NoRecentReports => write!(f, "No recent reports nearby"),
        }
    }
}

/// Counters for one feed session, logged as a tally at teardown.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedStats {
    /// Records materialized into the feed.
    pub materialized: u64,
    /// Payloads skipped because their id was already known.
    pub duplicates: u64,
    /// Payloads dropped for a missing or empty id.
    pub missing_id: u64,
    /// Payloads dropped for missing or out-of-range coordinates.
    pub missing_coordinates: u64,
    /// Payloads dropped by the optional distance cutoff.
    pub distance_filtered: u64,
    /// Push payloads buffered while the feed was not ready.
    pub queued: u64,
    /// Marker placements that failed (the record stays registered).
    pub marker_failures: u64,
}

impl std::fmt::Display for FeedStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} materialized ({} duplicates, {} missing id, {} missing coordinates, \
             {} beyond cutoff, {} queued while not ready, {} marker failures)",
            self.materialized,
            self.duplicates,
            self.missing_id,
            self.missing_coordinates,
            self.distance_filtered,
            self.queued,
            self.marker_failures,
        )
    }
}

/// Fallback viewer location when no position can be determined.
pub const DEFAULT_LOCATION: Coordinates = Coordinates {
    lat: 28.6139,
    lng: 77.2090,
};

/// Configuration for a feed session.
///
/// Loaded from a TOML file; every field has a default so a partial (or
/// absent) config is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Base URL of the complaint REST API.
    pub api_url: String,
    /// WebSocket URL of the push stream.
    pub socket_url: String,
    /// Viewer location used when lookup fails or times out.
    pub default_location: Coordinates,
    /// How long to wait for the location provider before falling back.
    pub location_timeout_secs: u64,
    /// Seconds between re-poll fetches.
    pub refresh_interval_secs: u64,
    /// How many records the visible feed retains (oldest evicted first).
    pub visible_cap: usize,
    /// Optional distance cutoff in kilometers. `None` disables the
    /// filter; records farther than the cutoff are dropped before they
    /// are registered, so a closer re-delivery can still land.
    pub max_distance_km: Option<f64>,
    /// Optional radius forwarded to the backend nearby query.
    pub nearby_radius_km: Option<f64>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000/api".to_string(),
            socket_url: "ws://localhost:5000".to_string(),
            default_location: DEFAULT_LOCATION,
            location_timeout_secs: 5,
            refresh_interval_secs: 300,
            visible_cap: 10,
            max_distance_km: None,
            nearby_radius_km: None,
        }
    }
}

impl FeedConfig {
    /// Parses a [`FeedConfig`] from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a field has the
    /// wrong type.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::de::from_str(toml_str)?)
    }

    /// Loads a [`FeedConfig`] from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Location lookup timeout as a [`Duration`].
    #[must_use]
    pub const fn location_timeout(&self) -> Duration {
        Duration::from_secs(self.location_timeout_secs)
    }

    /// Re-poll interval as a [`Duration`].
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// Errors that can occur while loading feed configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing failed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_camel_case() {
        let record = IncidentRecord {
            id: "64ab".to_string(),
            coordinates: Coordinates {
                lat: 28.6139,
                lng: 77.2090,
            },
            category: Category::Fire,
            severity: Severity::High,
            status: Status::Pending,
            title: "Gas leak".to_string(),
            description: String::new(),
            address: "Connaught Place".to_string(),
            reported_at: "2024-03-01T10:00:00Z".parse().unwrap(),
            distance_km: 1.25,
            reporter: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("distanceKm").is_some());
        assert!(json.get("reportedAt").is_some());
        assert_eq!(json.get("category").and_then(|v| v.as_str()), Some("fire"));
        // Absent reporter is omitted, not null.
        assert!(json.get("reporter").is_none());
    }

    #[test]
    fn ingest_source_labels() {
        assert_eq!(IngestSource::InitialFetch.to_string(), "initial-fetch");
        assert_eq!(IngestSource::Push.to_string(), "push");
        assert_eq!(IngestSource::Refresh.to_string(), "refresh");
    }

    #[test]
    fn config_defaults() {
        let config = FeedConfig::default();
        assert_eq!(config.visible_cap, 10);
        assert_eq!(config.refresh_interval_secs, 300);
        assert_eq!(config.location_timeout_secs, 5);
        assert!(config.max_distance_km.is_none());
        assert!((config.default_location.lat - 28.6139).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = FeedConfig::from_toml_str(
            r#"
            api_url = "https://api.rescue.example/api"
            visible_cap = 25
            "#,
        )
        .unwrap();
        assert_eq!(config.api_url, "https://api.rescue.example/api");
        assert_eq!(config.visible_cap, 25);
        assert_eq!(config.refresh_interval_secs, 300);
        assert_eq!(config.socket_url, "ws://localhost:5000");
    }

    #[test]
    fn full_toml_roundtrip() {
        let config = FeedConfig::from_toml_str(
            r#"
            api_url = "https://api.rescue.example/api"
            socket_url = "wss://api.rescue.example"
            location_timeout_secs = 3
            refresh_interval_secs = 120
            visible_cap = 5
            max_distance_km = 25.0
            nearby_radius_km = 10.0

            [default_location]
            lat = 19.0760
            lng = 72.8777
            "#,
        )
        .unwrap();
        assert!((config.max_distance_km.unwrap() - 25.0).abs() < f64::EPSILON);
        assert!((config.nearby_radius_km.unwrap() - 10.0).abs() < f64::EPSILON);
        assert!((config.default_location.lat - 19.0760).abs() < f64::EPSILON);
        assert_eq!(config.refresh_interval(), Duration::from_secs(120));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(FeedConfig::from_toml_str("visible_cap = \"lots\"").is_err());
    }

    #[test]
    fn stats_tally_line() {
        let stats = FeedStats {
            materialized: 5,
            duplicates: 2,
            missing_id: 0,
            missing_coordinates: 1,
            distance_filtered: 0,
            queued: 3,
            marker_failures: 0,
        };
        assert_eq!(
            stats.to_string(),
            "5 materialized (2 duplicates, 0 missing id, 1 missing coordinates, \
             0 beyond cutoff, 3 queued while not ready, 0 marker failures)"
        );
    }

    #[test]
    fn notice_text() {
        assert_eq!(FeedNotice::NoRecentReports.to_string(), "No recent reports nearby");
    }
}
