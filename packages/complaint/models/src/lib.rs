#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Complaint taxonomy types shared across the rescue feed.
//!
//! This crate defines the canonical category, severity, and status enums
//! that every complaint source normalizes into, plus the reporter details
//! attached to a complaint. Wire values are kebab-case strings; anything
//! the backend sends that we do not recognize falls back to an explicit
//! default rather than failing the record.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Top-level complaint category.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Category {
    /// Railway incidents (level crossings, track obstructions, station hazards)
    Rail,
    /// Road incidents (accidents, blockages, damaged infrastructure)
    Road,
    /// Fires and explosion hazards
    Fire,
    /// Cybercrime and online fraud reports
    Cyber,
    /// Incidents requiring police response
    Police,
    /// Court and legal-process related reports
    Court,
    /// Reports that don't map to any other category
    Other,
}

impl Category {
    /// Parses a wire value, falling back to [`Self::Other`] for anything
    /// unrecognized (including an empty string).
    #[must_use]
    pub fn from_wire(raw: &str) -> Self {
        raw.trim().parse().unwrap_or(Self::Other)
    }

    /// Returns the marker glyph for this category.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Rail => "\u{1f686}",
            Self::Road => "\u{1f6a7}",
            Self::Fire => "\u{1f525}",
            Self::Cyber => "\u{1f4bb}",
            Self::Police => "\u{1f693}",
            Self::Court => "\u{2696}",
            Self::Other => "\u{1f4cc}",
        }
    }

    /// Returns the marker color for this category as a hex string.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Rail => "#8E44AD",
            Self::Road => "#E67E22",
            Self::Fire => "#E74C3C",
            Self::Cyber => "#3498DB",
            Self::Police => "#2C3E50",
            Self::Court => "#7F8C8D",
            Self::Other => "#95A5A6",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Rail,
            Self::Road,
            Self::Fire,
            Self::Cyber,
            Self::Police,
            Self::Court,
            Self::Other,
        ]
    }
}

/// Severity level for a complaint, from 1 (low) to 3 (high).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Severity {
    /// Level 1: informational or minor nuisance
    Low = 1,
    /// Level 2: needs attention, no immediate danger
    Medium = 2,
    /// Level 3: urgent, danger to life or property
    High = 3,
}

impl Severity {
    /// Parses a wire value, falling back to [`Self::Low`] for anything
    /// unrecognized.
    #[must_use]
    pub fn from_wire(raw: &str) -> Self {
        raw.trim().parse().unwrap_or(Self::Low)
    }

    /// Returns the numeric value of this severity level.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Creates a severity level from a numeric value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not in the range 1-3.
    pub const fn from_value(value: u8) -> Result<Self, InvalidSeverityError> {
        match value {
            1 => Ok(Self::Low),
            2 => Ok(Self::Medium),
            3 => Ok(Self::High),
            _ => Err(InvalidSeverityError { value }),
        }
    }

    /// Returns the accent color for this severity as a hex string.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Low => "#2ECC71",
            Self::Medium => "#F39C12",
            Self::High => "#E74C3C",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Medium, Self::High]
    }
}

/// Error returned when attempting to create a [`Severity`] from an invalid
/// numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSeverityError {
    /// The invalid severity value that was provided.
    pub value: u8,
}

impl std::fmt::Display for InvalidSeverityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid severity value {}: expected 1-3", self.value)
    }
}

impl std::error::Error for InvalidSeverityError {}

/// Lifecycle status of a complaint.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Status {
    /// Reported, not yet picked up by a responder
    Pending,
    /// A responder is working the complaint
    InProgress,
    /// Resolved by a responder
    Resolved,
    /// Rejected as invalid or duplicate
    Rejected,
}

impl Status {
    /// Parses a wire value, falling back to [`Self::Pending`] for anything
    /// unrecognized.
    #[must_use]
    pub fn from_wire(raw: &str) -> Self {
        raw.trim().parse().unwrap_or(Self::Pending)
    }

    /// Returns `true` if the complaint still needs responder attention.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Pending, Self::InProgress, Self::Resolved, Self::Rejected]
    }
}

/// Details of the citizen who filed a complaint.
///
/// Every field is optional; the backend omits reporter details for
/// anonymous reports and older records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reporter {
    /// Display name of the reporter.
    pub name: Option<String>,
    /// Contact email of the reporter.
    pub email: Option<String>,
    /// URL of the reporter's avatar image.
    pub avatar_url: Option<String>,
}

impl Reporter {
    /// Extracts reporter details from the raw `user_id` object of a
    /// complaint record.
    ///
    /// Returns `None` when the value is not an object or carries none of
    /// the expected fields, so callers can keep the reporter slot empty
    /// instead of attaching a hollow struct.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        let obj = value.as_object()?;
        let reporter = Self {
            name: non_empty_str(obj, "name"),
            email: non_empty_str(obj, "email"),
            avatar_url: non_empty_str(obj, "profileImage"),
        };
        if reporter.name.is_none() && reporter.email.is_none() && reporter.avatar_url.is_none() {
            return None;
        }
        Some(reporter)
    }
}

/// Gets a non-empty string value from a JSON object by field name.
fn non_empty_str(
    obj: &serde_json::Map<String, serde_json::Value>,
    field: &str,
) -> Option<String> {
    obj.get(field)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_wire_roundtrip() {
        for category in Category::all() {
            let wire = category.to_string();
            assert_eq!(Category::from_wire(&wire), *category);
        }
    }

    #[test]
    fn unknown_category_falls_back_to_other() {
        assert_eq!(Category::from_wire("water-supply"), Category::Other);
        assert_eq!(Category::from_wire(""), Category::Other);
    }

    #[test]
    fn category_parsing_is_case_insensitive() {
        assert_eq!(Category::from_wire("FIRE"), Category::Fire);
        assert_eq!(Category::from_wire(" Road "), Category::Road);
    }

    #[test]
    fn every_category_has_display_metadata() {
        for category in Category::all() {
            assert!(!category.icon().is_empty(), "{category:?} missing icon");
            assert!(
                category.color().starts_with('#'),
                "{category:?} color is not a hex string"
            );
        }
    }

    #[test]
    fn severity_from_value_roundtrip() {
        for v in 1..=3u8 {
            let severity = Severity::from_value(v).unwrap();
            assert_eq!(severity.value(), v);
        }
        assert!(Severity::from_value(0).is_err());
        assert!(Severity::from_value(4).is_err());
    }

    #[test]
    fn unknown_severity_falls_back_to_low() {
        assert_eq!(Severity::from_wire("catastrophic"), Severity::Low);
        assert_eq!(Severity::from_wire(""), Severity::Low);
    }

    #[test]
    fn status_wire_values_match_backend() {
        assert_eq!(Status::from_wire("pending"), Status::Pending);
        assert_eq!(Status::from_wire("in-progress"), Status::InProgress);
        assert_eq!(Status::from_wire("resolved"), Status::Resolved);
        assert_eq!(Status::from_wire("rejected"), Status::Rejected);
        assert_eq!(Status::from_wire("archived"), Status::Pending);
    }

    #[test]
    fn open_statuses() {
        assert!(Status::Pending.is_open());
        assert!(Status::InProgress.is_open());
        assert!(!Status::Resolved.is_open());
        assert!(!Status::Rejected.is_open());
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&Status::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        let back: Status = serde_json::from_str("\"in-progress\"").unwrap();
        assert_eq!(back, Status::InProgress);
    }

    #[test]
    fn reporter_from_full_object() {
        let value = serde_json::json!({
            "name": "Asha Verma",
            "email": "asha@example.com",
            "profileImage": "https://cdn.example.com/avatars/asha.png"
        });
        let reporter = Reporter::from_value(&value).unwrap();
        assert_eq!(reporter.name.as_deref(), Some("Asha Verma"));
        assert_eq!(reporter.email.as_deref(), Some("asha@example.com"));
        assert_eq!(
            reporter.avatar_url.as_deref(),
            Some("https://cdn.example.com/avatars/asha.png")
        );
    }

    #[test]
    fn reporter_partial_object_keeps_present_fields() {
        let value = serde_json::json!({"name": "Asha Verma", "email": ""});
        let reporter = Reporter::from_value(&value).unwrap();
        assert_eq!(reporter.name.as_deref(), Some("Asha Verma"));
        assert_eq!(reporter.email, None);
        assert_eq!(reporter.avatar_url, None);
    }

    #[test]
    fn reporter_missing_or_hollow_is_none() {
        assert!(Reporter::from_value(&serde_json::Value::Null).is_none());
        assert!(Reporter::from_value(&serde_json::json!("64ab0c")).is_none());
        assert!(Reporter::from_value(&serde_json::json!({})).is_none());
        assert!(Reporter::from_value(&serde_json::json!({"role": "citizen"})).is_none());
    }

    #[test]
    fn reporter_serializes_camel_case() {
        let reporter = Reporter {
            name: None,
            email: None,
            avatar_url: Some("https://cdn.example.com/a.png".to_string()),
        };
        let json = serde_json::to_value(&reporter).unwrap();
        assert!(json.get("avatarUrl").is_some());
    }
}
