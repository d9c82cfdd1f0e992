//! Normalization of raw complaint JSON into feed records.

use chrono::{DateTime, NaiveDateTime, Utc};
use rescue_complaint_models::{Category, Reporter, Severity, Status};
use rescue_feed_models::IncidentRecord;
use rescue_geo::Coordinates;

/// JSON fields tried for the complaint id, in order.
const ID_FIELDS: &[&str] = &["_id", "id"];

/// Extracts the canonical complaint id.
///
/// Tries each id field in order, taking the first non-empty string.
/// Numeric ids are rendered to strings so both backends compare equal.
#[must_use]
pub fn extract_id(record: &serde_json::Value) -> Option<String> {
    for field in ID_FIELDS {
        if let Some(value) = record.get(field).and_then(serde_json::Value::as_str)
            && !value.is_empty()
        {
            return Some(value.to_string());
        }
        if let Some(value) = record.get(field).and_then(serde_json::Value::as_i64) {
            return Some(value.to_string());
        }
    }

    None
}

/// Parses a backend timestamp.
///
/// RFC 3339 first (`2024-03-01T10:00:00.000Z`), then the zone-less
/// variant some endpoints emit, interpreted as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(parsed.and_utc());
    }

    None
}

/// Builds the canonical record for a complaint that already passed the
/// id, dedup, and coordinate checks.
///
/// Missing or unknown classification fields fall back to their neutral
/// values rather than dropping the complaint. A missing or unparseable
/// `createdAt` falls back to ingestion time.
#[must_use]
pub fn build_record(
    record: &serde_json::Value,
    id: String,
    coordinates: Coordinates,
    distance_km: f64,
) -> IncidentRecord {
    let reported_at = record
        .get("createdAt")
        .and_then(serde_json::Value::as_str)
        .and_then(parse_timestamp)
        .unwrap_or_else(|| {
            log::warn!("complaint {id} has no usable createdAt, using ingestion time");
            Utc::now()
        });

    IncidentRecord {
        title: str_field(record, "title").to_string(),
        description: str_field(record, "description").to_string(),
        category: Category::from_wire(str_field(record, "category")),
        severity: Severity::from_wire(str_field(record, "severity")),
        status: Status::from_wire(str_field(record, "status")),
        address: str_field(record, "address").to_string(),
        reporter: record.get("user_id").and_then(Reporter::from_value),
        coordinates,
        distance_km,
        reported_at,
        id,
    }
}

/// Reads a string field, defaulting to empty when missing or non-string.
fn str_field<'a>(record: &'a serde_json::Value, field: &str) -> &'a str {
    record
        .get(field)
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
}
