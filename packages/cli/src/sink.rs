//! Terminal rendering for feed output.

use chrono::{DateTime, Utc};
use rescue_feed::{RenderSink, SinkError};
use rescue_feed_models::{FeedNotice, IncidentRecord};

/// Renders feed output as terminal lines.
///
/// Cards print as one or two lines. Markers have no terminal
/// representation and are logged at debug level.
pub struct ConsoleSink;

impl RenderSink for ConsoleSink {
    fn place_marker(&self, record: &IncidentRecord) -> Result<(), SinkError> {
        log::debug!("marker {} at {}", record.id, record.coordinates);
        Ok(())
    }

    fn render_card(&self, record: &IncidentRecord) {
        let title = if record.title.is_empty() {
            "(untitled)"
        } else {
            record.title.as_str()
        };
        println!(
            "{} [{}] {:>5.1} km  {}  ({}, {})",
            record.category.icon(),
            record.severity,
            record.distance_km,
            title,
            record.status,
            relative_age(record.reported_at),
        );
        if !record.address.is_empty() {
            println!("   {}", record.address);
        }
    }

    fn notice(&self, notice: &FeedNotice) {
        println!("! {notice}");
    }

    fn clear(&self) {
        log::debug!("feed cleared");
    }
}

/// Coarse "how long ago" label for a card. Future timestamps read as
/// "just now".
fn relative_age(reported_at: DateTime<Utc>) -> String {
    let elapsed = Utc::now().signed_duration_since(reported_at);
    if elapsed.num_days() >= 1 {
        format!("{}d ago", elapsed.num_days())
    } else if elapsed.num_hours() >= 1 {
        format!("{}h ago", elapsed.num_hours())
    } else if elapsed.num_minutes() >= 1 {
        format!("{}m ago", elapsed.num_minutes())
    } else {
        "just now".to_string()
    }
}
