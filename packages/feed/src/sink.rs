//! Rendering seam for the feed.
//!
//! The reconciler never draws anything itself; it hands fully formed
//! records to a [`RenderSink`] supplied by the embedder (a terminal
//! renderer in the CLI, a map layer in an app shell).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rescue_feed_models::{FeedNotice, IncidentRecord};

/// Error returned when a marker cannot be placed.
///
/// Placement failures do not unwind the pipeline: the record stays
/// registered and its card is still rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkError {
    pub message: String,
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "marker placement failed: {}", self.message)
    }
}

impl std::error::Error for SinkError {}

/// Consumer of reconciled feed output.
pub trait RenderSink: Send + Sync {
    /// Places a map marker for the record.
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] when the marker cannot be placed. The
    /// caller logs the failure and keeps the record registered.
    fn place_marker(&self, record: &IncidentRecord) -> Result<(), SinkError>;

    /// Renders the feed card for the record.
    fn render_card(&self, record: &IncidentRecord);

    /// Surfaces a degradation banner to the viewer.
    fn notice(&self, notice: &FeedNotice);

    /// Removes everything previously rendered. Called once at teardown.
    fn clear(&self);
}

/// Sink that ignores all output.
pub struct NullSink;

impl RenderSink for NullSink {
    fn place_marker(&self, _record: &IncidentRecord) -> Result<(), SinkError> {
        Ok(())
    }

    fn render_card(&self, _record: &IncidentRecord) {}

    fn notice(&self, _notice: &FeedNotice) {}

    fn clear(&self) {}
}

/// Returns a shared [`NullSink`] instance for convenient use.
#[must_use]
pub fn null_sink() -> Arc<dyn RenderSink> {
    Arc::new(NullSink)
}

/// Sink that renders through the logger, for embedding the feed in a
/// service without a UI.
pub struct LogSink;

impl RenderSink for LogSink {
    fn place_marker(&self, record: &IncidentRecord) -> Result<(), SinkError> {
        log::info!(
            "marker {} ({}) at {}",
            record.id,
            record.category,
            record.coordinates
        );
        Ok(())
    }

    fn render_card(&self, record: &IncidentRecord) {
        log::info!(
            "{} {} [{}] {:.1} km: {}",
            record.category.icon(),
            record.category,
            record.severity,
            record.distance_km,
            record.title
        );
    }

    fn notice(&self, notice: &FeedNotice) {
        log::info!("{notice}");
    }

    fn clear(&self) {
        log::info!("feed cleared");
    }
}

/// Sink that records everything it is handed, for tests and for
/// embedders that query the feed after the fact.
#[derive(Debug, Default)]
pub struct CollectingSink {
    markers: Mutex<Vec<String>>,
    cards: Mutex<Vec<IncidentRecord>>,
    notices: Mutex<Vec<FeedNotice>>,
    clears: AtomicUsize,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn marker_ids(&self) -> Vec<String> {
        self.markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn cards(&self) -> Vec<IncidentRecord> {
        self.cards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Ids of the rendered cards, in render order.
    #[must_use]
    pub fn card_ids(&self) -> Vec<String> {
        self.cards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|record| record.id.clone())
            .collect()
    }

    #[must_use]
    pub fn notices(&self) -> Vec<FeedNotice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl RenderSink for CollectingSink {
    fn place_marker(&self, record: &IncidentRecord) -> Result<(), SinkError> {
        self.markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.id.clone());
        Ok(())
    }

    fn render_card(&self, record: &IncidentRecord) {
        self.cards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }

    fn notice(&self, notice: &FeedNotice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(*notice);
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rescue_complaint_models::{Category, Severity, Status};
    use rescue_geo::Coordinates;

    use super::*;

    fn record(id: &str) -> IncidentRecord {
        IncidentRecord {
            id: id.to_string(),
            title: "Test".to_string(),
            description: String::new(),
            category: Category::Other,
            severity: Severity::Low,
            status: Status::Pending,
            address: String::new(),
            reporter: None,
            coordinates: Coordinates { lat: 0.0, lng: 0.0 },
            distance_km: 0.0,
            reported_at: Utc::now(),
        }
    }

    #[test]
    fn collecting_sink_captures_in_order() {
        let sink = CollectingSink::new();

        sink.place_marker(&record("a")).unwrap();
        sink.render_card(&record("a"));
        sink.place_marker(&record("b")).unwrap();
        sink.render_card(&record("b"));
        sink.notice(&FeedNotice::NoRecentReports);
        sink.clear();

        assert_eq!(sink.marker_ids(), vec!["a", "b"]);
        assert_eq!(sink.card_ids(), vec!["a", "b"]);
        assert_eq!(sink.notices(), vec![FeedNotice::NoRecentReports]);
        assert_eq!(sink.clear_count(), 1);
    }

    #[test]
    fn null_sink_accepts_everything() {
        let sink = null_sink();

        assert!(sink.place_marker(&record("a")).is_ok());
        sink.render_card(&record("a"));
        sink.clear();
    }
}
