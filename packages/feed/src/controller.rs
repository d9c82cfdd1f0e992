//! Session state and the per-complaint reconciliation pipeline.

use std::collections::BTreeSet;
use std::sync::Arc;

use rescue_feed_models::{FeedConfig, FeedStats, IncidentRecord, IngestSource};
use rescue_geo::Coordinates;
use uuid::Uuid;

use crate::queue::PendingQueue;
use crate::registry::DedupRegistry;
use crate::sink::RenderSink;
use crate::wire;

/// Owns one feed session: the dedup registry, the pending queue, the
/// visible window, and the readiness flags.
///
/// `ingest` is synchronous and never yields, so a payload is always
/// reconciled whole before the next one starts. Readiness is monotonic:
/// once the sink, the viewer location, and the push listener are all in
/// place, the pending queue is replayed and stays empty.
#[allow(clippy::struct_excessive_bools)]
pub struct FeedController {
    session: Uuid,
    config: FeedConfig,
    sink: Arc<dyn RenderSink>,
    viewer: Option<Coordinates>,
    sink_ready: bool,
    location_known: bool,
    listener_attached: bool,
    mounted: bool,
    registry: DedupRegistry,
    pending: PendingQueue,
    visible: Vec<IncidentRecord>,
    markers: BTreeSet<String>,
    stats: FeedStats,
}

impl FeedController {
    #[must_use]
    pub fn new(config: FeedConfig, sink: Arc<dyn RenderSink>) -> Self {
        let session = Uuid::new_v4();
        log::debug!(
            "[{session}] feed controller created (cap {}, cutoff {:?} km)",
            config.visible_cap,
            config.max_distance_km,
        );

        Self {
            session,
            config,
            sink,
            viewer: None,
            sink_ready: false,
            location_known: false,
            listener_attached: false,
            mounted: true,
            registry: DedupRegistry::new(),
            pending: PendingQueue::new(),
            visible: Vec::new(),
            markers: BTreeSet::new(),
            stats: FeedStats::default(),
        }
    }

    /// Runs one raw complaint payload through the pipeline.
    ///
    /// Push payloads that arrive before the feed is ready are buffered
    /// and replayed on readiness; everything else is reconciled in
    /// place. Duplicate ids, invalid coordinates, and records beyond the
    /// distance cutoff are dropped, each bumping its stats counter.
    pub fn ingest(&mut self, raw: serde_json::Value, source: IngestSource) {
        if !self.mounted {
            log::debug!("[{}] ignoring {source} payload after teardown", self.session);
            return;
        }

        if source == IngestSource::Push && !self.is_ready() {
            self.pending.enqueue(raw);
            self.stats.queued += 1;
            log::debug!(
                "[{}] feed not ready, queued push payload ({} pending)",
                self.session,
                self.pending.len(),
            );
            return;
        }

        let Some(id) = wire::extract_id(&raw) else {
            log::warn!("[{}] dropping {source} payload without an id", self.session);
            self.stats.missing_id += 1;
            return;
        };

        if self.registry.has(&id)
            || self.markers.contains(&id)
            || self.visible.iter().any(|record| record.id == id)
        {
            log::debug!("[{}] skipping duplicate complaint {id} from {source}", self.session);
            self.stats.duplicates += 1;
            return;
        }

        let Some(coordinates) = rescue_geo::extract_coordinates(&raw) else {
            log::warn!(
                "[{}] dropping complaint {id} from {source}: missing or invalid coordinates",
                self.session,
            );
            self.stats.missing_coordinates += 1;
            return;
        };

        let Some(viewer) = self.viewer else {
            // Only reachable when an embedder feeds non-push payloads
            // before resolving the viewer location; the driver never does.
            log::warn!(
                "[{}] dropping complaint {id} from {source}: viewer location not resolved",
                self.session,
            );
            return;
        };

        let distance_km = rescue_geo::haversine_km(viewer, coordinates);

        if let Some(cutoff) = self.config.max_distance_km
            && distance_km > cutoff
        {
            log::debug!(
                "[{}] skipping complaint {id}: {distance_km:.1} km away (cutoff {cutoff:.1} km)",
                self.session,
            );
            self.stats.distance_filtered += 1;
            return;
        }

        let record = wire::build_record(&raw, id, coordinates, distance_km);

        // Register before rendering so a failed marker is never retried
        // on a later delivery of the same id.
        self.registry.register(record.id.clone());

        self.visible.insert(0, record.clone());
        self.visible.truncate(self.config.visible_cap);

        match self.sink.place_marker(&record) {
            Ok(()) => {
                self.markers.insert(record.id.clone());
            }
            Err(e) => {
                log::warn!("[{}] {e} (complaint {})", self.session, record.id);
                self.stats.marker_failures += 1;
            }
        }
        self.sink.render_card(&record);

        self.stats.materialized += 1;
        log::info!(
            "[{}] materialized complaint {} from {source} ({:.1} km, {} visible)",
            self.session,
            record.id,
            record.distance_km,
            self.visible.len(),
        );
    }

    /// Marks the render sink as attached.
    pub fn set_sink_ready(&mut self) {
        if !self.mounted || self.sink_ready {
            return;
        }
        self.sink_ready = true;
        log::debug!("[{}] render sink ready", self.session);
        self.maybe_drain();
    }

    /// Records the resolved viewer location. The first resolution wins;
    /// later calls are ignored so every distance in the session is
    /// measured from the same point.
    pub fn set_viewer_location(&mut self, coordinates: Coordinates) {
        if !self.mounted {
            return;
        }
        if let Some(existing) = self.viewer {
            log::debug!(
                "[{}] viewer location already resolved at {existing}, ignoring {coordinates}",
                self.session,
            );
            return;
        }
        self.viewer = Some(coordinates);
        self.location_known = true;
        log::info!("[{}] viewer location resolved: {coordinates}", self.session);
        self.maybe_drain();
    }

    /// Marks the push listener as attached. Reconnects re-announce this;
    /// only the first transition matters.
    pub fn set_listener_attached(&mut self) {
        if !self.mounted || self.listener_attached {
            return;
        }
        self.listener_attached = true;
        log::debug!("[{}] push listener attached", self.session);
        self.maybe_drain();
    }

    /// Replays the pending queue once all three readiness flags are set.
    fn maybe_drain(&mut self) {
        if !self.is_ready() || self.pending.is_empty() {
            return;
        }
        let queued = self.pending.drain_all();
        log::info!(
            "[{}] feed ready, replaying {} queued push payload(s)",
            self.session,
            queued.len(),
        );
        for raw in queued {
            self.ingest(raw, IngestSource::Push);
        }
    }

    /// Tears the session down: drops all retained state, clears the
    /// sink, and logs the stats tally. Idempotent; every entry point is
    /// a no-op afterwards.
    pub fn shutdown(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.registry.clear();
        self.pending.clear();
        self.visible.clear();
        self.markers.clear();
        self.sink.clear();
        log::info!("[{}] feed torn down: {}", self.session, self.stats);
    }

    /// Records currently in the visible window, newest first.
    #[must_use]
    pub fn visible(&self) -> &[IncidentRecord] {
        &self.visible
    }

    #[must_use]
    pub const fn stats(&self) -> &FeedStats {
        &self.stats
    }

    /// `true` once the sink, viewer location, and push listener are all
    /// in place.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.sink_ready && self.location_known && self.listener_attached
    }

    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        self.mounted
    }

    #[must_use]
    pub const fn viewer_location(&self) -> Option<Coordinates> {
        self.viewer
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn registered_len(&self) -> usize {
        self.registry.len()
    }
}
