//! Wires the clients, location resolution, scheduler, and controller
//! into one running feed session.

use std::sync::Arc;

use rescue_client::ComplaintFetcher;
use rescue_client::push::{PushEvent, PushHandle};
use rescue_feed_models::{FeedConfig, FeedNotice, FeedStats, IngestSource};
use rescue_geo::LocationProvider;
use tokio::sync::{mpsc, oneshot};

use crate::controller::FeedController;
use crate::location::resolve_viewer_location;
use crate::scheduler::spawn_refresh;
use crate::sink::RenderSink;

/// One refresh batch in flight is plenty; the next tick waits.
const REFRESH_CHANNEL_BUFFER: usize = 1;

/// Runs one feed session to completion.
///
/// Push events are consumed from the moment the session starts, even
/// while the viewer location is still resolving; the controller buffers
/// them and replays them on readiness. Once the location is known the
/// initial fetch runs, then the refresh loop re-polls until `shutdown`
/// fires (or its sender drops). Teardown aborts the background tasks,
/// clears the sink, and returns the session stats. A shutdown that
/// lands mid-fetch tears down without ingesting the late batch.
pub async fn run_feed(
    config: FeedConfig,
    fetcher: Arc<dyn ComplaintFetcher>,
    push: PushHandle,
    location: Arc<dyn LocationProvider>,
    sink: Arc<dyn RenderSink>,
    mut shutdown: oneshot::Receiver<()>,
) -> FeedStats {
    let mut controller = FeedController::new(config.clone(), Arc::clone(&sink));
    controller.set_sink_ready();

    let PushHandle {
        events: mut push_events,
        task: push_task,
    } = push;
    let mut push_open = true;

    let resolve = resolve_viewer_location(
        location.as_ref(),
        config.location_timeout(),
        config.default_location,
    );
    tokio::pin!(resolve);

    let resolved = loop {
        tokio::select! {
            outcome = &mut resolve => break Some(outcome),
            event = push_events.recv(), if push_open => match event {
                Some(PushEvent::Attached) => controller.set_listener_attached(),
                Some(PushEvent::Complaint(raw)) => controller.ingest(raw, IngestSource::Push),
                None => {
                    log::warn!("push stream ended before the feed was ready");
                    push_open = false;
                }
            },
            _ = &mut shutdown => break None,
        }
    };

    let Some((viewer, degraded)) = resolved else {
        // Shut down before the location resolved.
        push_task.abort();
        controller.shutdown();
        return controller.stats().clone();
    };

    controller.set_viewer_location(viewer);
    if degraded {
        sink.notice(&FeedNotice::DegradedLocation);
    }

    // Initial nearby fetch, raced against shutdown: an unmount during the
    // await tears down without ingesting. A failure degrades to an empty
    // batch; the refresh loop backfills on its next tick.
    let initial = tokio::select! {
        outcome = fetcher.nearby(viewer) => match outcome {
            Ok(batch) => batch,
            Err(e) => {
                log::warn!("initial fetch failed: {e}");
                Vec::new()
            }
        },
        _ = &mut shutdown => {
            push_task.abort();
            controller.shutdown();
            return controller.stats().clone();
        }
    };
    log::info!("initial fetch returned {} complaint(s)", initial.len());
    if initial.is_empty() {
        sink.notice(&FeedNotice::NoRecentReports);
    }
    for raw in initial {
        controller.ingest(raw, IngestSource::InitialFetch);
    }

    let (refresh_tx, mut refresh_rx) = mpsc::channel(REFRESH_CHANNEL_BUFFER);
    let refresh_task = spawn_refresh(
        Arc::clone(&fetcher),
        viewer,
        config.refresh_interval(),
        refresh_tx,
    );

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = push_events.recv(), if push_open => match event {
                Some(PushEvent::Attached) => controller.set_listener_attached(),
                Some(PushEvent::Complaint(raw)) => controller.ingest(raw, IngestSource::Push),
                None => {
                    log::warn!("push stream ended; continuing on refresh only");
                    push_open = false;
                }
            },
            batch = refresh_rx.recv() => match batch {
                Some(batch) => {
                    for raw in batch {
                        controller.ingest(raw, IngestSource::Refresh);
                    }
                }
                None => break,
            },
        }
    }

    refresh_task.abort();
    push_task.abort();
    controller.shutdown();
    controller.stats().clone()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use rescue_client::ClientError;
    use rescue_geo::{Coordinates, LocationError};
    use serde_json::json;

    use super::*;
    use crate::sink::CollectingSink;

    const DELHI: Coordinates = Coordinates {
        lat: 28.6139,
        lng: 77.2090,
    };

    fn complaint(id: &str) -> serde_json::Value {
        json!({
            "_id": id,
            "title": format!("Complaint {id}"),
            "category": "road",
            "severity": "medium",
            "createdAt": "2024-03-01T10:00:00.000Z",
            "location": {"type": "Point", "coordinates": [77.21, 28.62]},
        })
    }

    /// Push handle backed by a plain channel instead of a socket.
    fn stub_push(events: mpsc::Receiver<PushEvent>) -> PushHandle {
        PushHandle {
            events,
            task: tokio::spawn(std::future::pending::<()>()),
        }
    }

    /// Config with a refresh interval long enough to stay out of the way.
    fn quiet_config() -> FeedConfig {
        FeedConfig {
            refresh_interval_secs: 3600,
            ..FeedConfig::default()
        }
    }

    struct StaticFetcher {
        records: Vec<serde_json::Value>,
    }

    #[async_trait]
    impl ComplaintFetcher for StaticFetcher {
        async fn nearby(&self, _center: Coordinates) -> Result<Vec<serde_json::Value>, ClientError> {
            Ok(self.records.clone())
        }
    }

    struct SlowFetcher {
        records: Vec<serde_json::Value>,
        delay: Duration,
    }

    #[async_trait]
    impl ComplaintFetcher for SlowFetcher {
        async fn nearby(&self, _center: Coordinates) -> Result<Vec<serde_json::Value>, ClientError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.records.clone())
        }
    }

    struct SlowLocation {
        coordinates: Coordinates,
        delay: Duration,
    }

    #[async_trait]
    impl LocationProvider for SlowLocation {
        async fn locate(&self) -> Result<Coordinates, LocationError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.coordinates)
        }
    }

    struct NoLocation;

    #[async_trait]
    impl LocationProvider for NoLocation {
        async fn locate(&self) -> Result<Coordinates, LocationError> {
            Err(LocationError::Lookup {
                message: "lookup disabled".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn early_pushes_replay_before_the_initial_fetch() {
        let sink = Arc::new(CollectingSink::new());
        let (push_tx, push_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        // The fetch repeats one pushed id to prove cross-source dedup.
        let fetcher = Arc::new(StaticFetcher {
            records: vec![complaint("f1"), complaint("p1")],
        });
        let location = Arc::new(SlowLocation {
            coordinates: DELHI,
            delay: Duration::from_millis(100),
        });

        push_tx.send(PushEvent::Attached).await.unwrap();
        push_tx.send(PushEvent::Complaint(complaint("p1"))).await.unwrap();
        push_tx.send(PushEvent::Complaint(complaint("p2"))).await.unwrap();

        let feed = tokio::spawn(run_feed(
            quiet_config(),
            fetcher,
            stub_push(push_rx),
            location,
            sink.clone(),
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_millis(500)).await;
        shutdown_tx.send(()).unwrap();
        let stats = tokio::time::timeout(Duration::from_secs(5), feed)
            .await
            .expect("feed should shut down")
            .expect("feed task should not panic");

        // Queued pushes land first (arrival order), then the fetch.
        assert_eq!(sink.card_ids(), vec!["p1", "p2", "f1"]);
        assert_eq!(stats.materialized, 3);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.queued, 2);
        assert_eq!(sink.clear_count(), 1);
    }

    #[tokio::test]
    async fn degraded_location_and_empty_fetch_raise_notices() {
        let sink = Arc::new(CollectingSink::new());
        let (push_tx, push_rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let fetcher = Arc::new(StaticFetcher { records: vec![] });

        push_tx.send(PushEvent::Attached).await.unwrap();

        let feed = tokio::spawn(run_feed(
            quiet_config(),
            fetcher,
            stub_push(push_rx),
            Arc::new(NoLocation),
            sink.clone(),
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_millis(200)).await;
        shutdown_tx.send(()).unwrap();
        let stats = feed.await.expect("feed task should not panic");

        let notices = sink.notices();
        assert!(notices.contains(&FeedNotice::DegradedLocation));
        assert!(notices.contains(&FeedNotice::NoRecentReports));
        assert_eq!(stats.materialized, 0);
    }

    #[tokio::test]
    async fn shutdown_before_location_resolution_is_clean() {
        let sink = Arc::new(CollectingSink::new());
        let (_push_tx, push_rx) = mpsc::channel::<PushEvent>(4);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let fetcher = Arc::new(StaticFetcher {
            records: vec![complaint("f1")],
        });
        let location = Arc::new(SlowLocation {
            coordinates: DELHI,
            delay: Duration::from_secs(60),
        });

        let feed = tokio::spawn(run_feed(
            quiet_config(),
            fetcher,
            stub_push(push_rx),
            location,
            sink.clone(),
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(()).unwrap();
        let stats = tokio::time::timeout(Duration::from_secs(5), feed)
            .await
            .expect("feed should shut down")
            .expect("feed task should not panic");

        assert_eq!(stats.materialized, 0);
        assert!(sink.card_ids().is_empty());
        assert_eq!(sink.clear_count(), 1);
    }

    #[tokio::test]
    async fn shutdown_during_the_initial_fetch_drops_the_batch() {
        let sink = Arc::new(CollectingSink::new());
        let (push_tx, push_rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let fetcher = Arc::new(SlowFetcher {
            records: vec![complaint("late")],
            delay: Duration::from_secs(60),
        });
        let location = Arc::new(SlowLocation {
            coordinates: DELHI,
            delay: Duration::from_millis(10),
        });

        push_tx.send(PushEvent::Attached).await.unwrap();

        let feed = tokio::spawn(run_feed(
            quiet_config(),
            fetcher,
            stub_push(push_rx),
            location,
            sink.clone(),
            shutdown_rx,
        ));

        // Let the location resolve so the fetch is in flight, then unmount.
        tokio::time::sleep(Duration::from_millis(300)).await;
        shutdown_tx.send(()).unwrap();
        let stats = tokio::time::timeout(Duration::from_secs(2), feed)
            .await
            .expect("feed should shut down without waiting out the fetch")
            .expect("feed task should not panic");

        assert_eq!(stats.materialized, 0);
        assert!(sink.card_ids().is_empty());
        assert_eq!(sink.clear_count(), 1);
    }

    #[tokio::test]
    async fn refresh_batches_keep_flowing_after_the_push_stream_ends() {
        let sink = Arc::new(CollectingSink::new());
        let (push_tx, push_rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let fetcher = Arc::new(StaticFetcher {
            records: vec![complaint("f1")],
        });
        let config = FeedConfig {
            refresh_interval_secs: 1,
            ..FeedConfig::default()
        };

        push_tx.send(PushEvent::Attached).await.unwrap();
        drop(push_tx);

        let feed = tokio::spawn(run_feed(
            config,
            fetcher,
            stub_push(push_rx),
            Arc::new(SlowLocation {
                coordinates: DELHI,
                delay: Duration::from_millis(10),
            }),
            sink.clone(),
            shutdown_rx,
        ));

        // Long enough for the initial fetch plus at least one refresh tick.
        tokio::time::sleep(Duration::from_millis(1800)).await;
        shutdown_tx.send(()).unwrap();
        let stats = feed.await.expect("feed task should not panic");

        // The fetch lands once; the refresh re-delivers are duplicates.
        assert_eq!(stats.materialized, 1);
        assert!(stats.duplicates >= 1);
        assert_eq!(sink.card_ids(), vec!["f1"]);
    }
}
