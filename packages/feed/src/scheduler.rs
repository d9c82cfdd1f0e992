//! Periodic re-poll of the nearby complaints endpoint.

use std::sync::Arc;
use std::time::Duration;

use rescue_client::ComplaintFetcher;
use rescue_geo::Coordinates;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Spawns the re-poll loop: every `period` it fetches the complaints
/// near `center` and sends the raw batch through `tx`.
///
/// The first tick fires one full period after spawn since the initial
/// fetch already covered time zero. A zero period is floored to one
/// second. A failed fetch is logged and skipped; the next tick tries
/// again. The task exits when the receiver closes and is aborted by the
/// driver at teardown.
#[must_use]
pub fn spawn_refresh(
    fetcher: Arc<dyn ComplaintFetcher>,
    center: Coordinates,
    period: Duration,
    tx: mpsc::Sender<Vec<serde_json::Value>>,
) -> tokio::task::JoinHandle<()> {
    let period = if period.is_zero() {
        log::warn!("refresh period of zero, flooring to one second");
        Duration::from_secs(1)
    } else {
        period
    };

    tokio::spawn(async move {
        let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticks.tick().await;
            match fetcher.nearby(center).await {
                Ok(batch) => {
                    log::debug!("refresh fetched {} complaint(s)", batch.len());
                    if tx.send(batch).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    log::warn!("refresh fetch failed, retrying next tick: {e}");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use rescue_client::ClientError;
    use serde_json::json;

    use super::*;

    const CENTER: Coordinates = Coordinates {
        lat: 28.6139,
        lng: 77.2090,
    };

    /// Fails the first call, then returns one complaint per call.
    struct FlakyFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ComplaintFetcher for FlakyFetcher {
        async fn nearby(&self, _center: Coordinates) -> Result<Vec<serde_json::Value>, ClientError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(ClientError::Shape {
                    message: "transient".to_string(),
                })
            } else {
                Ok(vec![json!({"_id": format!("r{n}")})])
            }
        }
    }

    #[tokio::test]
    async fn skips_failed_ticks_and_keeps_polling() {
        let (tx, mut rx) = mpsc::channel(4);
        let fetcher = Arc::new(FlakyFetcher {
            calls: AtomicUsize::new(0),
        });
        let handle = spawn_refresh(fetcher, CENTER, Duration::from_millis(10), tx);

        // The first tick errors; the first batch that arrives is from
        // the second fetch.
        let batch = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("refresh batch should arrive")
            .expect("channel should stay open");
        assert_eq!(
            batch[0].get("_id").and_then(serde_json::Value::as_str),
            Some("r1"),
        );

        handle.abort();
    }

    #[tokio::test]
    async fn exits_when_the_receiver_closes() {
        let (tx, rx) = mpsc::channel(1);
        let fetcher = Arc::new(FlakyFetcher {
            calls: AtomicUsize::new(1),
        });
        let handle = spawn_refresh(fetcher, CENTER, Duration::from_millis(10), tx);
        drop(rx);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("refresh task should exit")
            .expect("refresh task should not panic");
    }
}
