//! Viewer location resolution with a timeout fallback.

use std::time::Duration;

use rescue_geo::{Coordinates, LocationProvider};

/// Resolves the viewer location through `provider`.
///
/// Falls back to `fallback` when the lookup errors or does not answer
/// within `wait`. Returns the coordinates and whether the session is
/// degraded (running on the fallback).
pub async fn resolve_viewer_location(
    provider: &dyn LocationProvider,
    wait: Duration,
    fallback: Coordinates,
) -> (Coordinates, bool) {
    match tokio::time::timeout(wait, provider.locate()).await {
        Ok(Ok(coordinates)) => (coordinates, false),
        Ok(Err(e)) => {
            log::warn!("location lookup failed: {e}; using the default location");
            (fallback, true)
        }
        Err(_) => {
            log::warn!("location lookup timed out after {wait:?}; using the default location");
            (fallback, true)
        }
    }
}
