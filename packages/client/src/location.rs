//! GeoIP viewer-location provider.
//!
//! A headless feed has no device GPS, so the viewer position comes from
//! an ip-api.com style lookup (`{"lat": .., "lon": ..}`). The feed wraps
//! the call in a timeout and falls back to the configured default
//! location, so a slow or broken lookup only degrades the session.

use async_trait::async_trait;
use rescue_geo::{Coordinates, LocationError, LocationProvider};

use crate::{ClientError, http_client, retry};

/// Default GeoIP lookup endpoint.
pub const DEFAULT_GEOIP_ENDPOINT: &str = "http://ip-api.com/json";

/// [`LocationProvider`] backed by a GeoIP HTTP lookup.
pub struct IpLocation {
    client: reqwest::Client,
    endpoint: String,
}

impl IpLocation {
    /// Creates a provider querying the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ClientError> {
        Ok(Self {
            client: http_client()?,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl LocationProvider for IpLocation {
    async fn locate(&self) -> Result<Coordinates, LocationError> {
        let body = retry::send_json(|| self.client.get(&self.endpoint))
            .await
            .map_err(|e| LocationError::Lookup {
                message: e.to_string(),
            })?;
        coords_from_body(&body).ok_or_else(|| LocationError::Lookup {
            message: "response carried no usable lat/lon".to_string(),
        })
    }
}

/// Extracts a validated coordinate pair from a GeoIP response body.
fn coords_from_body(body: &serde_json::Value) -> Option<Coordinates> {
    let lat = body.get("lat").and_then(serde_json::Value::as_f64)?;
    let lng = body.get("lon").and_then(serde_json::Value::as_f64)?;
    Coordinates::validated(lat, lng)
}
