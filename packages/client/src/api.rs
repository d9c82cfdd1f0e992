//! REST client for the complaint backend.

use async_trait::async_trait;
use rescue_geo::Coordinates;

use crate::{ClientError, ComplaintFetcher, http_client, retry};

/// Client for the complaint REST API.
pub struct ComplaintApi {
    client: reqwest::Client,
    base_url: String,
    radius_km: Option<f64>,
}

impl ComplaintApi {
    /// Creates a client for the API rooted at `base_url` (e.g.
    /// `https://api.rescue.example/api`). When `radius_km` is set it is
    /// forwarded to the backend as the nearby search radius; otherwise
    /// the backend default applies.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(base_url: impl Into<String>, radius_km: Option<f64>) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client: http_client()?,
            base_url,
            radius_km,
        })
    }
}

#[async_trait]
impl ComplaintFetcher for ComplaintApi {
    async fn nearby(&self, center: Coordinates) -> Result<Vec<serde_json::Value>, ClientError> {
        let url = format!("{}/complaints/nearby", self.base_url);
        let mut params: Vec<(&str, String)> = vec![
            ("lat", center.lat.to_string()),
            ("lng", center.lng.to_string()),
        ];
        if let Some(radius) = self.radius_km {
            params.push(("radiusKm", radius.to_string()));
        }

        log::debug!("fetching nearby complaints around {center}");
        let body = retry::send_json(|| self.client.get(&url).query(&params)).await?;
        complaints_from_body(body)
    }
}

/// Unwraps the records array from a nearby response.
///
/// Older backend versions return a bare JSON array; newer ones wrap it
/// as `{"complaints": [...]}`. Anything else is a shape error.
fn complaints_from_body(body: serde_json::Value) -> Result<Vec<serde_json::Value>, ClientError> {
    match body {
        serde_json::Value::Array(records) => Ok(records),
        serde_json::Value::Object(mut map) => match map.remove("complaints") {
            Some(serde_json::Value::Array(records)) => Ok(records),
            _ => Err(ClientError::Shape {
                message: "object response without a complaints array".to_string(),
            }),
        },
        _ => Err(ClientError::Shape {
            message: "expected a JSON array or a complaints envelope".to_string(),
        }),
    }
}
