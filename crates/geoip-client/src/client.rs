use crate::error::{Error, Result};
use city_core::Location;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Body of an ip-api.com-style lookup response.
///
/// The service reports failures in-band: a 200 with `status: "fail"` and a
/// message instead of coordinates.
#[derive(Debug, Deserialize)]
struct LookupResponse {
    status: String,

    #[serde(default)]
    lat: Option<f64>,

    #[serde(default)]
    lon: Option<f64>,

    #[serde(default)]
    message: Option<String>,
}

/// Client for the external IP-geolocation service.
#[derive(Clone)]
pub struct GeoIpClient {
    client: Client,
    base_url: String,
}

impl GeoIpClient {
    /// Create a new client.
    ///
    /// The timeout bounds the whole request; the original upstream call had
    /// none, which let a slow provider stall search requests indefinitely.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Look up coordinates for an IP address.
    ///
    /// The error covers the whole failure surface: network errors,
    /// timeouts, non-2xx statuses, in-band `fail` statuses, and bodies
    /// missing either coordinate. Callers collapse every variant into
    /// their fallback location; nothing here is retried.
    pub async fn lookup(&self, ip: &str) -> Result<Location> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), ip);

        debug!(ip, "Geolocation lookup");

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: LookupResponse = response.json().await?;

        if body.status != "success" {
            return Err(Error::MalformedResponse(body.message.unwrap_or_else(|| {
                format!("upstream status '{}'", body.status)
            })));
        }

        match (body.lat, body.lon) {
            (Some(lat), Some(lon)) => Ok(Location::new(lat, lon)),
            _ => Err(Error::MalformedResponse(
                "missing lat/lon fields".to_string(),
            )),
        }
    }
}
