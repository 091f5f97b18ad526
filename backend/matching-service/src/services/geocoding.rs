/// Postcode geocoding against postcodes.io
///
/// The upstream publishes a ceiling of 10 requests/second; callers are
/// responsible for pacing (see `GeocodeReconciler`).
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::models::Coordinates;

/// Published request ceiling of the geocoding upstream
pub const GEOCODER_MAX_REQUESTS_PER_SECOND: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("Geocoding request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Geocoding service returned status {0}")]
    UnexpectedStatus(u16),
}

/// Resolves a postcode to coordinates. `Ok(None)` means the upstream
/// answered but knows no location for the postcode.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn lookup(&self, postcode: &str) -> Result<Option<Coordinates>, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct PostcodeResponse {
    result: Option<PostcodeResult>,
}

#[derive(Debug, Deserialize)]
struct PostcodeResult {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

pub struct PostcodesIoGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl PostcodesIoGeocoder {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("matching-service/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn lookup_url(&self, postcode: &str) -> String {
        format!(
            "{}/postcodes/{}",
            self.base_url,
            urlencoding::encode(postcode)
        )
    }
}

#[async_trait]
impl Geocoder for PostcodesIoGeocoder {
    async fn lookup(&self, postcode: &str) -> Result<Option<Coordinates>, GeocodeError> {
        let response = self.client.get(self.lookup_url(postcode)).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(postcode = %postcode, "Postcode unknown to geocoder");
                Ok(None)
            }
            status if status.is_success() => {
                let body: PostcodeResponse = response.json().await?;
                Ok(body.result.and_then(|r| {
                    Some(Coordinates {
                        latitude: r.latitude?,
                        longitude: r.longitude?,
                    })
                }))
            }
            status => Err(GeocodeError::UnexpectedStatus(status.as_u16())),
        }
    }
}
