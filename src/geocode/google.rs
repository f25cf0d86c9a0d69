use crate::error::{Result, ScoutError};
use crate::geocode::{place_from_response, GeocodeResponse, Geocoder};
use crate::models::GeoPlace;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

pub const GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Google Maps Geocoding API client
pub struct GoogleGeocoder {
    client: Client,
    api_key: String,
    language: String,
    endpoint: String,
}

impl GoogleGeocoder {
    pub fn new(api_key: impl Into<String>, language: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ScoutError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            language: language.into(),
            endpoint: GEOCODE_ENDPOINT.to_string(),
        })
    }

    /// Point the client at another endpoint (a proxy or a local stub)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeoPlace>> {
        debug!("Geocoding `{}`", address);

        let transport = |source| ScoutError::Transport {
            url: self.endpoint.clone(),
            source,
        };

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("address", address),
                ("language", self.language.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(ScoutError::Status {
                url: self.endpoint.clone(),
                status: response.status().as_u16(),
            });
        }

        let body: GeocodeResponse = response.json().await.map_err(transport)?;
        place_from_response(body)
    }
}
