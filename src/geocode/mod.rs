pub mod google;

use crate::error::{Result, ScoutError};
use crate::models::GeoPlace;
use async_trait::async_trait;
use serde::Deserialize;

pub use google::GoogleGeocoder;

/// Resolves free-text addresses to place data.
/// `Ok(None)` means the service found nothing for the address.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Option<GeoPlace>>;
}

/// Geocoding API response body
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResult {
    #[serde(default)]
    pub formatted_address: String,
    pub geometry: Geometry,
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
}

impl AddressComponent {
    fn has_type(&self, wanted: &str) -> bool {
        self.types.iter().any(|t| t == wanted)
    }
}

const CITY_TYPES: [&str; 2] = ["locality", "administrative_area_level_1"];

/// Turn a response into place data, looking at the first result only.
///
/// Country comes from the component typed `country`. City comes from the
/// first component, in response order, typed `locality` or
/// `administrative_area_level_1`.
pub fn place_from_response(response: GeocodeResponse) -> Result<Option<GeoPlace>> {
    match response.status.as_deref() {
        None | Some("OK") | Some("ZERO_RESULTS") => {}
        Some(status) => {
            return Err(ScoutError::Geocode {
                status: status.to_string(),
                message: response.error_message.unwrap_or_default(),
            })
        }
    }

    let Some(first) = response.results.into_iter().next() else {
        return Ok(None);
    };

    let country = first
        .address_components
        .iter()
        .find(|c| c.has_type("country"))
        .map(|c| c.long_name.clone());

    let city = first
        .address_components
        .iter()
        .find(|c| CITY_TYPES.iter().any(|t| c.has_type(t)))
        .map(|c| c.long_name.clone());

    Ok(Some(GeoPlace {
        country,
        city,
        formatted_address: first.formatted_address,
        lat: first.geometry.location.lat,
        lng: first.geometry.location.lng,
    }))
}
