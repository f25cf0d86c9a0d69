use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One search-result entry as scraped, before enrichment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub name: String,
    pub detail_link: String,
    pub address_raw: String,
    pub category_raw: String,
    pub image_url: String,
}

impl Listing {
    /// Identity of the restaurant on the site. Only scraped fields go into
    /// it, so geocoding results never change which row a listing maps to.
    pub fn listing_key(&self) -> String {
        if self.detail_link.is_empty() {
            format!("{}\n{}", self.name, self.address_raw.trim())
        } else {
            self.detail_link.clone()
        }
    }
}

/// Place data resolved by the geocoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPlace {
    pub country: Option<String>,
    pub city: Option<String>,
    pub formatted_address: String,
    pub lat: f64,
    pub lng: f64,
}

/// A listing with whatever place data could be attached to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedListing {
    pub listing: Listing,
    pub place: Option<GeoPlace>,
}

impl EnrichedListing {
    /// Coordinates usable for a map marker, if any
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.place
            .as_ref()
            .filter(|p| p.lat.is_finite() && p.lng.is_finite())
            .map(|p| (p.lat, p.lng))
    }

    /// Address persisted with the row: the geocoder's canonical form when
    /// available, the scraped text otherwise
    pub fn address(&self) -> &str {
        match &self.place {
            Some(place) if !place.formatted_address.is_empty() => &place.formatted_address,
            _ => &self.listing.address_raw,
        }
    }
}

/// Row about to be written to the `restaurant` table
#[derive(Debug, Clone, PartialEq)]
pub struct NewRestaurant {
    pub listing_key: String,
    pub country: Option<String>,
    pub city: Option<String>,
    pub name: String,
    pub address: String,
    pub category: String,
    pub description: String,
    pub image_url: String,
    pub detail_link: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl NewRestaurant {
    pub fn from_enriched(enriched: &EnrichedListing, description: impl Into<String>) -> Self {
        let listing = &enriched.listing;
        let place = enriched.place.as_ref();

        Self {
            listing_key: listing.listing_key(),
            country: place.and_then(|p| p.country.clone()),
            city: place.and_then(|p| p.city.clone()),
            name: listing.name.clone(),
            address: enriched.address().to_string(),
            category: listing.category_raw.clone(),
            description: description.into(),
            image_url: listing.image_url.clone(),
            detail_link: Some(listing.detail_link.clone()).filter(|l| !l.is_empty()),
            lat: place.map(|p| p.lat),
            lng: place.map(|p| p.lng),
        }
    }
}

/// Persisted restaurant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantRecord {
    pub id: i64,
    pub country: Option<String>,
    pub city: Option<String>,
    pub name: String,
    pub address: String,
    pub category: String,
    pub description: String,
    pub image_url: String,
    pub detail_link: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// User ↔ restaurant bookmark
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedRestaurant {
    pub id: String,
    pub user_id: String,
    pub restaurant_id: i64,
}

/// Joined row returned when listing a user's saved restaurants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRestaurantView {
    pub restaurant_id: i64,
    pub name: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub category: String,
    pub description: String,
    pub image_url: String,
    pub saved_at: DateTime<Utc>,
}
