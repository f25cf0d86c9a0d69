// tests/common/mod.rs
//
// In-memory stand-ins for the site and the geocoding service.
//
#![allow(dead_code)]

use async_trait::async_trait;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tabelog_scout::geocode::Geocoder;
use tabelog_scout::models::GeoPlace;
use tabelog_scout::scrapers::{FetchedPage, PageFetcher};
use tabelog_scout::{PipelineOptions, Result, ScoutError, Store};

pub const SEARCH_URL: &str = "https://tabelog.com/kr/rstLst/?sk=%EC%8A%A4%EC%8B%9C";

/// Serves canned pages; anything else is a 404
#[derive(Default)]
pub struct FakeSite {
    pages: HashMap<String, (u16, String)>,
    pub requests: Mutex<Vec<String>>,
}

impl FakeSite {
    pub fn page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), (200, body.into()));
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.pages.insert(url.to_string(), (status, String::new()));
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeSite {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.pages.get(url.as_str()) {
            Some((200, body)) => Ok(FetchedPage {
                url: url.clone(),
                body: body.clone(),
            }),
            Some((status, _)) => Err(ScoutError::Status {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(ScoutError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }

    fn source_name(&self) -> &'static str {
        "fake"
    }
}

pub enum Answer {
    Found(GeoPlace),
    NotFound,
    Denied,
}

/// Answers geocoding requests from a fixed table; unknown addresses are
/// not found
#[derive(Default)]
pub struct FakeGeocoder {
    answers: HashMap<String, Answer>,
    pub queries: Mutex<Vec<String>>,
}

impl FakeGeocoder {
    pub fn found(mut self, address: &str, lat: f64, lng: f64) -> Self {
        self.answers.insert(
            address.to_string(),
            Answer::Found(GeoPlace {
                country: Some("日本".to_string()),
                city: Some("東京都".to_string()),
                formatted_address: format!("{}, Tokyo, Japan", address),
                lat,
                lng,
            }),
        );
        self
    }

    pub fn not_found(mut self, address: &str) -> Self {
        self.answers.insert(address.to_string(), Answer::NotFound);
        self
    }

    pub fn denied(mut self, address: &str) -> Self {
        self.answers.insert(address.to_string(), Answer::Denied);
        self
    }

    pub fn asked(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeoPlace>> {
        self.queries.lock().unwrap().push(address.to_string());
        match self.answers.get(address) {
            Some(Answer::Found(place)) => Ok(Some(place.clone())),
            Some(Answer::Denied) => Err(ScoutError::Geocode {
                status: "REQUEST_DENIED".to_string(),
                message: "bad key".to_string(),
            }),
            Some(Answer::NotFound) | None => Ok(None),
        }
    }
}

/// One search result card in the Tabelog layout
pub fn card(name: &str, href: &str, address: &str) -> String {
    format!(
        r#"<div class="list-rst">
             <h3><a class="list-rst__rst-name-target" href="{href}">{name}</a></h3>
             <p class="list-rst__address">{address}</p>
             <span class="list-rst__genre">Sushi</span>
             <img class="js-thumbnail-img" data-original="https://tblg.k-img.com/{name}.jpg">
           </div>"#
    )
}

pub fn search_page(cards: &[String]) -> String {
    format!("<html><body><div class=\"rstlist\">{}</div></body></html>", cards.join("\n"))
}

pub fn detail_page(address: &str) -> String {
    format!(
        r#"<html><body><table><tr><td><p class="rstinfo-table__address">{address}</p></td></tr></table></body></html>"#
    )
}

pub fn store() -> Store {
    let store = Store::open_in_memory().unwrap();
    store.init_schema().unwrap();
    store
}

pub fn options() -> PipelineOptions {
    let mut options = PipelineOptions::tabelog().unwrap();
    options.request_delay = Duration::ZERO;
    options
}
