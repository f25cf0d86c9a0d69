use crate::config::{DEFAULT_BASE_URL, DEFAULT_REQUEST_DELAY};
use crate::error::{Result, ScoutError};
use crate::geocode::Geocoder;
use crate::models::{EnrichedListing, Listing, NewRestaurant};
use crate::scrapers::extract::{apply_detail_page, extract_listings};
use crate::scrapers::types::parse_base_url;
use crate::scrapers::{DetailSelectors, ListingSelectors, PageFetcher, SearchQuery};
use crate::store::{InsertOutcome, Store};
use reqwest::Url;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Description stored when the run had no keyword
pub const UNFILTERED_DESCRIPTION: &str = "웹에서 스크래핑된 맛집입니다.";

/// Knobs for one ingestion run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub base_url: Url,
    /// Pause between consecutive detail page fetches
    pub request_delay: Duration,
    pub fetch_details: bool,
    /// Skip listings the geocoder can't place instead of storing them
    /// without coordinates
    pub require_geocode: bool,
    pub selectors: ListingSelectors,
    pub detail_selectors: DetailSelectors,
}

impl PipelineOptions {
    pub fn tabelog() -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(DEFAULT_BASE_URL)?,
            request_delay: DEFAULT_REQUEST_DELAY,
            fetch_details: true,
            require_geocode: true,
            selectors: ListingSelectors::tabelog()?,
            detail_selectors: DetailSelectors::tabelog()?,
        })
    }
}

/// What happened to one listing
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Inserted(i64),
    AlreadyPresent,
    GeocodeMiss,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemReport {
    pub name: String,
    pub outcome: ItemOutcome,
}

/// Totals for one run, plus the listings that can go on a map
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub keyword: String,
    pub items: Vec<ItemReport>,
    pub mapped: Vec<EnrichedListing>,
}

impl RunSummary {
    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|i| pred(&i.outcome)).count()
    }

    pub fn found(&self) -> usize {
        self.items.len()
    }

    pub fn inserted(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Inserted(_)))
    }

    pub fn already_present(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::AlreadyPresent))
    }

    pub fn geocode_misses(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::GeocodeMiss))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed(_)))
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "keyword '{}': {} found, {} inserted, {} already present, {} not geocoded, {} failed",
            self.keyword,
            self.found(),
            self.inserted(),
            self.already_present(),
            self.geocode_misses(),
            self.failed()
        )
    }
}

/// Search → detail fetch → geocode → persist, one listing at a time
pub struct IngestPipeline<F, G> {
    fetcher: F,
    geocoder: Option<G>,
    store: Store,
    options: PipelineOptions,
}

impl<F: PageFetcher, G: Geocoder> IngestPipeline<F, G> {
    pub fn new(fetcher: F, geocoder: Option<G>, store: Store, options: PipelineOptions) -> Self {
        Self {
            fetcher,
            geocoder,
            store,
            options,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Like `run`, but gives up with `ScoutError::Cancelled` as soon as
    /// `cancel` resolves. Rows committed before that stay committed.
    pub async fn run_until<C>(&self, keyword: &str, cancel: C) -> Result<RunSummary>
    where
        C: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancel => {
                warn!("Run for '{}' cancelled", keyword);
                Err(ScoutError::Cancelled {
                    keyword: keyword.to_string(),
                })
            }
            result = self.run(keyword) => result,
        }
    }

    /// Run one keyword through the pipeline.
    ///
    /// Only a failed search page fetch ends the run early. Every per-listing
    /// problem is recorded in the summary and the loop moves on.
    pub async fn run(&self, keyword: &str) -> Result<RunSummary> {
        let query = SearchQuery::new(keyword);
        let url = query.url(&self.options.base_url);

        info!("Searching {} for '{}'", self.fetcher.source_name(), query.keyword());
        let page = self.fetcher.fetch(&url).await?;

        let listings = extract_listings(&page.body, &page.url, &self.options.selectors);
        if listings.is_empty() {
            warn!("No listings found for '{}'", query.keyword());
        } else {
            info!("Found {} listings", listings.len());
        }

        let description = description_for(&query);
        let total = listings.len();
        let mut summary = RunSummary {
            keyword: query.keyword().to_string(),
            ..Default::default()
        };
        let mut detail_fetches = 0usize;

        for (idx, listing) in listings.into_iter().enumerate() {
            let name = listing.name.clone();
            let (outcome, enriched) = self
                .process(listing, &description, &mut detail_fetches)
                .await;

            match &outcome {
                ItemOutcome::Inserted(id) => info!("[{}/{}] Saved {} (id {})", idx + 1, total, name, id),
                ItemOutcome::AlreadyPresent => {
                    info!("[{}/{}] Skipped {}: already stored", idx + 1, total, name)
                }
                ItemOutcome::GeocodeMiss => {
                    warn!("[{}/{}] Skipped {}: address not found", idx + 1, total, name)
                }
                ItemOutcome::Failed(reason) => {
                    warn!("[{}/{}] Failed {}: {}", idx + 1, total, name, reason)
                }
            }

            if let Some(enriched) = enriched.filter(|e| e.coordinates().is_some()) {
                summary.mapped.push(enriched);
            }
            summary.items.push(ItemReport { name, outcome });
        }

        info!("{}", summary);
        Ok(summary)
    }

    /// Handle one listing. The enriched listing is returned whenever the
    /// restaurant ends up stored, whether by this run or an earlier one.
    async fn process(
        &self,
        mut listing: Listing,
        description: &str,
        detail_fetches: &mut usize,
    ) -> (ItemOutcome, Option<EnrichedListing>) {
        if self.options.fetch_details && !listing.detail_link.is_empty() {
            if *detail_fetches > 0 && !self.options.request_delay.is_zero() {
                tokio::time::sleep(self.options.request_delay).await;
            }
            *detail_fetches += 1;

            if let Err(reason) = self.load_details(&mut listing).await {
                return (ItemOutcome::Failed(reason), None);
            }
        }

        let place = match &self.geocoder {
            Some(geocoder) => {
                let text = geocode_text(&listing);
                match geocoder.geocode(text).await {
                    Ok(Some(place)) => Some(place),
                    Ok(None) if self.options.require_geocode => {
                        return (ItemOutcome::GeocodeMiss, None)
                    }
                    Ok(None) => None,
                    Err(e) => return (ItemOutcome::Failed(e.to_string()), None),
                }
            }
            None => None,
        };

        let enriched = EnrichedListing { listing, place };
        let row = NewRestaurant::from_enriched(&enriched, description);

        match self.store.insert_restaurant(&row) {
            Ok(InsertOutcome::Inserted(id)) => (ItemOutcome::Inserted(id), Some(enriched)),
            Ok(InsertOutcome::AlreadyPresent) => (ItemOutcome::AlreadyPresent, Some(enriched)),
            Err(e) => (ItemOutcome::Failed(e.to_string()), None),
        }
    }

    async fn load_details(&self, listing: &mut Listing) -> std::result::Result<(), String> {
        let url = Url::parse(&listing.detail_link)
            .map_err(|e| format!("bad detail link `{}`: {}", listing.detail_link, e))?;
        let page = self.fetcher.fetch(&url).await.map_err(|e| e.to_string())?;
        apply_detail_page(listing, &page.body, &page.url, &self.options.detail_selectors);
        Ok(())
    }
}

/// Address text sent to the geocoder; the name stands in when the page
/// had no address
fn geocode_text(listing: &Listing) -> &str {
    if listing.address_raw.trim().is_empty() {
        &listing.name
    } else {
        &listing.address_raw
    }
}

pub fn description_for(query: &SearchQuery) -> String {
    if query.is_empty() {
        UNFILTERED_DESCRIPTION.to_string()
    } else {
        format!("검색어 '{}'로 검색된 맛집", query.keyword())
    }
}
