use crate::error::{Result, ScoutError};
use crate::models::Listing;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Category stored when the page doesn't show one
pub const DEFAULT_CATEGORY: &str = "기타";

/// Image stored when the page doesn't show one
pub const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/150";

/// Attributes checked, in order, for an image source. Lazy-loaded
/// thumbnails keep the real URL in `data-original`.
const IMAGE_ATTRS: [&str; 3] = ["data-original", "data-src", "src"];

fn parse_selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw).map_err(|e| ScoutError::Selector {
        selector: raw.to_string(),
        message: e.to_string(),
    })
}

/// Selectors applied to a search result page
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    pub item: Selector,
    pub name: Selector,
    pub address: Selector,
    pub category: Selector,
    pub image: Selector,
}

impl ListingSelectors {
    pub fn new(item: &str, name: &str, address: &str, category: &str, image: &str) -> Result<Self> {
        Ok(Self {
            item: parse_selector(item)?,
            name: parse_selector(name)?,
            address: parse_selector(address)?,
            category: parse_selector(category)?,
            image: parse_selector(image)?,
        })
    }

    /// Layout of the Korean Tabelog search page
    pub fn tabelog() -> Result<Self> {
        Self::new(
            "div.list-rst",
            "a.list-rst__rst-name-target",
            ".list-rst__address",
            ".list-rst__genre",
            "img.js-thumbnail-img",
        )
    }
}

/// Selectors applied to a restaurant detail page
#[derive(Debug, Clone)]
pub struct DetailSelectors {
    pub address: Selector,
    pub category: Selector,
    pub image: Selector,
}

impl DetailSelectors {
    pub fn new(address: &str, category: &str, image: &str) -> Result<Self> {
        Ok(Self {
            address: parse_selector(address)?,
            category: parse_selector(category)?,
            image: parse_selector(image)?,
        })
    }

    pub fn tabelog() -> Result<Self> {
        Self::new(
            "p.rstinfo-table__address",
            ".rdheader-subinfo__item-text span",
            ".rstdtl-top-postphoto__photo img",
        )
    }
}

/// Pull every listing off a search page.
///
/// Each field degrades to its default when its element is missing or
/// empty; only a listing without a name is dropped. When no result
/// container matches, every name anchor on the page is taken as a
/// listing of its own.
pub fn extract_listings(html: &str, page_url: &Url, selectors: &ListingSelectors) -> Vec<Listing> {
    let document = Html::parse_document(html);
    let items: Vec<ElementRef> = document.select(&selectors.item).collect();

    if items.is_empty() {
        debug!("No result containers matched, falling back to name anchors");
        return document
            .select(&selectors.name)
            .filter_map(|anchor| listing_from_anchor(anchor, None, page_url, selectors))
            .collect();
    }

    debug!("Found {} result containers", items.len());

    items
        .into_iter()
        .filter_map(|item| {
            let anchor = item.select(&selectors.name).next();
            match anchor {
                Some(anchor) => listing_from_anchor(anchor, Some(item), page_url, selectors),
                None => {
                    debug!("Skipping result container without a name element");
                    None
                }
            }
        })
        .collect()
}

fn listing_from_anchor(
    anchor: ElementRef,
    item: Option<ElementRef>,
    page_url: &Url,
    selectors: &ListingSelectors,
) -> Option<Listing> {
    let name = element_text(anchor);
    if name.is_empty() {
        debug!("Skipping listing with an empty name");
        return None;
    }

    let detail_link = anchor
        .value()
        .attr("href")
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(|href| resolve(page_url, href))
        .unwrap_or_default();

    let address_raw = item
        .and_then(|item| first_text(item, &selectors.address))
        .unwrap_or_default();

    let category_raw = item
        .and_then(|item| first_text(item, &selectors.category))
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    let image_url = item
        .and_then(|item| first_image(item, &selectors.image, page_url))
        .unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string());

    Some(Listing {
        name,
        detail_link,
        address_raw,
        category_raw,
        image_url,
    })
}

/// Overlay fields found on a detail page onto a listing. Fields the detail
/// page doesn't show keep their search page value.
pub fn apply_detail_page(
    listing: &mut Listing,
    html: &str,
    page_url: &Url,
    selectors: &DetailSelectors,
) {
    let document = Html::parse_document(html);
    let root = document.root_element();

    if let Some(address) = first_text(root, &selectors.address) {
        listing.address_raw = address;
    }
    if let Some(category) = first_text(root, &selectors.category) {
        listing.category_raw = category;
    }
    if let Some(image) = first_image(root, &selectors.image, page_url) {
        listing.image_url = image;
    }
}

/// Text of the first non-empty match under `scope`
fn first_text(scope: ElementRef, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .map(element_text)
        .find(|text| !text.is_empty())
}

fn first_image(scope: ElementRef, selector: &Selector, page_url: &Url) -> Option<String> {
    scope.select(selector).find_map(|img| {
        IMAGE_ATTRS
            .iter()
            .filter_map(|attr| img.value().attr(attr))
            .map(str::trim)
            .find(|src| !src.is_empty() && !src.starts_with("data:"))
            .map(|src| resolve(page_url, src))
    })
}

/// Visible text with runs of whitespace collapsed
fn element_text(element: ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn resolve(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}
