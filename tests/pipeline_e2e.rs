// tests/pipeline_e2e.rs
mod common;

use common::*;
use std::time::{Duration, Instant};
use tabelog_scout::map::render_map;
use tabelog_scout::{IngestPipeline, ItemOutcome, ScoutError, Store};

fn two_listing_site() -> FakeSite {
    FakeSite::default()
        .page(
            SEARCH_URL,
            search_page(&[
                card("A", "/kr/tokyo/A1301/13000001/", "Ginza"),
                card("B", "/kr/tokyo/A1301/13000002/", "Nowhere"),
            ]),
        )
        .page("https://tabelog.com/kr/tokyo/A1301/13000001/", detail_page("Ginza"))
        .page("https://tabelog.com/kr/tokyo/A1301/13000002/", detail_page("Nowhere"))
}

#[tokio::test]
async fn sushi_search_stores_geocoded_listing_and_skips_miss() {
    let geocoder = FakeGeocoder::default()
        .found("Ginza", 35.0, 139.0)
        .not_found("Nowhere");
    let pipeline = IngestPipeline::new(two_listing_site(), Some(geocoder), store(), options());

    let summary = pipeline.run("스시").await.unwrap();

    assert_eq!(summary.found(), 2);
    assert_eq!(summary.inserted(), 1);
    assert_eq!(summary.geocode_misses(), 1);
    assert_eq!(summary.items[0].name, "A");
    assert!(matches!(summary.items[0].outcome, ItemOutcome::Inserted(_)));
    assert_eq!(summary.items[1].outcome, ItemOutcome::GeocodeMiss);
    assert_eq!(pipeline.store().count_restaurants().unwrap(), 1);

    let html = render_map(&summary.mapped, "key").unwrap();
    assert_eq!(html.matches(r#""title":"#).count(), 1);
    assert!(html.contains(r#"center: {"lat":35.0,"lng":139.0}"#));
}

#[tokio::test]
async fn stored_row_carries_place_and_page_fields() {
    let geocoder = FakeGeocoder::default().found("Ginza", 35.0, 139.0);
    let pipeline = IngestPipeline::new(two_listing_site(), Some(geocoder), store(), options());

    let summary = pipeline.run("스시").await.unwrap();
    let ItemOutcome::Inserted(id) = summary.items[0].outcome else {
        panic!("expected A to be inserted");
    };

    let record = pipeline.store().get_restaurant(id).unwrap().unwrap();
    assert_eq!(record.name, "A");
    assert_eq!(record.country.as_deref(), Some("日本"));
    assert_eq!(record.city.as_deref(), Some("東京都"));
    assert_eq!(record.address, "Ginza, Tokyo, Japan");
    assert_eq!(record.category, "Sushi");
    assert_eq!(record.description, "검색어 '스시'로 검색된 맛집");
    assert_eq!(record.image_url, "https://tblg.k-img.com/A.jpg");
    assert_eq!(
        record.detail_link.as_deref(),
        Some("https://tabelog.com/kr/tokyo/A1301/13000001/")
    );
    assert_eq!((record.lat, record.lng), (Some(35.0), Some(139.0)));
}

#[tokio::test]
async fn second_run_reports_existing_rows_as_skipped() {
    let geocoder = FakeGeocoder::default()
        .found("Ginza", 35.0, 139.0)
        .found("Nowhere", 34.0, 135.0);
    let pipeline = IngestPipeline::new(two_listing_site(), Some(geocoder), store(), options());

    let first = pipeline.run("스시").await.unwrap();
    let second = pipeline.run("스시").await.unwrap();

    assert_eq!(first.inserted(), 2);
    assert_eq!(second.inserted(), 0);
    assert_eq!(second.already_present(), 2);
    assert_eq!(second.mapped.len(), 2);
    assert_eq!(pipeline.store().count_restaurants().unwrap(), 2);
}

#[tokio::test]
async fn geocoding_a_later_run_does_not_duplicate_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scout.sqlite");
    let open = || {
        let store = Store::open(&path).unwrap();
        store.init_schema().unwrap();
        store
    };

    let plain = IngestPipeline::<_, FakeGeocoder>::new(two_listing_site(), None, open(), options());
    let first = plain.run("스시").await.unwrap();
    drop(plain);

    let geocoder = FakeGeocoder::default()
        .found("Ginza", 35.0, 139.0)
        .found("Nowhere", 34.0, 135.0);
    let geocoded = IngestPipeline::new(two_listing_site(), Some(geocoder), open(), options());
    let second = geocoded.run("스시").await.unwrap();

    assert_eq!(first.inserted(), 2);
    assert_eq!(second.inserted(), 0);
    assert_eq!(second.already_present(), 2);
    assert_eq!(geocoded.store().count_restaurants().unwrap(), 2);
}

#[tokio::test]
async fn cancelled_run_is_an_error() {
    let pipeline = IngestPipeline::<_, FakeGeocoder>::new(two_listing_site(), None, store(), options());

    let err = pipeline.run_until("스시", std::future::ready(())).await.unwrap_err();

    assert!(matches!(err, ScoutError::Cancelled { ref keyword } if keyword == "스시"));
    assert_eq!(pipeline.store().count_restaurants().unwrap(), 0);
}

#[tokio::test]
async fn run_until_finishes_when_never_cancelled() {
    let pipeline = IngestPipeline::<_, FakeGeocoder>::new(two_listing_site(), None, store(), options());

    let summary = pipeline
        .run_until("스시", std::future::pending())
        .await
        .unwrap();

    assert_eq!(summary.inserted(), 2);
}

#[tokio::test]
async fn failed_search_fetch_aborts_run() {
    let site = FakeSite::default().status(SEARCH_URL, 503);
    let pipeline = IngestPipeline::new(site, Some(FakeGeocoder::default()), store(), options());

    let err = pipeline.run("스시").await.unwrap_err();

    assert!(matches!(err, ScoutError::Status { status: 503, .. }));
    assert_eq!(pipeline.store().count_restaurants().unwrap(), 0);
}

#[tokio::test]
async fn failed_detail_fetch_skips_only_that_item() {
    let site = two_listing_site().status("https://tabelog.com/kr/tokyo/A1301/13000001/", 500);
    let geocoder = FakeGeocoder::default()
        .found("Ginza", 35.0, 139.0)
        .found("Nowhere", 34.0, 135.0);
    let pipeline = IngestPipeline::new(site, Some(geocoder), store(), options());

    let summary = pipeline.run("스시").await.unwrap();

    assert!(matches!(summary.items[0].outcome, ItemOutcome::Failed(ref r) if r.contains("500")));
    assert!(matches!(summary.items[1].outcome, ItemOutcome::Inserted(_)));
    assert_eq!(pipeline.store().count_restaurants().unwrap(), 1);
}

#[tokio::test]
async fn geocoding_error_skips_only_that_item() {
    let geocoder = FakeGeocoder::default()
        .denied("Ginza")
        .found("Nowhere", 34.0, 135.0);
    let pipeline = IngestPipeline::new(two_listing_site(), Some(geocoder), store(), options());

    let summary = pipeline.run("스시").await.unwrap();

    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.inserted(), 1);
    assert_eq!(summary.mapped.len(), 1);
    assert_eq!(summary.mapped[0].listing.name, "B");
}

#[tokio::test]
async fn without_geocoder_rows_are_stored_without_coordinates() {
    let pipeline = IngestPipeline::<_, FakeGeocoder>::new(two_listing_site(), None, store(), options());

    let summary = pipeline.run("스시").await.unwrap();

    assert_eq!(summary.inserted(), 2);
    assert!(summary.mapped.is_empty());
    assert_eq!(render_map(&summary.mapped, "key"), None);

    let id = pipeline
        .store()
        .find_restaurant_id("https://tabelog.com/kr/tokyo/A1301/13000002/")
        .unwrap()
        .unwrap();
    let record = pipeline.store().get_restaurant(id).unwrap().unwrap();
    assert_eq!((record.country, record.lat), (None, None));
}

#[tokio::test]
async fn misses_can_be_kept_without_place_data() {
    let geocoder = FakeGeocoder::default().found("Ginza", 35.0, 139.0);
    let mut options = options();
    options.require_geocode = false;
    let pipeline = IngestPipeline::new(two_listing_site(), Some(geocoder), store(), options);

    let summary = pipeline.run("스시").await.unwrap();

    assert_eq!(summary.inserted(), 2);
    assert_eq!(summary.mapped.len(), 1);
}

#[tokio::test]
async fn detail_address_is_what_gets_geocoded() {
    let site = FakeSite::default()
        .page(SEARCH_URL, search_page(&[card("A", "/kr/a/", "Ginza Sta.")]))
        .page("https://tabelog.com/kr/a/", detail_page("東京都中央区銀座 5-1"));
    let geocoder = FakeGeocoder::default().found("東京都中央区銀座 5-1", 35.67, 139.76);
    let pipeline = IngestPipeline::new(site, Some(geocoder), store(), options());

    let summary = pipeline.run("스시").await.unwrap();

    assert_eq!(summary.inserted(), 1);
    assert_eq!(summary.mapped[0].listing.address_raw, "東京都中央区銀座 5-1");
}

#[tokio::test]
async fn search_page_alone_when_details_are_off() {
    let geocoder = FakeGeocoder::default().found("Ginza", 35.0, 139.0);
    let mut options = options();
    options.fetch_details = false;
    let pipeline = IngestPipeline::new(two_listing_site(), Some(geocoder), store(), options);

    pipeline.run("스시").await.unwrap();

    // only the search page was requested
    assert_eq!(pipeline_requests(&pipeline), 1);
}

fn pipeline_requests(pipeline: &IngestPipeline<FakeSite, FakeGeocoder>) -> usize {
    pipeline.fetcher().requested().len()
}

#[tokio::test]
async fn detail_fetches_are_spaced_out() {
    let mut options = options();
    options.request_delay = Duration::from_millis(40);
    let pipeline = IngestPipeline::<_, FakeGeocoder>::new(two_listing_site(), None, store(), options);

    let started = Instant::now();
    pipeline.run("스시").await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(40));
    assert_eq!(pipeline_requests(&pipeline), 3);
}

#[tokio::test]
async fn empty_result_page_is_not_an_error() {
    let site = FakeSite::default().page(SEARCH_URL, search_page(&[]));
    let pipeline = IngestPipeline::new(site, Some(FakeGeocoder::default()), store(), options());

    let summary = pipeline.run("스시").await.unwrap();

    assert_eq!(summary.found(), 0);
    assert_eq!(render_map(&summary.mapped, "key"), None);
}
