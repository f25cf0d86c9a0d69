use crate::error::Result;
use crate::models::EnrichedListing;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const DEFAULT_ZOOM: u8 = 13;

/// What `write_map` did
#[derive(Debug, Clone, PartialEq)]
pub enum MapOutcome {
    Written { path: PathBuf, markers: usize },
    /// No listing had coordinates; nothing was written
    NoMarkers,
}

/// Render a static page with one marker per listing that has coordinates,
/// centered on the first of them. Returns `None` when there is nothing to
/// put on the map.
pub fn render_map(listings: &[EnrichedListing], api_key: &str) -> Option<String> {
    let markers: Vec<serde_json::Value> = listings
        .iter()
        .filter_map(|l| {
            l.coordinates().map(|(lat, lng)| {
                json!({
                    "lat": lat,
                    "lng": lng,
                    "title": l.listing.name,
                    "info": info_window(l),
                })
            })
        })
        .collect();

    let center = markers.first()?;
    let center = json!({ "lat": center["lat"], "lng": center["lng"] });

    Some(format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Restaurant map</title>
  <style>html, body, #map {{ height: 100%; margin: 0; padding: 0; }}</style>
</head>
<body>
  <div id="map"></div>
  <script>
    const markers = {markers};
    function initMap() {{
      const map = new google.maps.Map(document.getElementById("map"), {{
        center: {center},
        zoom: {zoom}
      }});
      const infoWindow = new google.maps.InfoWindow();
      for (const m of markers) {{
        const marker = new google.maps.Marker({{
          position: {{ lat: m.lat, lng: m.lng }},
          map: map,
          title: m.title
        }});
        marker.addListener("click", () => {{
          infoWindow.setContent(m.info);
          infoWindow.open(map, marker);
        }});
      }}
    }}
  </script>
  <script async src="https://maps.googleapis.com/maps/api/js?key={key}&callback=initMap"></script>
</body>
</html>
"#,
        markers = script_json(&serde_json::Value::Array(markers)),
        center = script_json(&center),
        zoom = DEFAULT_ZOOM,
        key = urlencoding::encode(api_key),
    ))
}

/// Write the rendered page to `path`, replacing any previous run's file.
/// With no markers nothing is written.
pub fn write_map(path: &Path, listings: &[EnrichedListing], api_key: &str) -> Result<MapOutcome> {
    let Some(html) = render_map(listings, api_key) else {
        warn!("No listings with coordinates, skipping map rendering");
        return Ok(MapOutcome::NoMarkers);
    };

    let markers = listings.iter().filter(|l| l.coordinates().is_some()).count();
    std::fs::write(path, html)?;
    info!("Saved map with {} markers to {}", markers, path.display());

    Ok(MapOutcome::Written {
        path: path.to_path_buf(),
        markers,
    })
}

fn info_window(listing: &EnrichedListing) -> String {
    format!(
        "<strong>{}</strong><br>{}<br>{}",
        html_escape::encode_safe(&listing.listing.name),
        html_escape::encode_safe(&listing.listing.category_raw),
        html_escape::encode_safe(listing.address()),
    )
}

/// JSON safe to inline inside a `<script>` element
fn script_json(value: &serde_json::Value) -> String {
    value.to_string().replace("</", "<\\/")
}
