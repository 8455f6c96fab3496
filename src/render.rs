//! Map rendering collaborator.
//!
//! The pipeline hands a [`MapArtifact`] to a [`MapRenderer`]; the
//! bundled implementation writes a self-contained Leaflet document
//! under a well-known file name so an outer page can iframe it.

use std::path::PathBuf;

use tracing::info;

use crate::error::Error;
use crate::view::MapArtifact;

/// Fixed name the presentation layer looks for.
pub const MAP_FILE_NAME: &str = "toronto_map.html";

pub trait MapRenderer {
    /// Persists the artifact as a viewable document and returns its
    /// path. Must not write anything when it fails.
    fn render(&self, artifact: &MapArtifact) -> Result<PathBuf, Error>;
}

/// Renders the artifact as a Leaflet map over CartoDB positron tiles.
pub struct LeafletRenderer {
    output_dir: PathBuf,
}

impl LeafletRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl MapRenderer for LeafletRenderer {
    fn render(&self, artifact: &MapArtifact) -> Result<PathBuf, Error> {
        let html = leaflet_document(artifact)?;
        let path = self.output_dir.join(MAP_FILE_NAME);
        std::fs::write(&path, html)?;
        info!(
            path = %path.display(),
            polylines = artifact.polylines.len(),
            markers = artifact.markers.len(),
            "Map document written"
        );
        Ok(path)
    }
}

/// Builds the HTML document for an artifact.
///
/// Geometry and popups are embedded as JSON and drawn client-side, so
/// the document needs nothing from this process once written.
pub fn leaflet_document(artifact: &MapArtifact) -> Result<String, Error> {
    let polylines = serde_json::to_string(&artifact.polylines)?;
    let markers = serde_json::to_string(&artifact.markers)?;

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>TTC Route Map</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>html, body, #map {{ height: 100%; margin: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
const map = L.map('map').setView([{lat}, {lon}], {zoom});
L.tileLayer('https://{{s}}.basemaps.cartocdn.com/light_all/{{z}}/{{x}}/{{y}}{{r}}.png', {{
    attribution: '&copy; OpenStreetMap contributors &copy; CARTO'
}}).addTo(map);
const polylines = {polylines};
for (const line of polylines) {{
    L.polyline(line.points, {{
        color: line.color,
        weight: line.weight,
        opacity: line.opacity
    }}).addTo(map);
}}
const markers = {markers};
for (const m of markers) {{
    L.marker([m.latitude, m.longitude]).bindPopup(m.popup).addTo(map);
}}
</script>
</body>
</html>
"#,
        lat = artifact.view.center_lat,
        lon = artifact.view.center_lon,
        zoom = artifact.view.zoom,
    ))
}
