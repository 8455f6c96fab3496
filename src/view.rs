//! Map view composition.
//!
//! Derives a center/zoom from route geometry and assembles polylines
//! and vehicle markers into the artifact the renderer consumes.

use serde::Serialize;

use crate::error::Error;
use crate::realtime::VehicleObservation;
use crate::topology::{ShapeSet, shape_coordinates};

/// Central Toronto, used when there is no geometry to frame.
pub const DEFAULT_CENTER: (f64, f64) = (43.7, -79.4);
pub const DEFAULT_ZOOM: u8 = 12;

pub const POLYLINE_WEIGHT: u32 = 5;
pub const POLYLINE_OPACITY: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapView {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: u8,
}

/// One route path variant, points in draw order.
#[derive(Debug, Clone, Serialize)]
pub struct Polyline {
    pub points: Vec<(f64, f64)>,
    pub color: String,
    pub weight: u32,
    pub opacity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Marker {
    pub latitude: f64,
    pub longitude: f64,
    pub popup: String,
}

/// Everything the renderer needs to draw one route's map.
#[derive(Debug, Clone, Serialize)]
pub struct MapArtifact {
    pub view: MapView,
    pub polylines: Vec<Polyline>,
    pub markers: Vec<Marker>,
}

/// Picks a center and zoom framing the given coordinates.
///
/// Center is the bounding-box midpoint; zoom is a coarse step function
/// of the larger coordinate span. An empty set frames central Toronto
/// at mid-range zoom.
pub fn estimate_view(points: &[(f64, f64)]) -> MapView {
    let Some(&(first_lat, first_lon)) = points.first() else {
        return MapView {
            center_lat: DEFAULT_CENTER.0,
            center_lon: DEFAULT_CENTER.1,
            zoom: DEFAULT_ZOOM,
        };
    };

    let mut min_lat = first_lat;
    let mut max_lat = first_lat;
    let mut min_lon = first_lon;
    let mut max_lon = first_lon;
    for &(lat, lon) in points {
        min_lat = min_lat.min(lat);
        max_lat = max_lat.max(lat);
        min_lon = min_lon.min(lon);
        max_lon = max_lon.max(lon);
    }

    let span = (max_lat - min_lat).max(max_lon - min_lon);
    let zoom = if span < 0.01 {
        15
    } else if span < 0.05 {
        14
    } else if span < 0.1 {
        13
    } else if span < 0.5 {
        12
    } else if span < 1.0 {
        11
    } else {
        10
    };

    MapView {
        center_lat: (min_lat + max_lat) / 2.0,
        center_lon: (min_lon + max_lon) / 2.0,
        zoom,
    }
}

/// Assembles route geometry and vehicle observations into a
/// [`MapArtifact`].
///
/// One polyline per shape, one marker per observation with coordinates;
/// observations without a position are dropped here since a marker
/// cannot be placed for them. Shapes with no vehicles still compose
/// into a valid zero-marker artifact.
///
/// # Errors
///
/// [`Error::NoRouteData`] when the shapes yield no points at all; a
/// route-less map must not be rendered.
pub fn compose(
    route_id: &str,
    shapes: &ShapeSet,
    color: &str,
    vehicles: &[VehicleObservation],
) -> Result<MapArtifact, Error> {
    let coordinates = shape_coordinates(shapes);
    if coordinates.is_empty() {
        return Err(Error::NoRouteData(route_id.to_string()));
    }

    let polylines = shapes
        .values()
        .map(|points| Polyline {
            points: points
                .iter()
                .map(|p| (p.shape_pt_lat, p.shape_pt_lon))
                .collect(),
            color: color.to_string(),
            weight: POLYLINE_WEIGHT,
            opacity: POLYLINE_OPACITY,
        })
        .collect();

    let markers = vehicles
        .iter()
        .filter_map(|v| {
            let (latitude, longitude) = v.latitude.zip(v.longitude)?;
            Some(Marker {
                latitude,
                longitude,
                popup: format!(
                    "Bus {}<br>Speed: {:.1} km/h<br>Occupancy: {}",
                    v.vehicle_id, v.speed_kmh, v.occupancy_status
                ),
            })
        })
        .collect();

    Ok(MapArtifact {
        view: estimate_view(&coordinates),
        polylines,
        markers,
    })
}
