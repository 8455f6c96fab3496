//! Realtime feed decoding.
//!
//! Turns raw GTFS-RT protobuf bytes into [`VehicleObservation`] rows for
//! a single route. Live data is best-effort: malformed bytes, missing
//! optional fields and unrecognized enum codes all degrade to defaults
//! rather than failing the request.

use chrono::{DateTime, FixedOffset};
use prost::Message;
use serde::Serialize;
use tracing::{debug, warn};

use crate::gtfs_rt::FeedMessage;

/// Agency local time is a fixed UTC-5 offset with no daylight-saving
/// adjustment. Changing this to a real timezone lookup is a product
/// decision, not a bug fix; riders currently see the same convention in
/// the published schedule exports.
const LOCAL_OFFSET_SECONDS: i32 = -5 * 3600;

/// Sentinel shown when a vehicle report carries no timestamp.
pub const UNKNOWN_TIMESTAMP: &str = "Unknown";

/// One decoded vehicle position report, normalized for display.
///
/// Coordinates are `None` when the feed omitted the position payload;
/// such rows must be filtered out before placing markers.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleObservation {
    pub route_id: String,
    pub vehicle_id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub bearing: Option<f32>,
    pub speed_kmh: f64,
    pub occupancy_status: String,
    pub observed_at_local: String,
}

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid protobuf for a
/// `FeedMessage`.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage, prost::DecodeError> {
    FeedMessage::decode(bytes)
}

/// Decodes a raw feed and returns the observations for one route.
///
/// A malformed feed is logged and absorbed: the caller sees an empty
/// vec, never an error, since live positions are an optional overlay on
/// the static route map.
pub fn decode_vehicles(bytes: &[u8], route_id: &str) -> Vec<VehicleObservation> {
    match parse_feed(bytes) {
        Ok(feed) => observations_for_route(&feed, route_id),
        Err(e) => {
            warn!(error = %e, "Discarding malformed realtime feed");
            Vec::new()
        }
    }
}

/// Extracts the observations for one route from a decoded feed.
///
/// Entities without a vehicle payload are skipped; matching is
/// string-exact on `trip.route_id`. Every optional field has a defined
/// default, so a sparse entity still yields a row.
pub fn observations_for_route(feed: &FeedMessage, route_id: &str) -> Vec<VehicleObservation> {
    let mut observations = Vec::new();

    for entity in &feed.entity {
        let Some(vehicle) = &entity.vehicle else {
            continue;
        };
        let entity_route = vehicle
            .trip
            .as_ref()
            .and_then(|t| t.route_id.as_deref())
            .unwrap_or("");
        if entity_route != route_id {
            continue;
        }

        let position = vehicle.position.as_ref();
        observations.push(VehicleObservation {
            route_id: route_id.to_string(),
            vehicle_id: vehicle
                .vehicle
                .as_ref()
                .and_then(|v| v.id.clone())
                .unwrap_or_default(),
            latitude: position.map(|p| p.latitude as f64),
            longitude: position.map(|p| p.longitude as f64),
            bearing: position.and_then(|p| p.bearing),
            speed_kmh: speed_kmh(position.and_then(|p| p.speed)),
            occupancy_status: occupancy_label(vehicle.occupancy_status).to_string(),
            observed_at_local: local_timestamp(vehicle.timestamp),
        });
    }

    debug!(
        route_id,
        entity_count = feed.entity.len(),
        matched = observations.len(),
        "Feed filtered to route"
    );
    observations
}

/// Extracts the feed-level publish time as a local 12-hour string, e.g.
/// `2023-11-14 05:13:20 PM`. `None` on decode failure or when the
/// header carries no timestamp.
pub fn feed_header_timestamp(bytes: &[u8]) -> Option<String> {
    let feed = parse_feed(bytes).ok()?;
    let local = to_local(feed.header.timestamp?)?;
    Some(local.format("%Y-%m-%d %I:%M:%S %p").to_string())
}

/// Converts a source speed in m/s to km/h, rounded to 2 decimals.
/// Absent speed reads as stationary.
pub fn speed_kmh(speed_ms: Option<f32>) -> f64 {
    match speed_ms {
        Some(speed) => (speed as f64 * 3.6 * 100.0).round() / 100.0,
        None => 0.0,
    }
}

/// Formats an epoch timestamp as local wall-clock time, or the
/// [`UNKNOWN_TIMESTAMP`] sentinel when absent or out of range.
pub fn local_timestamp(epoch_seconds: Option<u64>) -> String {
    epoch_seconds
        .and_then(to_local)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| UNKNOWN_TIMESTAMP.to_string())
}

fn to_local(epoch_seconds: u64) -> Option<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(LOCAL_OFFSET_SECONDS)?;
    let utc = DateTime::from_timestamp(i64::try_from(epoch_seconds).ok()?, 0)?;
    Some(utc.with_timezone(&offset))
}

/// Maps the GTFS-RT occupancy code to its display label.
///
/// Total over all of `i32`: recognized codes get their enum name,
/// anything else (including absent) reads as `UNKNOWN`.
pub fn occupancy_label(code: Option<i32>) -> &'static str {
    match code {
        Some(0) => "EMPTY",
        Some(1) => "MANY_SEATS_AVAILABLE",
        Some(2) => "FEW_SEATS_AVAILABLE",
        Some(3) => "STANDING_ROOM_ONLY",
        Some(4) => "CRUSHED_STANDING_ROOM_ONLY",
        Some(5) => "FULL",
        Some(6) => "NOT_ACCEPTING_PASSENGERS",
        _ => "UNKNOWN",
    }
}
