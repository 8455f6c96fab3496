//! Static GTFS topology: route lookup and shape resolution.
//!
//! Joins the agency's `routes.txt`, `trips.txt` and `shapes.txt` tables
//! to turn a rider-facing bus number into the ordered polylines that
//! describe the route's physical path. Every call re-reads the tables
//! from disk; the dataset is small enough that a cache has not been
//! worth the staleness bookkeeping.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::Error;

/// Stroke color used when a route has no `route_color` entry.
pub const DEFAULT_ROUTE_COLOR: &str = "#000000";

/// One row of `routes.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteRecord {
    pub route_id: String,
    pub route_short_name: String,
    #[serde(default)]
    pub route_color: Option<String>,
}

/// One row of `trips.txt`.
#[derive(Debug, Clone, Deserialize)]
pub struct TripRecord {
    pub route_id: String,
    pub trip_id: String,
    pub shape_id: String,
}

/// One vertex of a route polyline, from `shapes.txt`.
///
/// Draw order within a shape is `shape_pt_sequence`, never file row
/// order.
#[derive(Debug, Clone, Deserialize)]
pub struct ShapePoint {
    pub shape_id: String,
    pub shape_pt_lat: f64,
    pub shape_pt_lon: f64,
    pub shape_pt_sequence: u32,
}

/// Shape id → points sorted ascending by `shape_pt_sequence`.
///
/// Returned by value so that resolved topology travels with the request
/// that asked for it; nothing is parked in a shared slot that a second
/// request could overwrite.
pub type ShapeSet = BTreeMap<String, Vec<ShapePoint>>;

/// Handle on a directory of GTFS static tables.
pub struct GtfsStatic {
    dir: PathBuf,
}

impl GtfsStatic {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn table(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Resolves a rider-facing bus number to its `route_id`.
    ///
    /// Matching is string-exact on `route_short_name`; callers coerce
    /// numeric input to a string first. Short names are not guaranteed
    /// unique across route types, so when several rows match, the first
    /// one in file row order wins.
    ///
    /// # Errors
    ///
    /// [`Error::RouteNotFound`] when no row matches, or a CSV/IO error
    /// if `routes.txt` cannot be read.
    pub fn resolve_route(&self, bus_number: &str) -> Result<String, Error> {
        let mut reader = csv::Reader::from_path(self.table("routes.txt"))?;
        for record in reader.deserialize() {
            let route: RouteRecord = record?;
            if route.route_short_name == bus_number {
                debug!(bus_number, route_id = %route.route_id, "Resolved route");
                return Ok(route.route_id);
            }
        }
        Err(Error::RouteNotFound(bus_number.to_string()))
    }

    /// Joins trips and shapes for a route into a [`ShapeSet`].
    ///
    /// # Errors
    ///
    /// [`Error::NoRouteData`] when the route has no trips, or its trips
    /// reference shapes with no points.
    pub fn route_shapes(&self, route_id: &str) -> Result<ShapeSet, Error> {
        let mut reader = csv::Reader::from_path(self.table("trips.txt"))?;
        let mut shape_ids: HashSet<String> = HashSet::new();
        for record in reader.deserialize() {
            let trip: TripRecord = record?;
            if trip.route_id == route_id {
                shape_ids.insert(trip.shape_id);
            }
        }

        if shape_ids.is_empty() {
            return Err(Error::NoRouteData(route_id.to_string()));
        }
        debug!(route_id, shape_count = shape_ids.len(), "Trips joined");

        let mut reader = csv::Reader::from_path(self.table("shapes.txt"))?;
        let mut shapes: ShapeSet = BTreeMap::new();
        for record in reader.deserialize() {
            let point: ShapePoint = record?;
            if shape_ids.contains(&point.shape_id) {
                shapes.entry(point.shape_id.clone()).or_default().push(point);
            }
        }

        if shapes.is_empty() {
            return Err(Error::NoRouteData(route_id.to_string()));
        }

        for points in shapes.values_mut() {
            points.sort_by_key(|p| p.shape_pt_sequence);
        }

        Ok(shapes)
    }

    /// Returns the route's designated stroke color as `#RRGGBB`.
    ///
    /// Never fails: a missing route, an empty color column, or an
    /// unreadable table all degrade to [`DEFAULT_ROUTE_COLOR`].
    pub fn route_color(&self, route_id: &str) -> String {
        match self.lookup_color(route_id) {
            Ok(Some(color)) => color,
            Ok(None) => {
                warn!(route_id, "No color entry for route, using default");
                DEFAULT_ROUTE_COLOR.to_string()
            }
            Err(e) => {
                warn!(route_id, error = %e, "Color lookup failed, using default");
                DEFAULT_ROUTE_COLOR.to_string()
            }
        }
    }

    fn lookup_color(&self, route_id: &str) -> Result<Option<String>, Error> {
        let mut reader = csv::Reader::from_path(self.table("routes.txt"))?;
        for record in reader.deserialize() {
            let route: RouteRecord = record?;
            if route.route_id == route_id {
                let color = route
                    .route_color
                    .filter(|c| !c.is_empty())
                    .map(|c| format!("#{c}"));
                return Ok(color);
            }
        }
        Ok(None)
    }
}

/// Flattens a shape set into bare (lat, lon) pairs for view estimation.
pub fn shape_coordinates(shapes: &ShapeSet) -> Vec<(f64, f64)> {
    shapes
        .values()
        .flat_map(|points| points.iter().map(|p| (p.shape_pt_lat, p.shape_pt_lon)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct Fixture {
        dir: PathBuf,
    }

    impl Fixture {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir().join(format!("ttc_route_map_{name}"));
            let _ = fs::remove_dir_all(&dir);
            fs::create_dir_all(&dir).unwrap();
            Self { dir }
        }

        fn write(&self, table: &str, contents: &str) {
            fs::write(self.dir.join(table), contents).unwrap();
        }

        fn gtfs(&self) -> GtfsStatic {
            GtfsStatic::open(&self.dir)
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }

    #[test]
    fn test_resolve_route_exact_match() {
        let fx = Fixture::new("resolve_exact");
        fx.write(
            "routes.txt",
            "route_id,route_short_name,route_long_name,route_color\n\
             R504,504,King,DA251D\n\
             R505,505,Dundas,\n",
        );

        assert_eq!(fx.gtfs().resolve_route("504").unwrap(), "R504");
    }

    #[test]
    fn test_resolve_route_not_found() {
        let fx = Fixture::new("resolve_missing");
        fx.write(
            "routes.txt",
            "route_id,route_short_name,route_color\nR504,504,DA251D\n",
        );

        let err = fx.gtfs().resolve_route("999").unwrap_err();
        assert!(matches!(err, Error::RouteNotFound(label) if label == "999"));
    }

    #[test]
    fn test_resolve_route_first_match_wins() {
        // Short names are not unique across route types; the first row
        // in file order is the documented winner.
        let fx = Fixture::new("resolve_dup");
        fx.write(
            "routes.txt",
            "route_id,route_short_name,route_color\n\
             R41A,41,\n\
             R41B,41,\n",
        );

        assert_eq!(fx.gtfs().resolve_route("41").unwrap(), "R41A");
    }

    #[test]
    fn test_route_shapes_sorted_by_sequence() {
        let fx = Fixture::new("shapes_sorted");
        fx.write(
            "trips.txt",
            "route_id,trip_id,shape_id\nR504,T1,S1\nR504,T2,S1\n",
        );
        // Rows deliberately out of sequence order.
        fx.write(
            "shapes.txt",
            "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence\n\
             S1,43.65,-79.40,2\n\
             S1,43.66,-79.39,3\n\
             S1,43.64,-79.41,1\n",
        );

        let shapes = fx.gtfs().route_shapes("R504").unwrap();
        assert_eq!(shapes.len(), 1);
        let points = &shapes["S1"];
        let order: Vec<u32> = points.iter().map(|p| p.shape_pt_sequence).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(points.first().unwrap().shape_pt_lat, 43.64);
        assert_eq!(points.last().unwrap().shape_pt_lat, 43.66);
    }

    #[test]
    fn test_route_shapes_excludes_other_routes() {
        let fx = Fixture::new("shapes_filtered");
        fx.write(
            "trips.txt",
            "route_id,trip_id,shape_id\nR504,T1,S1\nR505,T9,S9\n",
        );
        fx.write(
            "shapes.txt",
            "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence\n\
             S1,43.64,-79.41,1\n\
             S9,43.70,-79.30,1\n",
        );

        let shapes = fx.gtfs().route_shapes("R504").unwrap();
        assert!(shapes.contains_key("S1"));
        assert!(!shapes.contains_key("S9"));
    }

    #[test]
    fn test_route_shapes_no_trips_is_no_route_data() {
        let fx = Fixture::new("shapes_no_trips");
        fx.write("trips.txt", "route_id,trip_id,shape_id\nR505,T9,S9\n");
        fx.write(
            "shapes.txt",
            "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence\nS9,43.70,-79.30,1\n",
        );

        let err = fx.gtfs().route_shapes("R504").unwrap_err();
        assert!(matches!(err, Error::NoRouteData(id) if id == "R504"));
    }

    #[test]
    fn test_route_shapes_dangling_shape_id_is_no_route_data() {
        let fx = Fixture::new("shapes_dangling");
        fx.write("trips.txt", "route_id,trip_id,shape_id\nR504,T1,S1\n");
        fx.write(
            "shapes.txt",
            "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence\nS9,43.70,-79.30,1\n",
        );

        let err = fx.gtfs().route_shapes("R504").unwrap_err();
        assert!(matches!(err, Error::NoRouteData(_)));
    }

    #[test]
    fn test_route_color_prefixes_hex() {
        let fx = Fixture::new("color_hex");
        fx.write(
            "routes.txt",
            "route_id,route_short_name,route_color\nR504,504,DA251D\n",
        );

        assert_eq!(fx.gtfs().route_color("R504"), "#DA251D");
    }

    #[test]
    fn test_route_color_empty_column_uses_default() {
        let fx = Fixture::new("color_empty");
        fx.write(
            "routes.txt",
            "route_id,route_short_name,route_color\nR505,505,\n",
        );

        assert_eq!(fx.gtfs().route_color("R505"), DEFAULT_ROUTE_COLOR);
    }

    #[test]
    fn test_route_color_unknown_route_uses_default() {
        let fx = Fixture::new("color_missing");
        fx.write(
            "routes.txt",
            "route_id,route_short_name,route_color\nR504,504,DA251D\n",
        );

        assert_eq!(fx.gtfs().route_color("R999"), DEFAULT_ROUTE_COLOR);
    }

    #[test]
    fn test_route_color_unreadable_table_uses_default() {
        let fx = Fixture::new("color_no_table");
        assert_eq!(fx.gtfs().route_color("R504"), DEFAULT_ROUTE_COLOR);
    }

    #[test]
    fn test_shape_coordinates_flattens_all_shapes() {
        let mut shapes: ShapeSet = BTreeMap::new();
        shapes.insert(
            "S1".to_string(),
            vec![ShapePoint {
                shape_id: "S1".to_string(),
                shape_pt_lat: 43.64,
                shape_pt_lon: -79.41,
                shape_pt_sequence: 1,
            }],
        );
        shapes.insert(
            "S2".to_string(),
            vec![ShapePoint {
                shape_id: "S2".to_string(),
                shape_pt_lat: 43.70,
                shape_pt_lon: -79.30,
                shape_pt_sequence: 1,
            }],
        );

        let coords = shape_coordinates(&shapes);
        assert_eq!(coords, vec![(43.64, -79.41), (43.70, -79.30)]);
    }
}
