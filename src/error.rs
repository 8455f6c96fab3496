//! Error taxonomy for the route-map pipeline.
//!
//! Only static-data failures live here: a bus number with no matching
//! route, or a route with no drawable geometry. Realtime decode and
//! fetch failures are absorbed at their call sites and degrade to an
//! empty vehicle list, so they never appear in this enum.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no route matches bus number {0}")]
    RouteNotFound(String),
    #[error("no shape data for route {0}")]
    NoRouteData(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for the failures a rider can correct themselves (bad bus
    /// number, route with no geometry), as opposed to system faults.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Error::RouteNotFound(_) | Error::NoRouteData(_))
    }
}
