//! Static geographic distance estimates.

use geo::{HaversineDistance, Point};
use serde::{Deserialize, Serialize};

use crate::domain::Stop;

/// Formula used to derive a geo distance from stop coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoMetric {
    /// Great-circle distance in kilometres.
    #[default]
    Haversine,
    /// Planar distance in raw coordinate units.
    Euclidean,
}

impl GeoMetric {
    /// Distance between two stops. Always symmetric and non-negative.
    pub fn distance(self, a: &Stop, b: &Stop) -> f64 {
        match self {
            GeoMetric::Haversine => {
                // geo points are (x = lon, y = lat)
                let pa = Point::new(a.lon(), a.lat());
                let pb = Point::new(b.lon(), b.lat());
                pa.haversine_distance(&pb) / 1000.0
            }
            GeoMetric::Euclidean => (a.lat() - b.lat()).hypot(a.lon() - b.lon()),
        }
    }

    /// Parse a metric name (`haversine` or `euclidean`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "haversine" => Some(GeoMetric::Haversine),
            "euclidean" => Some(GeoMetric::Euclidean),
            _ => None,
        }
    }
}
