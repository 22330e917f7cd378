//! Coordinate type and planar geometry helpers for service-area rings.
//!
//! Rings are treated as planar with longitude on the x axis and latitude on
//! the y axis. Service areas span a few kilometres, so the distortion is
//! irrelevant for containment tests.

use serde::{Deserialize, Serialize};

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate from latitude and longitude in degrees.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Builds a coordinate from a GeoJSON-ordered `[longitude, latitude]` pair.
    pub const fn from_lng_lat(longitude: f64, latitude: f64) -> Self {
        Self::new(latitude, longitude)
    }

    /// `false` if either component is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

impl From<(f64, f64)> for Coordinate {
    /// Converts a `(latitude, longitude)` tuple.
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}

/// Axis-aligned bounds of a ring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Inclusive on every edge.
    pub fn contains(&self, point: Coordinate) -> bool {
        point.longitude >= self.min_lng
            && point.longitude <= self.max_lng
            && point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
    }
}

/// Ray-casting containment test.
///
/// A horizontal ray is cast from `point` along its latitude, and the inside
/// flag toggles every time the ray crosses an edge of the ring. The ring is
/// implicitly closed. Points exactly on the boundary may land on either side.
pub fn point_in_polygon(point: Coordinate, ring: &[Coordinate]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let (x, y) = (point.longitude, point.latitude);
    let mut inside = false;
    let mut j = ring.len() - 1;

    for i in 0..ring.len() {
        let (xi, yi) = (ring[i].longitude, ring[i].latitude);
        let (xj, yj) = (ring[j].longitude, ring[j].latitude);

        if (yi > y) != (yj > y) {
            let crossing_x = (xj - xi) * (y - yi) / (yj - yi) + xi;
            if x < crossing_x {
                inside = !inside;
            }
        }
        j = i;
    }

    inside
}

/// Bounds of `ring`, or `None` for an empty ring.
pub fn bounding_box(ring: &[Coordinate]) -> Option<BoundingBox> {
    let first = ring.first()?;
    let mut bbox = BoundingBox {
        min_lng: first.longitude,
        min_lat: first.latitude,
        max_lng: first.longitude,
        max_lat: first.latitude,
    };

    for coord in &ring[1..] {
        bbox.min_lng = bbox.min_lng.min(coord.longitude);
        bbox.min_lat = bbox.min_lat.min(coord.latitude);
        bbox.max_lng = bbox.max_lng.max(coord.longitude);
        bbox.max_lat = bbox.max_lat.max(coord.latitude);
    }

    Some(bbox)
}
