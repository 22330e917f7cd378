//! Great-circle helpers and an offline circular isochrone provider.
//!
//! The circle approximates a reachable area with a regular polygon of the
//! budget radius. It ignores roads entirely, so it is only ever used when it
//! is configured explicitly (local development, tests, regions without an
//! isochrone backend).

use crate::error::{GeoError, Result};
use crate::geometry::Coordinate;
use crate::traits::Isochrone;

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Vertex count used when none is configured.
const DEFAULT_VERTICES: usize = 32;

/// Great-circle distance between two coordinates in meters.
pub fn haversine_meters(from: Coordinate, to: Coordinate) -> f64 {
    let lat1_rad = from.latitude.to_radians();
    let lat2_rad = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lng = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Point reached by travelling `distance_m` from `origin` on initial
/// bearing `bearing_deg` (clockwise from north).
pub fn destination(origin: Coordinate, bearing_deg: f64, distance_m: f64) -> Coordinate {
    let angular = distance_m / EARTH_RADIUS_M;
    let bearing = bearing_deg.to_radians();
    let lat1 = origin.latitude.to_radians();
    let lng1 = origin.longitude.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lng2 = lng1
        + (bearing.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * lat2.sin());

    Coordinate::new(lat2.to_degrees(), lng2.to_degrees())
}

/// Isochrone provider producing a regular polygon around the center.
#[derive(Debug, Clone)]
pub struct CircleIsochrone {
    pub vertices: usize,
}

impl Default for CircleIsochrone {
    fn default() -> Self {
        Self {
            vertices: DEFAULT_VERTICES,
        }
    }
}

impl CircleIsochrone {
    /// Circle approximated by `vertices` points; fewer than 3 is rejected
    /// when an area is requested.
    pub fn new(vertices: usize) -> Self {
        Self { vertices }
    }
}

impl Isochrone for CircleIsochrone {
    fn isochrone(&self, center: Coordinate, budget_meters: f64) -> Result<Vec<Vec<Coordinate>>> {
        if self.vertices < 3 {
            return Err(GeoError::UpstreamUnavailable(format!(
                "circle isochrone needs at least 3 vertices, configured {}",
                self.vertices
            )));
        }

        let step = 360.0 / self.vertices as f64;
        let ring = (0..self.vertices)
            .map(|i| destination(center, i as f64 * step, budget_meters))
            .collect();

        Ok(vec![ring])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point_in_polygon;

    #[test]
    fn test_haversine_same_point() {
        let p = Coordinate::new(10.78, 106.70);
        assert!(haversine_meters(p, p) < 0.001, "Same point should have ~0 distance");
    }

    #[test]
    fn test_haversine_known_distance() {
        // Ho Chi Minh City to Hanoi, roughly 1,140 km.
        let hcmc = Coordinate::new(10.7769, 106.7009);
        let hanoi = Coordinate::new(21.0278, 105.8342);
        let dist = haversine_meters(hcmc, hanoi);
        assert!(
            dist > 1_100_000.0 && dist < 1_180_000.0,
            "HCMC to Hanoi should be ~1140km, got {}",
            dist
        );
    }

    #[test]
    fn test_destination_round_trips_distance() {
        let origin = Coordinate::new(10.78, 106.70);
        for bearing in [0.0, 45.0, 90.0, 180.0, 270.0] {
            let target = destination(origin, bearing, 2_000.0);
            let dist = haversine_meters(origin, target);
            assert!((dist - 2_000.0).abs() < 1.0, "bearing {} gave {}", bearing, dist);
        }
    }

    #[test]
    fn test_circle_contains_center() {
        let center = Coordinate::new(10.78, 106.70);
        let rings = CircleIsochrone::default().isochrone(center, 3_000.0).unwrap();
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].len(), DEFAULT_VERTICES);
        assert!(point_in_polygon(center, &rings[0]));
        assert!(!point_in_polygon(destination(center, 10.0, 3_500.0), &rings[0]));
    }

    #[test]
    fn test_circle_rejects_degenerate_vertex_count() {
        let err = CircleIsochrone::new(2)
            .isochrone(Coordinate::new(0.0, 0.0), 100.0)
            .unwrap_err();
        assert!(matches!(err, GeoError::UpstreamUnavailable(_)));
    }
}
