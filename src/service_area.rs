//! Free-pickup service-area construction.
//!
//! Asks the isochrone provider for the area reachable within a budget from a
//! center and persists the primary ring as a new polygon. Areas are written
//! once per tour configuration and are never refreshed automatically.

use tracing::{info, warn};

use crate::error::{GeoError, Result};
use crate::geometry::Coordinate;
use crate::traits::{Isochrone, PolygonId, PolygonStore};

/// Builds and persists the pickup area around `center`.
pub fn build_pickup_area<I, P>(
    isochrone: &I,
    polygons: &P,
    center: Coordinate,
    budget_meters: f64,
) -> Result<PolygonId>
where
    I: Isochrone + ?Sized,
    P: PolygonStore + ?Sized,
{
    if !budget_meters.is_finite() || budget_meters <= 0.0 {
        return Err(GeoError::InvalidInput(format!(
            "budget must be a positive number of meters, got {}",
            budget_meters
        )));
    }
    if !center.is_finite() {
        return Err(GeoError::InvalidInput("center coordinate is not finite".to_string()));
    }

    let rings = isochrone.isochrone(center, budget_meters).inspect_err(|err| {
        warn!(?center, budget_meters, error = %err, "isochrone request failed");
    })?;

    let ring = rings
        .into_iter()
        .next()
        .and_then(normalize_ring)
        .ok_or_else(|| {
            warn!(?center, budget_meters, "isochrone returned no usable polygon");
            GeoError::UpstreamUnavailable("area could not be computed".to_string())
        })?;

    let polygon_id = polygons.insert_polygon(&ring)?;
    info!(
        polygon = %polygon_id,
        vertices = ring.len(),
        budget_meters,
        "created pickup area"
    );

    Ok(polygon_id)
}

/// Drops the closing vertex when the ring repeats its start and rejects rings
/// that cannot bound an area.
fn normalize_ring(mut ring: Vec<Coordinate>) -> Option<Vec<Coordinate>> {
    if ring.iter().any(|c| !c.is_finite()) {
        return None;
    }
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }

    let mut distinct = ring.clone();
    distinct.dedup();
    if distinct.len() < 3 {
        return None;
    }

    Some(ring)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng)
    }

    #[test]
    fn test_normalize_drops_closing_vertex() {
        let ring = vec![c(0.0, 0.0), c(0.0, 1.0), c(1.0, 1.0), c(0.0, 0.0)];
        assert_eq!(
            normalize_ring(ring),
            Some(vec![c(0.0, 0.0), c(0.0, 1.0), c(1.0, 1.0)])
        );
    }

    #[test]
    fn test_normalize_keeps_open_ring() {
        let ring = vec![c(0.0, 0.0), c(0.0, 1.0), c(1.0, 1.0)];
        assert_eq!(normalize_ring(ring.clone()), Some(ring));
    }

    #[test]
    fn test_normalize_rejects_degenerate_rings() {
        assert_eq!(normalize_ring(vec![]), None);
        assert_eq!(normalize_ring(vec![c(0.0, 0.0), c(0.0, 1.0), c(0.0, 0.0)]), None);
        assert_eq!(
            normalize_ring(vec![c(0.0, 0.0), c(0.0, 0.0), c(1.0, 1.0), c(0.0, 0.0)]),
            None
        );
        assert_eq!(
            normalize_ring(vec![c(0.0, 0.0), c(f64::NAN, 1.0), c(1.0, 1.0)]),
            None
        );
    }
}
