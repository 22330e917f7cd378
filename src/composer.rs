//! Itinerary route composition.
//!
//! Consecutive stops are joined by recorded arc shapes where they exist and
//! by straight lines where they don't, then the segments are stitched into a
//! single continuous polyline.

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::error::{GeoError, Result};
use crate::geometry::Coordinate;
use crate::polyline::Polyline;
use crate::route_graph::recorded_shape;
use crate::traits::{Point, PointId, PointStore, RouteGraph};

/// Role of a stop within an itinerary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StopRole {
    Pickup,
    Stop {
        #[serde(rename = "stopOrder")]
        stop_order: u32,
    },
    End,
    /// Endpoint of an ad-hoc point-to-point query.
    Waypoint,
}

impl StopRole {
    fn rank(&self) -> (u8, u32) {
        match self {
            StopRole::Pickup => (0, 0),
            StopRole::Stop { stop_order } => (1, *stop_order),
            StopRole::Waypoint => (1, u32::MAX),
            StopRole::End => (2, 0),
        }
    }
}

/// A route point shown as a map pin.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    #[serde(flatten)]
    pub coordinate: Coordinate,
    #[serde(flatten)]
    pub role: StopRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_id: Option<PointId>,
}

impl Stop {
    /// A stop not yet tied to a stored point.
    pub fn new(coordinate: Coordinate, role: StopRole) -> Self {
        Self {
            coordinate,
            role,
            name: None,
            point_id: None,
        }
    }

    /// A stop for a stored point; its id is used directly for arc lookups.
    pub fn from_point(point: Point, role: StopRole, name: Option<String>) -> Self {
        Self {
            coordinate: point.coordinate,
            role,
            name,
            point_id: Some(point.id),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Path between two consecutive route points.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSegment {
    pub from: Coordinate,
    pub to: Coordinate,
    pub coordinates: Polyline,
    /// `false` when the segment is the straight two-point fallback.
    pub has_detailed_route: bool,
    pub distance_meters: f64,
}

impl RouteSegment {
    fn new(from: Coordinate, to: Coordinate, shape: Option<Polyline>) -> Self {
        let has_detailed_route = shape.is_some();
        let coordinates = match shape {
            Some(shape) => {
                let mut points = Vec::with_capacity(shape.len() + 2);
                points.push(from);
                points.extend_from_slice(shape.points());
                points.push(to);
                Polyline::new(points)
            }
            None => Polyline::straight(from, to),
        };
        let distance_meters = coordinates.length_meters();

        Self {
            from,
            to,
            coordinates,
            has_detailed_route,
            distance_meters,
        }
    }
}

/// A composed itinerary route.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedRoute {
    pub route_points: Vec<Stop>,
    pub route_segments: Vec<RouteSegment>,
    pub full_route: Polyline,
    pub total_points: usize,
    pub total_distance_meters: f64,
}

/// Puts pickup first, tour stops by `stop_order`, and the end point last.
/// Ties keep their input order.
pub fn order_itinerary(mut stops: Vec<Stop>) -> Vec<Stop> {
    stops.sort_by_key(|stop| stop.role.rank());
    stops
}

/// Composes the route through `stops`, taken verbatim in the given order.
///
/// Segment lookups run in parallel; segments are returned in stop order.
/// Fewer than two stops yields no segments and an empty route.
pub fn compose_route<S>(store: &S, stops: Vec<Stop>) -> Result<ComposedRoute>
where
    S: PointStore + RouteGraph + Sync + ?Sized,
{
    let route_segments: Vec<RouteSegment> = stops
        .par_windows(2)
        .map(|pair| resolve_segment(store, &pair[0], &pair[1]))
        .collect::<Result<_>>()?;

    let mut full_route = Polyline::default();
    for segment in &route_segments {
        full_route.extend_joined(&segment.coordinates);
    }

    let detailed = route_segments.iter().filter(|s| s.has_detailed_route).count();
    debug!(
        stops = stops.len(),
        segments = route_segments.len(),
        detailed,
        points = full_route.len(),
        "composed route"
    );

    Ok(ComposedRoute {
        total_points: full_route.len(),
        total_distance_meters: route_segments.iter().map(|s| s.distance_meters).sum(),
        route_points: stops,
        route_segments,
        full_route,
    })
}

/// Composes the single segment between two stored points.
pub fn compose_segment<S>(store: &S, start: PointId, end: PointId) -> Result<ComposedRoute>
where
    S: PointStore + RouteGraph + Sync + ?Sized,
{
    let start_point = store
        .point(start)?
        .ok_or_else(|| GeoError::NotFound(format!("point {}", start)))?;
    let end_point = store
        .point(end)?
        .ok_or_else(|| GeoError::NotFound(format!("point {}", end)))?;

    let stops = vec![
        Stop::from_point(start_point, StopRole::Waypoint, None),
        Stop::from_point(end_point, StopRole::Waypoint, None),
    ];
    compose_route(store, stops)
}

fn resolve_segment<S>(store: &S, from: &Stop, to: &Stop) -> Result<RouteSegment>
where
    S: PointStore + RouteGraph + ?Sized,
{
    let shape = match (point_id_of(store, from)?, point_id_of(store, to)?) {
        (Some(start), Some(end)) => recorded_shape(store, start, end)?,
        _ => None,
    };

    if shape.is_none() {
        debug!(
            from = ?from.coordinate,
            to = ?to.coordinate,
            "no recorded arc, using straight segment"
        );
    }

    Ok(RouteSegment::new(from.coordinate, to.coordinate, shape))
}

/// Stops carrying a point id use it; otherwise the coordinate is looked up
/// without creating a point, since composing a route never writes.
fn point_id_of<S>(store: &S, stop: &Stop) -> Result<Option<PointId>>
where
    S: PointStore + ?Sized,
{
    match stop.point_id {
        Some(id) => Ok(Some(id)),
        None => store.find_point(stop.coordinate),
    }
}
