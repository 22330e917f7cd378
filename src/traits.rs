//! Core capability traits.
//!
//! External geographic services and the relational store sit behind these
//! seams so the builder, filter and composer never depend on a concrete
//! provider. `SqliteStore` implements every store trait; `OrsClient`,
//! `CircleIsochrone` and `NominatimClient` implement the service traits.

use serde::{Deserialize, Serialize};

use crate::address_search::{AddressCandidate, GeocodeQuery};
use crate::composer::Stop;
use crate::error::Result;
use crate::geometry::Coordinate;
use crate::polyline::Polyline;
use crate::route_graph::RouteArc;

macro_rules! row_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(PointId);
row_id!(PolygonId);
row_id!(NodeId);
row_id!(ArcId);
row_id!(TourId);

/// A stored coordinate with a stable identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: PointId,
    pub coordinate: Coordinate,
}

/// Travel-budget polygon provider.
pub trait Isochrone {
    /// Candidate rings reachable within `budget_meters` of `center`, primary
    /// ring first. Each ring is ordered and may or may not repeat its first
    /// vertex at the end.
    fn isochrone(&self, center: Coordinate, budget_meters: f64) -> Result<Vec<Vec<Coordinate>>>;
}

/// Free-text address search provider.
pub trait Geocoder {
    /// Candidates in the provider's relevance order.
    fn search(&self, query: &GeocodeQuery) -> Result<Vec<AddressCandidate>>;
}

/// Deduplicating coordinate registry.
pub trait PointStore {
    /// Exact-match lookup without inserting.
    fn find_point(&self, coordinate: Coordinate) -> Result<Option<PointId>>;

    /// Exact-match lookup, inserting a new row when absent.
    fn find_or_create_point(&self, coordinate: Coordinate) -> Result<PointId>;

    fn point(&self, id: PointId) -> Result<Option<Point>>;
}

/// Persisted service-area rings.
pub trait PolygonStore {
    /// Stores `ring` as a new polygon in a single atomic unit.
    fn insert_polygon(&self, ring: &[Coordinate]) -> Result<PolygonId>;

    /// The ring ordered by vertex sequence, or `None` for an unknown id.
    fn polygon_ring(&self, id: PolygonId) -> Result<Option<Vec<Coordinate>>>;
}

/// Read path over recorded directional arcs.
pub trait RouteGraph {
    fn node_for_point(&self, point_id: PointId) -> Result<Option<NodeId>>;

    /// Exact directional lookup. `None` is a normal outcome.
    fn find_arc(&self, start: NodeId, end: NodeId) -> Result<Option<RouteArc>>;

    /// Intermediate shape points of `arc`, ordered by sequence.
    fn arc_polyline(&self, arc: &RouteArc) -> Result<Polyline>;
}

/// Resolves a tour to its ordered itinerary.
pub trait ItinerarySource {
    fn itinerary(&self, tour_id: TourId) -> Result<Option<Vec<Stop>>>;
}
