//! Directed route graph read path.
//!
//! Arcs are keyed by their exact `(start, end)` node pair. There is no
//! traversal and no reverse-direction fallback: an arc recorded A→B says
//! nothing about B→A.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::polyline::Polyline;
use crate::traits::{ArcId, NodeId, PointId, RouteGraph};

/// A recorded directional edge between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteArc {
    pub id: ArcId,
    pub start_node: NodeId,
    pub end_node: NodeId,
}

/// Looks up the arc recorded from `start` to `end`, resolving both points to
/// nodes first. Points that were never used as an arc endpoint have no node,
/// which simply means no arc.
pub fn find_arc_between<G>(graph: &G, start: PointId, end: PointId) -> Result<Option<RouteArc>>
where
    G: RouteGraph + ?Sized,
{
    let Some(start_node) = graph.node_for_point(start)? else {
        debug!(point = %start, "no route node for start point");
        return Ok(None);
    };
    let Some(end_node) = graph.node_for_point(end)? else {
        debug!(point = %end, "no route node for end point");
        return Ok(None);
    };

    graph.find_arc(start_node, end_node)
}

/// Intermediate shape between two points, if a non-empty one was recorded.
pub fn recorded_shape<G>(graph: &G, start: PointId, end: PointId) -> Result<Option<Polyline>>
where
    G: RouteGraph + ?Sized,
{
    let Some(arc) = find_arc_between(graph, start, end)? else {
        return Ok(None);
    };

    let shape = graph.arc_polyline(&arc)?;
    if shape.is_empty() {
        debug!(arc = %arc.id, "arc has no shape points");
        return Ok(None);
    }

    Ok(Some(shape))
}
