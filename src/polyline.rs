//! Polyline representation for route geometries.
//!
//! Recorded arc shapes, composed segments and the stitched full route are all
//! carried as ordered coordinate sequences. Any compact wire encoding belongs
//! at the HTTP boundary, not here.

use serde::{Deserialize, Serialize};

use crate::geometry::Coordinate;
use crate::haversine::haversine_meters;

/// An ordered sequence of coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polyline {
    points: Vec<Coordinate>,
}

impl Polyline {
    /// Creates a polyline from coordinates in travel order.
    pub fn new(points: Vec<Coordinate>) -> Self {
        Self { points }
    }

    /// A straight two-point line.
    pub fn straight(from: Coordinate, to: Coordinate) -> Self {
        Self::new(vec![from, to])
    }

    /// Returns the coordinates as a slice.
    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    /// Consumes the polyline and returns the coordinates.
    pub fn into_points(self) -> Vec<Coordinate> {
        self.points
    }

    /// Number of coordinates.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Starting coordinate, if any.
    pub fn first(&self) -> Option<Coordinate> {
        self.points.first().copied()
    }

    /// Final coordinate, if any.
    pub fn last(&self) -> Option<Coordinate> {
        self.points.last().copied()
    }

    /// Appends `next`, skipping its first coordinate when this polyline is
    /// non-empty. Consecutive segments share their join waypoint, so the
    /// skipped point is the one already at the end of `self`.
    pub fn extend_joined(&mut self, next: &Polyline) {
        let skip = usize::from(!self.points.is_empty());
        self.points.extend(next.points.iter().skip(skip).copied());
    }

    /// Great-circle length summed over consecutive points.
    pub fn length_meters(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| haversine_meters(pair[0], pair[1]))
            .sum()
    }
}

impl From<Vec<Coordinate>> for Polyline {
    fn from(points: Vec<Coordinate>) -> Self {
        Self::new(points)
    }
}
