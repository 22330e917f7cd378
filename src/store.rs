//! SQLite-backed relational store.
//!
//! Holds points, service-area polygons, the recorded route graph and tour
//! itineraries. Ordered child rows (`polygon_points`, `arc_points`,
//! `tour_stops`) are always read back with an explicit `ORDER BY`.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, Transaction, params};
use tracing::{debug, info};

use crate::composer::{Stop, StopRole};
use crate::error::Result;
use crate::geometry::Coordinate;
use crate::polyline::Polyline;
use crate::route_graph::RouteArc;
use crate::traits::{
    ArcId, ItinerarySource, NodeId, Point, PointId, PointStore, PolygonId, PolygonStore,
    RouteGraph, TourId,
};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS points (
        id INTEGER PRIMARY KEY,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        UNIQUE (latitude, longitude)
    );
    CREATE TABLE IF NOT EXISTS polygons (
        id INTEGER PRIMARY KEY,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE IF NOT EXISTS polygon_points (
        polygon_id INTEGER NOT NULL REFERENCES polygons(id),
        point_id INTEGER NOT NULL REFERENCES points(id),
        sequence INTEGER NOT NULL,
        PRIMARY KEY (polygon_id, sequence)
    );
    CREATE TABLE IF NOT EXISTS nodes (
        id INTEGER PRIMARY KEY,
        point_id INTEGER NOT NULL UNIQUE REFERENCES points(id)
    );
    CREATE TABLE IF NOT EXISTS arcs (
        id INTEGER PRIMARY KEY,
        start_node_id INTEGER NOT NULL REFERENCES nodes(id),
        end_node_id INTEGER NOT NULL REFERENCES nodes(id),
        UNIQUE (start_node_id, end_node_id)
    );
    CREATE TABLE IF NOT EXISTS arc_points (
        arc_id INTEGER NOT NULL REFERENCES arcs(id),
        point_id INTEGER NOT NULL REFERENCES points(id),
        sequence INTEGER NOT NULL,
        PRIMARY KEY (arc_id, sequence)
    );
    CREATE TABLE IF NOT EXISTS tours (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        pickup_point_id INTEGER REFERENCES points(id),
        end_point_id INTEGER REFERENCES points(id)
    );
    CREATE TABLE IF NOT EXISTS tour_stops (
        tour_id INTEGER NOT NULL REFERENCES tours(id),
        point_id INTEGER NOT NULL REFERENCES points(id),
        stop_order INTEGER NOT NULL,
        name TEXT NOT NULL,
        PRIMARY KEY (tour_id, stop_order)
    );
";

/// A tour stop as written by the import path.
#[derive(Debug, Clone)]
pub struct TourStopRecord {
    pub stop_order: u32,
    pub name: String,
    pub coordinate: Coordinate,
}

/// A tour itinerary as written by the import path.
#[derive(Debug, Clone, Default)]
pub struct TourRecord {
    pub name: String,
    pub pickup: Option<Coordinate>,
    pub stops: Vec<TourStopRecord>,
    pub end: Option<Coordinate>,
}

#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and applies the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "opened store");
        Self::with_connection(conn)
    }

    /// Private in-memory database, used by tests and local tooling.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave SQLite itself in a bad
        // state; any open transaction was rolled back on drop.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records (or replaces) the arc from `start` to `end` with the given
    /// intermediate shape. Nodes are created on demand.
    ///
    /// Used by offline arc import, never by a request path.
    pub fn record_arc(
        &self,
        start: Coordinate,
        end: Coordinate,
        shape: &[Coordinate],
    ) -> Result<ArcId> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let start_node = node_for_coordinate(&tx, start)?;
        let end_node = node_for_coordinate(&tx, end)?;

        tx.execute(
            "INSERT INTO arcs (start_node_id, end_node_id) VALUES (?1, ?2)
             ON CONFLICT (start_node_id, end_node_id) DO NOTHING",
            params![start_node.0, end_node.0],
        )?;
        let arc_id: i64 = tx.query_row(
            "SELECT id FROM arcs WHERE start_node_id = ?1 AND end_node_id = ?2",
            params![start_node.0, end_node.0],
            |row| row.get(0),
        )?;

        tx.execute("DELETE FROM arc_points WHERE arc_id = ?1", params![arc_id])?;
        insert_ordered_points(&tx, "arc_points", "arc_id", arc_id, shape)?;
        tx.commit()?;

        debug!(arc = arc_id, shape_points = shape.len(), "recorded arc");
        Ok(ArcId(arc_id))
    }

    /// Stores a tour itinerary. Used by tour import and fixtures.
    pub fn record_tour(&self, tour: &TourRecord) -> Result<TourId> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let pickup = tour
            .pickup
            .map(|c| find_or_create(&tx, c))
            .transpose()?;
        let end = tour.end.map(|c| find_or_create(&tx, c)).transpose()?;

        tx.execute(
            "INSERT INTO tours (name, pickup_point_id, end_point_id) VALUES (?1, ?2, ?3)",
            params![tour.name, pickup.map(|p| p.0), end.map(|p| p.0)],
        )?;
        let tour_id = tx.last_insert_rowid();

        {
            let mut insert = tx.prepare(
                "INSERT INTO tour_stops (tour_id, point_id, stop_order, name) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for stop in &tour.stops {
                let point = find_or_create(&tx, stop.coordinate)?;
                insert.execute(params![tour_id, point.0, stop.stop_order, stop.name])?;
            }
        }
        tx.commit()?;

        Ok(TourId(tour_id))
    }
}

fn find(conn: &Connection, coordinate: Coordinate) -> rusqlite::Result<Option<PointId>> {
    conn.query_row(
        "SELECT id FROM points WHERE latitude = ?1 AND longitude = ?2",
        params![coordinate.latitude, coordinate.longitude],
        |row| row.get(0).map(PointId),
    )
    .optional()
}

/// Lookup, then insert-if-absent, then re-fetch. The unique constraint on
/// `(latitude, longitude)` makes concurrent callers converge on one row.
fn find_or_create(conn: &Connection, coordinate: Coordinate) -> rusqlite::Result<PointId> {
    if let Some(id) = find(conn, coordinate)? {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO points (latitude, longitude) VALUES (?1, ?2)
         ON CONFLICT (latitude, longitude) DO NOTHING",
        params![coordinate.latitude, coordinate.longitude],
    )?;

    conn.query_row(
        "SELECT id FROM points WHERE latitude = ?1 AND longitude = ?2",
        params![coordinate.latitude, coordinate.longitude],
        |row| row.get(0).map(PointId),
    )
}

fn node_for_coordinate(tx: &Transaction<'_>, coordinate: Coordinate) -> rusqlite::Result<NodeId> {
    let point = find_or_create(tx, coordinate)?;
    tx.execute(
        "INSERT INTO nodes (point_id) VALUES (?1) ON CONFLICT (point_id) DO NOTHING",
        params![point.0],
    )?;
    tx.query_row(
        "SELECT id FROM nodes WHERE point_id = ?1",
        params![point.0],
        |row| row.get(0).map(NodeId),
    )
}

fn insert_ordered_points(
    tx: &Transaction<'_>,
    table: &str,
    owner_column: &str,
    owner_id: i64,
    coordinates: &[Coordinate],
) -> rusqlite::Result<()> {
    let mut insert = tx.prepare(&format!(
        "INSERT INTO {} ({}, point_id, sequence) VALUES (?1, ?2, ?3)",
        table, owner_column
    ))?;
    for (sequence, coordinate) in coordinates.iter().enumerate() {
        let point = find_or_create(tx, *coordinate)?;
        insert.execute(params![owner_id, point.0, sequence as i64])?;
    }
    Ok(())
}

fn ordered_coordinates(
    conn: &Connection,
    table: &str,
    owner_column: &str,
    owner_id: i64,
) -> rusqlite::Result<Vec<Coordinate>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT p.latitude, p.longitude FROM {} c
         JOIN points p ON p.id = c.point_id
         WHERE c.{} = ?1
         ORDER BY c.sequence ASC",
        table, owner_column
    ))?;
    let rows = stmt.query_map(params![owner_id], |row| {
        Ok(Coordinate::new(row.get(0)?, row.get(1)?))
    })?;
    rows.collect()
}

fn point_by_id(conn: &Connection, id: PointId) -> rusqlite::Result<Option<Point>> {
    conn.query_row(
        "SELECT latitude, longitude FROM points WHERE id = ?1",
        params![id.0],
        |row| {
            Ok(Point {
                id,
                coordinate: Coordinate::new(row.get(0)?, row.get(1)?),
            })
        },
    )
    .optional()
}

impl PointStore for SqliteStore {
    fn find_point(&self, coordinate: Coordinate) -> Result<Option<PointId>> {
        Ok(find(&self.conn(), coordinate)?)
    }

    fn find_or_create_point(&self, coordinate: Coordinate) -> Result<PointId> {
        Ok(find_or_create(&self.conn(), coordinate)?)
    }

    fn point(&self, id: PointId) -> Result<Option<Point>> {
        Ok(point_by_id(&self.conn(), id)?)
    }
}

impl PolygonStore for SqliteStore {
    fn insert_polygon(&self, ring: &[Coordinate]) -> Result<PolygonId> {
        let mut conn = self.conn();
        // Dropping the transaction without commit rolls everything back, so a
        // failure never leaves a polygon with a partial ring.
        let tx = conn.transaction()?;
        tx.execute("INSERT INTO polygons DEFAULT VALUES", [])?;
        let polygon_id = tx.last_insert_rowid();
        insert_ordered_points(&tx, "polygon_points", "polygon_id", polygon_id, ring)?;
        tx.commit()?;

        Ok(PolygonId(polygon_id))
    }

    fn polygon_ring(&self, id: PolygonId) -> Result<Option<Vec<Coordinate>>> {
        let conn = self.conn();
        let exists = conn
            .query_row("SELECT 1 FROM polygons WHERE id = ?1", params![id.0], |_| Ok(()))
            .optional()?
            .is_some();
        if !exists {
            return Ok(None);
        }

        Ok(Some(ordered_coordinates(&conn, "polygon_points", "polygon_id", id.0)?))
    }
}

impl RouteGraph for SqliteStore {
    fn node_for_point(&self, point_id: PointId) -> Result<Option<NodeId>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT id FROM nodes WHERE point_id = ?1",
                params![point_id.0],
                |row| row.get(0).map(NodeId),
            )
            .optional()?)
    }

    fn find_arc(&self, start: NodeId, end: NodeId) -> Result<Option<RouteArc>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT id FROM arcs WHERE start_node_id = ?1 AND end_node_id = ?2",
                params![start.0, end.0],
                |row| {
                    Ok(RouteArc {
                        id: ArcId(row.get(0)?),
                        start_node: start,
                        end_node: end,
                    })
                },
            )
            .optional()?)
    }

    fn arc_polyline(&self, arc: &RouteArc) -> Result<Polyline> {
        let points = ordered_coordinates(&self.conn(), "arc_points", "arc_id", arc.id.0)?;
        Ok(Polyline::new(points))
    }
}

impl ItinerarySource for SqliteStore {
    fn itinerary(&self, tour_id: TourId) -> Result<Option<Vec<Stop>>> {
        let conn = self.conn();

        let tour: Option<(Option<i64>, Option<i64>)> = conn
            .query_row(
                "SELECT pickup_point_id, end_point_id FROM tours WHERE id = ?1",
                params![tour_id.0],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((pickup, end)) = tour else {
            return Ok(None);
        };

        let mut itinerary = Vec::new();

        if let Some(point) = pickup.map(PointId) {
            if let Some(point) = point_by_id(&conn, point)? {
                itinerary.push(Stop::from_point(point, StopRole::Pickup, None));
            }
        }

        let mut stmt = conn.prepare(
            "SELECT s.point_id, s.stop_order, s.name, p.latitude, p.longitude
             FROM tour_stops s
             JOIN points p ON p.id = s.point_id
             WHERE s.tour_id = ?1
             ORDER BY s.stop_order ASC",
        )?;
        let stops = stmt.query_map(params![tour_id.0], |row| {
            let point = Point {
                id: PointId(row.get(0)?),
                coordinate: Coordinate::new(row.get(3)?, row.get(4)?),
            };
            Ok(Stop::from_point(
                point,
                StopRole::Stop {
                    stop_order: row.get(1)?,
                },
                Some(row.get(2)?),
            ))
        })?;
        for stop in stops {
            itinerary.push(stop?);
        }

        if let Some(point) = end.map(PointId) {
            if let Some(point) = point_by_id(&conn, point)? {
                itinerary.push(Stop::from_point(point, StopRole::End, None));
            }
        }

        Ok(Some(itinerary))
    }
}
