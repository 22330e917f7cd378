//! tour-geo: pickup service areas and itinerary route composition.
//!
//! Builds free-pickup polygons from an isochrone provider, narrows address
//! search results to those polygons, and stitches recorded road shapes
//! between tour stops into one continuous route.

pub mod traits;
pub mod error;
pub mod config;
pub mod geometry;
pub mod haversine;
pub mod polyline;
pub mod store;
pub mod service_area;
pub mod address_search;
pub mod route_graph;
pub mod composer;
pub mod ors;
pub mod nominatim;
pub mod http;
