//! openrouteservice-compatible HTTP adapter for isochrones.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GeoError, Result};
use crate::geometry::Coordinate;
use crate::traits::Isochrone;

#[derive(Debug, Clone)]
pub struct OrsConfig {
    pub base_url: String,
    pub profile: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for OrsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/ors".to_string(),
            profile: "driving-car".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrsClient {
    config: OrsConfig,
    client: reqwest::blocking::Client,
}

impl OrsClient {
    /// Builds a blocking client with the configured timeout. Must not be
    /// called on an async runtime thread.
    pub fn new(config: OrsConfig) -> std::result::Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

impl Isochrone for OrsClient {
    fn isochrone(&self, center: Coordinate, budget_meters: f64) -> Result<Vec<Vec<Coordinate>>> {
        let url = format!(
            "{}/v2/isochrones/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile
        );
        let body = IsochroneRequest {
            locations: [[center.longitude, center.latitude]],
            range: [budget_meters],
            range_type: "distance",
        };

        let mut request = self.client.post(url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.header(reqwest::header::AUTHORIZATION, key.as_str());
        }

        let response: IsochroneResponse = request.send()?.error_for_status()?.json()?;
        let rings = response.into_rings();
        debug!(?center, budget_meters, rings = rings.len(), "isochrone response");

        if rings.is_empty() {
            return Err(GeoError::UpstreamUnavailable(
                "isochrone response contained no polygon".to_string(),
            ));
        }
        Ok(rings)
    }
}

#[derive(Debug, Serialize)]
struct IsochroneRequest {
    locations: [[f64; 2]; 1],
    range: [f64; 1],
    range_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct IsochroneResponse {
    #[serde(default)]
    features: Vec<IsochroneFeature>,
}

#[derive(Debug, Deserialize)]
struct IsochroneFeature {
    geometry: Option<IsochroneGeometry>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum IsochroneGeometry {
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<[f64; 2]>>> },
    #[serde(other)]
    Other,
}

impl IsochroneResponse {
    /// Outer rings in feature order; holes are ignored.
    fn into_rings(self) -> Vec<Vec<Coordinate>> {
        self.features
            .into_iter()
            .filter_map(|feature| feature.geometry)
            .flat_map(|geometry| match geometry {
                IsochroneGeometry::Polygon { coordinates } => {
                    coordinates.into_iter().take(1).collect::<Vec<_>>()
                }
                IsochroneGeometry::MultiPolygon { coordinates } => coordinates
                    .into_iter()
                    .filter_map(|polygon| polygon.into_iter().next())
                    .collect(),
                IsochroneGeometry::Other => Vec::new(),
            })
            .map(|ring| {
                ring.into_iter()
                    .map(|[lng, lat]| Coordinate::from_lng_lat(lng, lat))
                    .collect::<Vec<_>>()
            })
            .filter(|ring| !ring.is_empty())
            .collect()
    }
}
