//! Nominatim HTTP adapter for free-text address search.

use serde::Deserialize;
use tracing::debug;

use crate::address_search::{AddressCandidate, GeocodeQuery};
use crate::error::Result;
use crate::geometry::Coordinate;
use crate::traits::Geocoder;

#[derive(Debug, Clone)]
pub struct NominatimConfig {
    pub base_url: String,
    /// Nominatim's usage policy requires an identifying user agent.
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("tour-geo/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NominatimClient {
    config: NominatimConfig,
    client: reqwest::blocking::Client,
}

impl NominatimClient {
    /// Builds a blocking client identifying itself with `user_agent`. Must not
    /// be called on an async runtime thread.
    pub fn new(config: NominatimConfig) -> std::result::Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { config, client })
    }
}

/// Query-string parameters for `/search`.
fn search_params(query: &GeocodeQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("q", query.text.clone()),
        ("format", "jsonv2".to_string()),
        ("limit", query.limit.to_string()),
    ];

    if let Some(bbox) = &query.bbox {
        // Nominatim's viewbox is x1,y1,x2,y2; `bounded` turns the bias into a
        // hard restriction.
        params.push((
            "viewbox",
            format!(
                "{},{},{},{}",
                bbox.min_lng, bbox.min_lat, bbox.max_lng, bbox.max_lat
            ),
        ));
        params.push(("bounded", "1".to_string()));
    }
    if let Some(locale) = &query.locale {
        params.push(("accept-language", locale.clone()));
    }
    if !query.country_codes.is_empty() {
        params.push(("countrycodes", query.country_codes.join(",")));
    }

    params
}

impl Geocoder for NominatimClient {
    fn search(&self, query: &GeocodeQuery) -> Result<Vec<AddressCandidate>> {
        let url = format!("{}/search", self.config.base_url.trim_end_matches('/'));

        let places: Vec<NominatimPlace> = self
            .client
            .get(url)
            .query(&search_params(query))
            .send()?
            .error_for_status()?
            .json()?;

        let candidates: Vec<AddressCandidate> =
            places.into_iter().filter_map(NominatimPlace::into_candidate).collect();
        debug!(query = %query.text, results = candidates.len(), "nominatim search");
        Ok(candidates)
    }
}

/// Nominatim encodes coordinates as strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

impl NominatimPlace {
    fn into_candidate(self) -> Option<AddressCandidate> {
        let latitude = self.lat.parse::<f64>().ok()?;
        let longitude = self.lon.parse::<f64>().ok()?;
        let coordinate = Coordinate::new(latitude, longitude);
        coordinate.is_finite().then(|| AddressCandidate {
            display_name: self.display_name,
            coordinate,
        })
    }
}
