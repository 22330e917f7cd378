//! Runtime configuration.
//!
//! Every setting has a default; `TOUR_GEO_*` environment variables override
//! them.

use std::path::PathBuf;
use std::str::FromStr;

use crate::address_search::SearchOptions;
use crate::error::{GeoError, Result};
use crate::nominatim::NominatimConfig;
use crate::ors::OrsConfig;

/// Which isochrone backend builds pickup areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsochroneProvider {
    Ors,
    /// Road-agnostic circle around the center.
    Circle,
}

impl FromStr for IsochroneProvider {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ors" | "openrouteservice" => Ok(IsochroneProvider::Ors),
            "circle" => Ok(IsochroneProvider::Circle),
            other => Err(GeoError::InvalidInput(format!(
                "unknown isochrone provider '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub bind_address: String,
    pub isochrone_provider: IsochroneProvider,
    pub ors: OrsConfig,
    pub nominatim: NominatimConfig,
    pub search: SearchOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("tour-geo.sqlite3"),
            bind_address: "127.0.0.1:8088".to_string(),
            isochrone_provider: IsochroneProvider::Ors,
            ors: OrsConfig::default(),
            nominatim: NominatimConfig::default(),
            search: SearchOptions::default(),
        }
    }
}

impl Config {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from defaults overlaid with whatever `lookup` returns.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(path) = lookup("TOUR_GEO_DATABASE") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(addr) = lookup("TOUR_GEO_BIND") {
            config.bind_address = addr;
        }
        if let Some(provider) = parsed(&lookup, "TOUR_GEO_ISOCHRONE_PROVIDER")? {
            config.isochrone_provider = provider;
        }

        if let Some(url) = lookup("TOUR_GEO_ORS_URL") {
            config.ors.base_url = url;
        }
        if let Some(profile) = lookup("TOUR_GEO_ORS_PROFILE") {
            config.ors.profile = profile;
        }
        if let Some(key) = lookup("TOUR_GEO_ORS_API_KEY").filter(|k| !k.is_empty()) {
            config.ors.api_key = Some(key);
        }
        if let Some(timeout) = parsed(&lookup, "TOUR_GEO_ORS_TIMEOUT_SECS")? {
            config.ors.timeout_secs = timeout;
        }

        if let Some(url) = lookup("TOUR_GEO_GEOCODER_URL") {
            config.nominatim.base_url = url;
        }
        if let Some(agent) = lookup("TOUR_GEO_GEOCODER_USER_AGENT") {
            config.nominatim.user_agent = agent;
        }
        if let Some(timeout) = parsed(&lookup, "TOUR_GEO_GEOCODER_TIMEOUT_SECS")? {
            config.nominatim.timeout_secs = timeout;
        }

        if let Some(locale) = lookup("TOUR_GEO_SEARCH_LOCALE") {
            config.search.locale = Some(locale).filter(|l| !l.is_empty());
        }
        if let Some(countries) = lookup("TOUR_GEO_SEARCH_COUNTRIES") {
            config.search.country_codes = countries
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(min) = parsed(&lookup, "TOUR_GEO_SEARCH_MIN_CHARS")? {
            config.search.min_query_chars = min;
        }
        if let Some(max) = parsed(&lookup, "TOUR_GEO_SEARCH_MAX_RESULTS")? {
            config.search.max_results = max;
        }
        if let Some(query) = lookup("TOUR_GEO_SUGGESTION_QUERY") {
            config.search.suggestion_query = query;
        }
        if let Some(capacity) = parsed(&lookup, "TOUR_GEO_SUGGESTION_CACHE_SIZE")? {
            config.search.suggestion_cache_capacity = capacity;
        }

        Ok(config)
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| GeoError::InvalidInput(format!("{} has invalid value '{}'", key, raw))),
    }
}
