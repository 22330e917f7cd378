//! Address candidate search narrowed to a pickup area.
//!
//! The geocoder is queried with the area's bounding box as a coarse hint and
//! every candidate is then checked against the exact ring. Relevance order
//! from the provider is preserved.

use std::sync::{Mutex, MutexGuard};

use lru::LruCache;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GeoError, Result};
use crate::geometry::{BoundingBox, Coordinate, bounding_box, point_in_polygon};
use crate::traits::{Geocoder, PolygonId, PolygonStore};

/// Entries kept by a [`SuggestionCache`] unless configured otherwise.
pub const DEFAULT_SUGGESTION_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Queries shorter than this (in characters, after trimming) are not sent.
    pub min_query_chars: usize,
    /// Cap on candidates returned after filtering.
    pub max_results: usize,
    /// Candidates requested from the provider before filtering.
    pub upstream_limit: usize,
    pub locale: Option<String>,
    pub country_codes: Vec<String>,
    /// Query used to pre-populate suggestions before the user types.
    pub suggestion_query: String,
    /// Bound on cached `(session, polygon)` suggestion lists.
    pub suggestion_cache_capacity: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            min_query_chars: 3,
            max_results: 10,
            upstream_limit: 40,
            locale: Some("vi".to_string()),
            country_codes: vec!["vn".to_string()],
            suggestion_query: "hotel".to_string(),
            suggestion_cache_capacity: DEFAULT_SUGGESTION_CAPACITY,
        }
    }
}

/// Request sent to a [`Geocoder`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeQuery {
    pub text: String,
    pub bbox: Option<BoundingBox>,
    pub locale: Option<String>,
    pub country_codes: Vec<String>,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressCandidate {
    pub display_name: String,
    pub coordinate: Coordinate,
}

/// Result of an address search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// The query was too short to send upstream.
    QueryTooShort,
    /// The provider returned nothing at all.
    NoResults,
    /// The provider returned candidates but none fall inside the area.
    NoneInArea { raw_count: usize },
    Matches(Vec<AddressCandidate>),
}

impl SearchOutcome {
    /// Matching candidates; empty for every other outcome.
    pub fn candidates(&self) -> &[AddressCandidate] {
        match self {
            SearchOutcome::Matches(candidates) => candidates,
            _ => &[],
        }
    }

    pub fn into_candidates(self) -> Vec<AddressCandidate> {
        match self {
            SearchOutcome::Matches(candidates) => candidates,
            _ => Vec::new(),
        }
    }

    /// Short machine-readable label for API responses.
    pub fn status(&self) -> &'static str {
        match self {
            SearchOutcome::QueryTooShort => "query_too_short",
            SearchOutcome::NoResults => "no_results",
            SearchOutcome::NoneInArea { .. } => "none_in_area",
            SearchOutcome::Matches(_) => "matches",
        }
    }
}

/// Searches `query`, keeping only candidates inside `area` when one is given.
pub fn search_addresses<G>(
    geocoder: &G,
    options: &SearchOptions,
    query: &str,
    area: Option<&[Coordinate]>,
) -> Result<SearchOutcome>
where
    G: Geocoder + ?Sized,
{
    let text = query.trim();
    if text.chars().count() < options.min_query_chars {
        return Ok(SearchOutcome::QueryTooShort);
    }

    filtered_search(geocoder, options, text, area)
}

/// Loads the polygon ring for `polygon` and searches inside it.
pub fn search_in_polygon<G, P>(
    geocoder: &G,
    polygons: &P,
    options: &SearchOptions,
    query: &str,
    polygon: Option<PolygonId>,
) -> Result<SearchOutcome>
where
    G: Geocoder + ?Sized,
    P: PolygonStore + ?Sized,
{
    if query.trim().chars().count() < options.min_query_chars {
        return Ok(SearchOutcome::QueryTooShort);
    }

    let ring = polygon.map(|id| load_ring(polygons, id)).transpose()?;
    search_addresses(geocoder, options, query, ring.as_deref())
}

fn load_ring<P>(polygons: &P, id: PolygonId) -> Result<Vec<Coordinate>>
where
    P: PolygonStore + ?Sized,
{
    polygons
        .polygon_ring(id)?
        .ok_or_else(|| GeoError::NotFound(format!("polygon {}", id)))
}

fn filtered_search<G>(
    geocoder: &G,
    options: &SearchOptions,
    text: &str,
    area: Option<&[Coordinate]>,
) -> Result<SearchOutcome>
where
    G: Geocoder + ?Sized,
{
    let bbox = area.and_then(bounding_box);
    let request = GeocodeQuery {
        text: text.to_string(),
        bbox,
        locale: options.locale.clone(),
        country_codes: options.country_codes.clone(),
        limit: options.upstream_limit,
    };

    let raw = geocoder.search(&request)?;
    let raw_count = raw.len();
    if raw_count == 0 {
        return Ok(SearchOutcome::NoResults);
    }

    let matches: Vec<AddressCandidate> = raw
        .into_iter()
        .filter(|candidate| match area {
            Some(ring) => {
                bbox.is_some_and(|bbox| bbox.contains(candidate.coordinate))
                    && point_in_polygon(candidate.coordinate, ring)
            }
            None => true,
        })
        .take(options.max_results)
        .collect();

    debug!(query = text, raw_count, kept = matches.len(), "address search");

    if matches.is_empty() {
        Ok(SearchOutcome::NoneInArea { raw_count })
    } else {
        Ok(SearchOutcome::Matches(matches))
    }
}

type SuggestionKey = (String, PolygonId);

/// Per-session cache of default suggestions shown before the user types.
///
/// Sessions are client-supplied and may never be cleared explicitly, so the
/// cache is bounded: once `capacity` entries exist, the least recently used
/// `(session, polygon)` pair is evicted.
pub struct SuggestionCache {
    entries: Mutex<LruCache<SuggestionKey, Vec<AddressCandidate>>>,
}

impl std::fmt::Debug for SuggestionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.lock();
        f.debug_struct("SuggestionCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish()
    }
}

impl Default for SuggestionCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SUGGESTION_CAPACITY)
    }
}

impl SuggestionCache {
    /// A cache holding up to [`DEFAULT_SUGGESTION_CAPACITY`] entries.
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache holding up to `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity.max(1))),
        }
    }

    /// Number of cached `(session, polygon)` entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached suggestions for `(session, polygon)`, fetched on first use.
    /// Failed fetches are not cached.
    pub fn default_suggestions<G, P>(
        &self,
        geocoder: &G,
        polygons: &P,
        options: &SearchOptions,
        session: &str,
        polygon: PolygonId,
    ) -> Result<Vec<AddressCandidate>>
    where
        G: Geocoder + ?Sized,
        P: PolygonStore + ?Sized,
    {
        let key = (session.to_string(), polygon);
        if let Some(cached) = self.lock().get(&key) {
            debug!(session, polygon = %polygon, "suggestion cache hit");
            return Ok(cached.clone());
        }

        let ring = load_ring(polygons, polygon)?;
        let suggestions =
            filtered_search(geocoder, options, &options.suggestion_query, Some(ring.as_slice()))?
                .into_candidates();

        let mut entries = self.lock();
        if entries.len() >= entries.cap() && !entries.contains(&key) {
            if let Some(((evicted_session, evicted_polygon), _)) = entries.pop_lru() {
                debug!(session = %evicted_session, polygon = %evicted_polygon, "evicted cached suggestions");
            }
        }
        entries.put(key, suggestions.clone());
        Ok(suggestions)
    }

    /// Forgets everything cached for `session`, e.g. when the search box is
    /// cleared or the session ends.
    pub fn clear(&self, session: &str) {
        let mut entries = self.lock();
        let stale: Vec<SuggestionKey> = entries
            .iter()
            .filter(|((cached_session, _), _)| cached_session == session)
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            entries.pop(&key);
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<SuggestionKey, Vec<AddressCandidate>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
