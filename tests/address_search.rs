//! Address candidate filtering inside pickup areas.

mod fixtures;

use geo::{Contains, LineString, Point, Polygon};

use tour_geo::address_search::{
    SearchOptions, SearchOutcome, SuggestionCache, search_addresses, search_in_polygon,
};
use tour_geo::error::GeoError;
use tour_geo::geometry::{Coordinate, point_in_polygon};
use tour_geo::store::SqliteStore;
use tour_geo::traits::{PolygonId, PolygonStore};

use fixtures::{DISTRICT_1_HOTELS, OUTLYING, StaticGeocoder, TOUR_STOPS, district_1_ring};

fn to_geo(ring: &[Coordinate]) -> Polygon<f64> {
    let exterior: Vec<(f64, f64)> = ring.iter().map(|c| (c.longitude, c.latitude)).collect();
    Polygon::new(LineString::from(exterior), vec![])
}

#[test]
fn test_ray_casting_agrees_with_geo() {
    let ring = district_1_ring();
    let reference = to_geo(&ring);

    // Probe grid offset from every vertex coordinate so no probe sits on the
    // boundary.
    for i in 0..40 {
        for j in 0..40 {
            let probe = Coordinate::new(10.76 + i as f64 * 0.000813, 106.685 + j as f64 * 0.000731);
            let expected = reference.contains(&Point::new(probe.longitude, probe.latitude));
            assert_eq!(
                point_in_polygon(probe, &ring),
                expected,
                "disagreement at {:?}",
                probe
            );
        }
    }
}

#[test]
fn test_filter_narrows_and_never_invents() {
    let mixed: Vec<_> = DISTRICT_1_HOTELS
        .iter()
        .chain(OUTLYING.iter())
        .chain(TOUR_STOPS.iter())
        .collect();
    let geocoder = StaticGeocoder::from_locations(&mixed);
    let ring = district_1_ring();

    let outcome =
        search_addresses(&geocoder, &SearchOptions::default(), "khách sạn", Some(ring.as_slice())).unwrap();
    let candidates = outcome.candidates();
    assert!(!candidates.is_empty());

    let raw: Vec<_> = mixed.iter().map(|l| fixtures::candidate(l)).collect();
    for found in candidates {
        assert!(point_in_polygon(found.coordinate, &ring));
        assert!(raw.contains(found), "{} was not in the raw response", found.display_name);
    }
    assert!(candidates
        .iter()
        .all(|c| OUTLYING.iter().all(|o| o.name != c.display_name)));

    // Relevance order is preserved.
    let positions: Vec<usize> = candidates
        .iter()
        .map(|c| raw.iter().position(|r| r == c).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_two_character_query_makes_no_upstream_call() {
    let store = SqliteStore::open_in_memory().unwrap();
    let polygon = store.insert_polygon(&district_1_ring()).unwrap();
    let geocoder = StaticGeocoder::from_locations(&[&DISTRICT_1_HOTELS[0]]);

    let outcome =
        search_in_polygon(&geocoder, &store, &SearchOptions::default(), "ab", Some(polygon)).unwrap();
    assert_eq!(outcome, SearchOutcome::QueryTooShort);
    assert!(outcome.candidates().is_empty());
    assert_eq!(geocoder.call_count(), 0);
}

#[test]
fn test_search_in_stored_polygon() {
    let store = SqliteStore::open_in_memory().unwrap();
    let polygon = store.insert_polygon(&district_1_ring()).unwrap();
    let geocoder = StaticGeocoder::from_locations(&[&OUTLYING[0], &DISTRICT_1_HOTELS[2]]);

    let outcome =
        search_in_polygon(&geocoder, &store, &SearchOptions::default(), "Caravelle", Some(polygon))
            .unwrap();
    let names: Vec<&str> = outcome
        .candidates()
        .iter()
        .map(|c| c.display_name.as_str())
        .collect();
    assert_eq!(names, vec![DISTRICT_1_HOTELS[2].name]);

    let queries = geocoder.queries.lock().unwrap();
    let bbox = queries[0].bbox.expect("bbox hint sent upstream");
    assert!(district_1_ring().iter().all(|v| bbox.contains(*v)));
}

#[test]
fn test_only_outside_results_is_none_in_area() {
    let store = SqliteStore::open_in_memory().unwrap();
    let polygon = store.insert_polygon(&district_1_ring()).unwrap();
    let geocoder = StaticGeocoder::from_locations(&[&OUTLYING[0], &OUTLYING[1]]);

    let outcome =
        search_in_polygon(&geocoder, &store, &SearchOptions::default(), "airport", Some(polygon))
            .unwrap();
    assert_eq!(outcome, SearchOutcome::NoneInArea { raw_count: 2 });
    assert_eq!(outcome.status(), "none_in_area");
}

#[test]
fn test_unknown_polygon_is_not_found() {
    let store = SqliteStore::open_in_memory().unwrap();
    let geocoder = StaticGeocoder::new(Vec::new());
    let err = search_in_polygon(
        &geocoder,
        &store,
        &SearchOptions::default(),
        "anything",
        Some(PolygonId(99)),
    )
    .unwrap_err();
    assert!(matches!(err, GeoError::NotFound(_)));
    assert_eq!(geocoder.call_count(), 0);
}

#[test]
fn test_default_suggestions_cached_per_session() {
    let store = SqliteStore::open_in_memory().unwrap();
    let polygon = store.insert_polygon(&district_1_ring()).unwrap();
    let geocoder = StaticGeocoder::from_locations(&[
        &DISTRICT_1_HOTELS[0],
        &OUTLYING[2],
        &DISTRICT_1_HOTELS[3],
    ]);
    let options = SearchOptions::default();
    let cache = SuggestionCache::new();

    let first = cache
        .default_suggestions(&geocoder, &store, &options, "session-a", polygon)
        .unwrap();
    let again = cache
        .default_suggestions(&geocoder, &store, &options, "session-a", polygon)
        .unwrap();
    assert_eq!(first, again);
    assert_eq!(first.len(), 2);
    assert_eq!(geocoder.call_count(), 1);
    assert_eq!(geocoder.queries.lock().unwrap()[0].text, options.suggestion_query);

    cache
        .default_suggestions(&geocoder, &store, &options, "session-b", polygon)
        .unwrap();
    assert_eq!(geocoder.call_count(), 2);

    cache.clear("session-a");
    cache
        .default_suggestions(&geocoder, &store, &options, "session-a", polygon)
        .unwrap();
    cache
        .default_suggestions(&geocoder, &store, &options, "session-b", polygon)
        .unwrap();
    assert_eq!(geocoder.call_count(), 3);
}
