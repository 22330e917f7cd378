//! Ho Chi Minh City landmarks for realistic fixtures.
//!
//! Coordinates are approximate (rounded from OpenStreetMap).

use tour_geo::geometry::Coordinate;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

// ============================================================================
// District 1 pickup hotels (inside the default pickup area)
// ============================================================================

pub const DISTRICT_1_HOTELS: &[Location] = &[
    Location::new("Hotel Continental Saigon", 10.7769, 106.7020),
    Location::new("Rex Hotel", 10.7760, 106.7010),
    Location::new("Caravelle Saigon", 10.7762, 106.7035),
    Location::new("Park Hyatt Saigon", 10.7782, 106.7040),
    Location::new("Liberty Central Saigon Riverside", 10.7713, 106.7060),
];

// ============================================================================
// Tour stops
// ============================================================================

pub const TOUR_STOPS: &[Location] = &[
    Location::new("Independence Palace", 10.7770, 106.6953),
    Location::new("Notre-Dame Cathedral Basilica", 10.7798, 106.6990),
    Location::new("Saigon Central Post Office", 10.7800, 106.6999),
    Location::new("Ben Thanh Market", 10.7725, 106.6980),
];

// ============================================================================
// Outside District 1
// ============================================================================

pub const OUTLYING: &[Location] = &[
    Location::new("Tan Son Nhat Airport", 10.8185, 106.6588),
    Location::new("Cu Chi Tunnels", 11.1416, 106.4630),
    Location::new("Thu Duc Market", 10.8500, 106.7560),
];

/// A rough District 1 pickup ring, counter-clockwise.
pub fn district_1_ring() -> Vec<Coordinate> {
    vec![
        Coordinate::new(10.7650, 106.6900),
        Coordinate::new(10.7650, 106.7100),
        Coordinate::new(10.7750, 106.7120),
        Coordinate::new(10.7900, 106.7050),
        Coordinate::new(10.7900, 106.6900),
    ]
}
