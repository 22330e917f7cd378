//! Test fixtures for tour-geo.
//!
//! Provides:
//! - Real Ho Chi Minh City locations
//! - Mock isochrone and geocoding providers that record their calls
//! - A one-shot local HTTP responder for adapter tests

#![allow(dead_code)]

pub mod saigon_locations;

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use tour_geo::address_search::{AddressCandidate, GeocodeQuery};
use tour_geo::error::{GeoError, Result};
use tour_geo::geometry::Coordinate;
use tour_geo::traits::{Geocoder, Isochrone};

pub use saigon_locations::*;

/// Isochrone provider returning fixed rings and recording each request.
pub struct StaticIsochrone {
    rings: Vec<Vec<Coordinate>>,
    pub calls: Mutex<Vec<(Coordinate, f64)>>,
}

impl StaticIsochrone {
    pub fn new(rings: Vec<Vec<Coordinate>>) -> Self {
        Self {
            rings,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Isochrone for StaticIsochrone {
    fn isochrone(&self, center: Coordinate, budget_meters: f64) -> Result<Vec<Vec<Coordinate>>> {
        self.calls.lock().unwrap().push((center, budget_meters));
        Ok(self.rings.clone())
    }
}

/// Isochrone provider that always fails like an unreachable service.
pub struct DownIsochrone;

impl Isochrone for DownIsochrone {
    fn isochrone(&self, _center: Coordinate, _budget_meters: f64) -> Result<Vec<Vec<Coordinate>>> {
        Err(GeoError::UpstreamUnavailable("connection refused".to_string()))
    }
}

/// Geocoder returning fixed candidates and recording each query.
pub struct StaticGeocoder {
    results: Vec<AddressCandidate>,
    pub queries: Mutex<Vec<GeocodeQuery>>,
}

impl StaticGeocoder {
    pub fn new(results: Vec<AddressCandidate>) -> Self {
        Self {
            results,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn from_locations(locations: &[&Location]) -> Self {
        Self::new(locations.iter().map(|l| candidate(l)).collect())
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

impl Geocoder for StaticGeocoder {
    fn search(&self, query: &GeocodeQuery) -> Result<Vec<AddressCandidate>> {
        self.queries.lock().unwrap().push(query.clone());
        Ok(self.results.clone())
    }
}

pub fn candidate(location: &Location) -> AddressCandidate {
    AddressCandidate {
        display_name: location.name.to_string(),
        coordinate: location.coordinate(),
    }
}

/// Serves exactly one HTTP response on a random local port.
///
/// Returns the base URL and a receiver yielding the raw request (request line,
/// headers and body) once it has been read.
pub fn serve_once(status: u16, body: &str, delay: Duration) -> (String, Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind local listener");
    let addr = listener.local_addr().expect("local addr");
    let body = body.to_string();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let request = read_request(&mut stream);
        let _ = tx.send(request);
        thread::sleep(delay);

        let response = format!(
            "HTTP/1.1 {} Fixture\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();
    });

    (format!("http://{}", addr), rx)
}

fn read_request(stream: &mut impl Read) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];

    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        data.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&data);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if data.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&data).into_owned()
}
