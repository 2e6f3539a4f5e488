//! Geographic primitives: coordinates, great-circle distance and random
//! driver placement around a pickup point.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::random::RandomSource;

/// Earth's mean radius in miles.
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Approximate length of one degree of latitude, used to turn a radius in
/// miles into a radius in degrees.
pub const MILES_PER_DEGREE: f64 = 69.0;

/// WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

/// Great-circle distance between two coordinates in miles.
pub fn haversine_distance_miles(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlng = (dlng * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlng * sin_dlng;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_MILES * c
}

/// Great-circle distance in meters.
pub fn haversine_distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    haversine_distance_miles(a, b) * 1609.344
}

/// Pick a random point within `radius_miles` of `center`.
///
/// The radius is drawn uniformly in `[0, radius_miles / 69]` degrees, so
/// samples are denser near the centre than a uniform-area draw would be.
pub fn random_point_within_radius(
    center: Coordinate,
    radius_miles: f64,
    rng: &mut dyn RandomSource,
) -> Coordinate {
    let radius_degrees = radius_miles / MILES_PER_DEGREE;
    let angle = rng.next_unit() * 2.0 * PI;
    let distance = rng.next_unit() * radius_degrees;
    Coordinate {
        lat: center.lat + distance * angle.cos(),
        lng: center.lng + distance * angle.sin(),
    }
}

/// Total length of a polyline in miles.
pub fn route_length_miles(route: &[Coordinate]) -> f64 {
    route
        .windows(2)
        .map(|pair| haversine_distance_miles(pair[0], pair[1]))
        .sum()
}
