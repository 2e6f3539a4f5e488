//! Driver profiles and the factory that synthesizes them around a pickup.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::random::RandomSource;
use crate::spatial::{haversine_distance_miles, random_point_within_radius, Coordinate};
use crate::vehicle::{VehicleClass, VEHICLE_COLORS};

/// Default average driving speed for ETAs.
pub const DEFAULT_AVG_SPEED_MPH: f64 = 30.0;
/// Drivers start within this distance of the pickup by default.
pub const DEFAULT_DRIVER_RADIUS_MILES: f64 = 2.0;

const FIRST_NAMES: &[&str] = &[
    "Alex", "Jordan", "Taylor", "Casey", "Morgan", "Riley", "Avery", "Quinn", "Sam", "Blake",
    "Cameron", "Drew", "Emery", "Finley", "Harper", "Hayden", "Jamie", "Kendall", "Logan",
    "Marley", "Parker", "Peyton", "Reese", "Sage", "Skyler", "Tanner", "Teagan", "Tyler", "Wren",
    "Zion",
];

const LAST_NAMES: &[&str] = &[
    "Anderson", "Brown", "Davis", "Garcia", "Johnson", "Jones", "Martinez", "Miller", "Moore",
    "Rodriguez", "Smith", "Taylor", "Thomas", "Thompson", "White", "Williams", "Wilson", "Clark",
    "Lewis", "Lee", "Walker", "Hall", "Allen", "Young", "King", "Wright", "Lopez", "Hill", "Scott",
    "Green",
];

// I and O are left out so plates are not misread as 1 and 0.
const PLATE_LETTERS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const PLATE_DIGITS: &[u8] = b"0123456789";
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub make: String,
    pub model: String,
    pub color: String,
    pub plate: String,
    pub is_accessible: bool,
}

impl Vehicle {
    /// `Silver Honda Civic`
    pub fn description(&self) -> String {
        format!("{} {} {}", self.color, self.make, self.model)
    }
}

/// A matched driver. Never mutated after creation; the position shown during
/// a ride lives on the ride, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: String,
    pub name: String,
    /// Initials, e.g. `AJ`.
    pub avatar: String,
    pub rating: f64,
    pub vehicle: Vehicle,
    pub current_location: Coordinate,
    /// Seconds until the driver reaches the pickup.
    pub eta_secs: u64,
}

impl Driver {
    /// Copy of this driver with the pickup ETA set.
    pub fn with_eta(mut self, eta_secs: u64) -> Self {
        self.eta_secs = eta_secs;
        self
    }
}

/// Builds random driver profiles.
#[derive(Debug, Clone, Copy)]
pub struct DriverFactory {
    radius_miles: f64,
}

impl Default for DriverFactory {
    fn default() -> Self {
        Self::new(DEFAULT_DRIVER_RADIUS_MILES)
    }
}

impl DriverFactory {
    pub fn new(radius_miles: f64) -> Self {
        Self { radius_miles }
    }

    /// Draw a driver of `class` starting near `pickup`. The ETA is left at
    /// zero; see [`calculate_eta`].
    pub fn generate(
        &self,
        pickup: Coordinate,
        class: VehicleClass,
        rng: &mut dyn RandomSource,
    ) -> Driver {
        let first = FIRST_NAMES[rng.pick_index(FIRST_NAMES.len())];
        let last = LAST_NAMES[rng.pick_index(LAST_NAMES.len())];

        let pool = class.vehicle_pool();
        let vehicle = pool[rng.pick_index(pool.len())];
        let color = VEHICLE_COLORS[rng.pick_index(VEHICLE_COLORS.len())];

        let rating = ((4.5 + rng.next_unit() * 0.5) * 10.0).round() / 10.0;
        let current_location = random_point_within_radius(pickup, self.radius_miles, rng);
        let plate = license_plate(rng);
        let id = driver_id(rng);

        Driver {
            id,
            name: format!("{} {}", first, last),
            avatar: initials(first, last),
            rating,
            vehicle: Vehicle {
                make: vehicle.make.to_string(),
                model: vehicle.model.to_string(),
                color: color.to_string(),
                plate,
                is_accessible: class.is_accessible(),
            },
            current_location,
            eta_secs: 0,
        }
    }
}

/// Seconds to cover the great-circle distance at `avg_speed_mph`, rounded.
pub fn calculate_eta(from: Coordinate, to: Coordinate, avg_speed_mph: f64) -> u64 {
    let miles = haversine_distance_miles(from, to);
    let hours = miles / avg_speed_mph.max(f64::EPSILON);
    (hours * 3600.0).round() as u64
}

fn initials(first: &str, last: &str) -> String {
    first.chars().take(1).chain(last.chars().take(1)).collect()
}

/// Three letters then three digits, e.g. `ABC123`.
fn license_plate(rng: &mut dyn RandomSource) -> String {
    let mut plate = String::with_capacity(6);
    for _ in 0..3 {
        plate.push(PLATE_LETTERS[rng.pick_index(PLATE_LETTERS.len())] as char);
    }
    for _ in 0..3 {
        plate.push(PLATE_DIGITS[rng.pick_index(PLATE_DIGITS.len())] as char);
    }
    plate
}

fn driver_id(rng: &mut dyn RandomSource) -> String {
    let suffix: String = (0..9)
        .map(|_| ID_ALPHABET[rng.pick_index(ID_ALPHABET.len())] as char)
        .collect();
    format!("driver_{}_{}", Utc::now().timestamp_millis(), suffix)
}
