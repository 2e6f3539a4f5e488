use serde::{Deserialize, Serialize};

use crate::ride::RideSimulation;
use crate::spatial::Coordinate;
use crate::vehicle::VehicleClass;

/// What the rider asked for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RideRequest {
    pub pickup: Coordinate,
    pub dropoff: Coordinate,
    #[serde(default)]
    pub class: VehicleClass,
}

impl RideRequest {
    pub fn new(pickup: Coordinate, dropoff: Coordinate, class: VehicleClass) -> Self {
        Self {
            pickup,
            dropoff,
            class,
        }
    }
}

/// Progress notifications from a search chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchUpdate {
    /// Attempt `attempt` of `max` is starting. Attempts count from 1.
    Searching { attempt: u32, max: u32 },
    /// The previous attempt failed and attempt `attempt` follows after the
    /// retry delay.
    Retrying { attempt: u32, max: u32 },
    /// Every attempt failed; no further attempts follow.
    NoDriversAvailable,
}

/// Terminal result of a search chain.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// A driver was found; the ride is `Approaching` with both routes set.
    Matched(RideSimulation),
    NoDriversAvailable { attempts: u32 },
    Cancelled,
}

impl SearchOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, SearchOutcome::Matched(_))
    }
}
