//! Ride lifecycle: status transitions and the aggregate ride state.
//!
//! ```text
//! Searching -> Approaching -> InProgress -> Completed
//!     |             |             |
//!     +-> Unmatched +-------------+-> Cancelled
//! ```

use serde::{Deserialize, Serialize};

use crate::driver::Driver;
use crate::error::DispatchError;
use crate::routing::{Route, RouteInfo};
use crate::spatial::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Searching,
    Approaching,
    InProgress,
    Completed,
    /// No driver found within the retry budget.
    Unmatched,
    Cancelled,
}

impl RideStatus {
    pub fn can_transition_to(self, next: RideStatus) -> bool {
        use RideStatus::*;
        matches!(
            (self, next),
            (Searching, Approaching)
                | (Approaching, InProgress)
                | (InProgress, Completed)
                | (Searching, Unmatched)
                | (Searching | Approaching | InProgress, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RideStatus::Completed | RideStatus::Unmatched | RideStatus::Cancelled
        )
    }
}

/// The two animated legs of a ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Leg {
    /// Driver's location to pickup.
    Approach,
    /// Pickup to drop-off.
    Trip,
}

impl Leg {
    /// Status the ride must be in for this leg to start.
    pub fn required_status(self) -> RideStatus {
        match self {
            Leg::Approach => RideStatus::Approaching,
            Leg::Trip => RideStatus::InProgress,
        }
    }

    /// Status the ride moves to when this leg finishes.
    pub fn completed_status(self) -> RideStatus {
        match self {
            Leg::Approach => RideStatus::InProgress,
            Leg::Trip => RideStatus::Completed,
        }
    }
}

/// Aggregate state of one ride request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideSimulation {
    status: RideStatus,
    pub driver: Option<Driver>,
    pub approach_route: Route,
    pub trip_route: Route,
    /// Route summary of the trip leg, when the provider supplied one.
    pub trip_info: Option<RouteInfo>,
    /// Fraction of the active leg covered. Reset to 0 when a leg starts.
    pub progress: f64,
    /// Derived display position of the driver during a leg.
    pub driver_position: Option<Coordinate>,
    pub search_attempts: u32,
}

impl Default for RideSimulation {
    fn default() -> Self {
        Self::searching()
    }
}

impl RideSimulation {
    /// Fresh ride at the start of a request.
    pub fn searching() -> Self {
        Self {
            status: RideStatus::Searching,
            driver: None,
            approach_route: Vec::new(),
            trip_route: Vec::new(),
            trip_info: None,
            progress: 0.0,
            driver_position: None,
            search_attempts: 0,
        }
    }

    pub fn status(&self) -> RideStatus {
        self.status
    }

    /// Move to `next` if the transition table allows it.
    pub fn transition_to(&mut self, next: RideStatus) -> Result<(), DispatchError> {
        if !self.status.can_transition_to(next) {
            return Err(DispatchError::IllegalTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Ride that found `driver` on its first attempt, waiting on the approach.
    pub fn matched(
        driver: Driver,
        approach_route: Route,
        trip_route: Route,
        trip_info: Option<RouteInfo>,
    ) -> Self {
        Self {
            status: RideStatus::Approaching,
            driver_position: Some(driver.current_location),
            driver: Some(driver),
            approach_route,
            trip_route,
            trip_info,
            progress: 0.0,
            search_attempts: 1,
        }
    }

    /// Prepare `leg` to start animating.
    pub fn begin_leg(&mut self, leg: Leg) -> Result<(), DispatchError> {
        if self.status != leg.required_status() {
            return Err(DispatchError::LegNotReady {
                leg,
                status: self.status,
            });
        }
        self.progress = 0.0;
        self.driver_position = self.route(leg).first().copied().or(self.driver_position);
        Ok(())
    }

    /// Close out `leg`, advancing the status.
    pub fn finish_leg(&mut self, leg: Leg) -> Result<(), DispatchError> {
        self.transition_to(leg.completed_status())?;
        match leg {
            Leg::Approach => {
                self.progress = 0.0;
                self.driver_position = self.trip_route.first().copied().or(self.driver_position);
            }
            Leg::Trip => {
                self.progress = 1.0;
                self.driver_position = self.trip_route.last().copied().or(self.driver_position);
            }
        }
        Ok(())
    }

    pub fn route(&self, leg: Leg) -> &Route {
        match leg {
            Leg::Approach => &self.approach_route,
            Leg::Trip => &self.trip_route,
        }
    }
}
