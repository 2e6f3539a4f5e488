//! Ride dispatch simulation kernel.
//!
//! Matches a ride request to a simulated driver, routes the approach and the
//! trip, animates the driver along both legs, and prices the trip per
//! vehicle class. Presentation layers drive it through [`RideSession`].

pub mod config;
pub mod driver;
pub mod error;
pub mod format;
pub mod matching;
pub mod movement;
pub mod polyline;
pub mod pricing;
pub mod random;
pub mod ride;
pub mod routing;
pub mod session;
pub mod spatial;
pub mod vehicle;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use config::SimulationConfig;
pub use error::{ConfigError, DispatchError, PolylineError, RoutingError};
pub use matching::{MatchingEngine, RideRequest, SearchHandle, SearchOutcome, SearchUpdate};
pub use movement::{simulate_movement, LegOutcome, MovementHandle};
pub use ride::{Leg, RideSimulation, RideStatus};
pub use routing::{Route, RouteInfo, RouteProvider, RoutingGateway};
pub use session::{LegUpdate, RideSession, SearchStatus, SessionSnapshot};
pub use spatial::Coordinate;
pub use vehicle::VehicleClass;
