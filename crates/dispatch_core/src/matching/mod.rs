pub mod engine;
pub mod search;
pub mod types;

pub use engine::{MatchingEngine, SearchHandle};
pub use search::{DriverSearch, SimulatedDriverSearch};
pub use types::{RideRequest, SearchOutcome, SearchUpdate};
