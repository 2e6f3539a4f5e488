//! Error types for the dispatch kernel.
//!
//! Routing and polyline failures never leave the routing gateway; they are
//! recovered into the straight-line fallback. [`DispatchError`] covers the
//! misuse that callers can actually observe.

use thiserror::Error;

use crate::ride::{Leg, RideStatus};

/// Failures while decoding an encoded polyline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolylineError {
    #[error("polyline ended in the middle of a value at byte {offset}")]
    Truncated { offset: usize },
    #[error("invalid polyline character {byte:#04x} at byte {offset}")]
    InvalidCharacter { offset: usize, byte: u8 },
    #[error("polyline value starting before byte {offset} exceeds 32 bits")]
    Overflow { offset: usize },
}

/// Failures talking to a routing provider.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[cfg(feature = "ors")]
    #[error("routing request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("routing provider answered with HTTP {0}")]
    Status(u16),
    #[error("malformed routing response: {0}")]
    Json(String),
    #[error("routing provider returned no route")]
    NoRoute,
    #[error("undecodable route geometry: {0}")]
    Polyline(#[from] PolylineError),
}

/// Errors surfaced to callers of the ride lifecycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("unknown vehicle class `{0}`")]
    UnknownVehicleClass(String),
    #[error("illegal ride transition {from:?} -> {to:?}")]
    IllegalTransition { from: RideStatus, to: RideStatus },
    #[error("cannot start {leg:?} leg while ride is {status:?}")]
    LegNotReady { leg: Leg, status: RideStatus },
    #[error("no ride has been requested")]
    NoActiveRide,
    #[error("configuration rejected: {0}")]
    Config(String),
}

impl From<ConfigError> for DispatchError {
    fn from(err: ConfigError) -> Self {
        DispatchError::Config(err.to_string())
    }
}

impl From<RoutingError> for DispatchError {
    fn from(err: RoutingError) -> Self {
        DispatchError::Config(err.to_string())
    }
}

/// Failures loading a [`SimulationConfig`](crate::config::SimulationConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
