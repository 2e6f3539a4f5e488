//! Deterministic stand-ins for the kernel's collaborators.
//!
//! Shared by unit tests, the integration tests and the benches.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::driver::{calculate_eta, Driver, DriverFactory, DEFAULT_AVG_SPEED_MPH};
use crate::error::RoutingError;
use crate::matching::DriverSearch;
use crate::random::{RandomSource, SeededRandom};
use crate::routing::{Route, RouteInfo, RouteProvider, RouteResult};
use crate::spatial::Coordinate;
use crate::vehicle::VehicleClass;

/// Lower Manhattan.
pub const TEST_PICKUP: Coordinate = Coordinate::new(40.7128, -74.0060);
/// Midtown, roughly 3.3 miles north of [`TEST_PICKUP`].
pub const TEST_DROPOFF: Coordinate = Coordinate::new(40.7580, -73.9855);

/// Replays a fixed sequence of unit draws, cycling when it runs out.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: Vec<f64>,
    next: usize,
}

impl ScriptedRandom {
    /// # Panics
    ///
    /// Panics if `values` is empty or holds a value outside `[0, 1)`.
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "scripted random needs at least one value");
        assert!(
            values.iter().all(|v| (0.0..1.0).contains(v)),
            "scripted values must lie in [0, 1)"
        );
        Self { values, next: 0 }
    }

    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        let value = self.values[self.next % self.values.len()];
        self.next += 1;
        value
    }
}

/// Always answers with the same route.
#[derive(Debug, Clone)]
pub struct FixedRouteProvider {
    result: RouteResult,
    calls: Arc<AtomicUsize>,
}

impl FixedRouteProvider {
    pub fn new(route: Route, info: Option<RouteInfo>) -> Self {
        Self {
            result: RouteResult { route, info },
            calls: Arc::default(),
        }
    }

    /// Shared counter of `route` calls.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl RouteProvider for FixedRouteProvider {
    async fn route(&self, _from: Coordinate, _to: Coordinate) -> Result<RouteResult, RoutingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.result.clone())
    }
}

/// Fails every request with the same status code.
#[derive(Debug, Clone, Copy)]
pub struct FailingRouteProvider {
    status: u16,
}

impl FailingRouteProvider {
    pub fn new(status: u16) -> Self {
        Self { status }
    }
}

impl Default for FailingRouteProvider {
    fn default() -> Self {
        Self::new(503)
    }
}

#[async_trait]
impl RouteProvider for FailingRouteProvider {
    async fn route(&self, _from: Coordinate, _to: Coordinate) -> Result<RouteResult, RoutingError> {
        Err(RoutingError::Status(self.status))
    }
}

/// Driver search with a scripted number of failures before it succeeds.
pub struct ScriptedDriverSearch {
    failures_before_success: Option<usize>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    rng: Mutex<SeededRandom>,
}

impl ScriptedDriverSearch {
    /// Never finds a driver.
    pub fn never() -> Self {
        Self::build(None)
    }

    /// Fails `failures` times, then finds a driver on every later call.
    pub fn succeed_after(failures: usize) -> Self {
        Self::build(Some(failures))
    }

    fn build(failures_before_success: Option<usize>) -> Self {
        Self {
            failures_before_success,
            delay: Duration::ZERO,
            calls: Arc::default(),
            rng: Mutex::new(SeededRandom::new(7)),
        }
    }

    /// Make each call take `delay` of (virtual) time.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Shared counter of `search` calls.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl DriverSearch for ScriptedDriverSearch {
    async fn search(&self, pickup: Coordinate, class: VehicleClass) -> Option<Driver> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let failures = self.failures_before_success?;
        if call < failures {
            return None;
        }

        let driver = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            DriverFactory::default().generate(pickup, class, &mut *rng)
        };
        let eta = calculate_eta(driver.current_location, pickup, DEFAULT_AVG_SPEED_MPH);
        Some(driver.with_eta(eta))
    }
}
