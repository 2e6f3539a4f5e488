use std::sync::{Arc, Mutex};
use std::time::Duration;

use dispatch_core::matching::DriverSearch;
use dispatch_core::routing::{RouteInfo, RouteProvider, RoutingGateway};
use dispatch_core::test_helpers::{FixedRouteProvider, TEST_DROPOFF, TEST_PICKUP};
use dispatch_core::{
    Coordinate, LegUpdate, MatchingEngine, RideSession, RideStatus, SimulationConfig,
};
use tokio::time::{sleep, Instant};

/// Five evenly spaced points from the test pickup to the test drop-off.
pub fn five_point_route() -> Vec<Coordinate> {
    (0..5)
        .map(|i| {
            let t = i as f64 / 4.0;
            Coordinate::new(
                TEST_PICKUP.lat + (TEST_DROPOFF.lat - TEST_PICKUP.lat) * t,
                TEST_PICKUP.lng + (TEST_DROPOFF.lng - TEST_PICKUP.lng) * t,
            )
        })
        .collect()
}

/// 5 km in 10 minutes.
pub const TRIP_INFO: RouteInfo = RouteInfo {
    distance_meters: 5_000.0,
    duration_seconds: 600.0,
};

/// Default timings with both legs shortened to four seconds.
pub fn config() -> SimulationConfig {
    SimulationConfig::default().with_leg_durations_ms(4_000, 4_000)
}

pub fn engine(
    config: SimulationConfig,
    search: impl DriverSearch + 'static,
    provider: impl RouteProvider + 'static,
) -> MatchingEngine {
    MatchingEngine::new(
        Arc::new(config),
        Arc::new(search),
        RoutingGateway::new(Arc::new(provider)),
    )
}

/// Session whose routes are always [`five_point_route`] priced at [`TRIP_INFO`].
pub fn session(search: impl DriverSearch + 'static) -> RideSession {
    let provider = FixedRouteProvider::new(five_point_route(), Some(TRIP_INFO));
    RideSession::new(engine(config(), search, provider))
}

pub type LegLog = Arc<Mutex<Vec<(Duration, LegUpdate)>>>;

/// Observer that records every update with its offset from `start`.
pub fn leg_recorder(start: Instant) -> (LegLog, impl FnMut(LegUpdate) + Send + 'static) {
    let log: LegLog = Arc::default();
    let sink = Arc::clone(&log);
    let observer = move |update: LegUpdate| {
        sink.lock()
            .expect("leg log")
            .push((start.elapsed(), update));
    };
    (log, observer)
}

/// Poll in 10 ms steps of virtual time until the session reaches `status`.
///
/// # Panics
///
/// Panics if the status is not reached within a minute.
pub async fn wait_for_status(session: &RideSession, status: RideStatus) {
    let deadline = Instant::now() + Duration::from_secs(60);
    while session.status() != Some(status) {
        assert!(
            Instant::now() < deadline,
            "session stuck at {:?}, wanted {:?}",
            session.status(),
            status
        );
        sleep(Duration::from_millis(10)).await;
    }
}
