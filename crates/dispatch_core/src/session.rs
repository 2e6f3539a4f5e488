//! Presentation-facing ride session.
//!
//! A [`RideSession`] owns the snapshot of one ride at a time and the tasks
//! that drive it: the search chain (with its "no drivers" display timer)
//! and the currently animated leg. Observers either poll
//! [`RideSession::snapshot`] or receive [`LegUpdate`]s while a leg runs.

use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::SimulationConfig;
use crate::error::DispatchError;
use crate::format::remaining_minutes;
use crate::matching::{MatchingEngine, RideRequest, SearchOutcome, SearchUpdate};
use crate::movement::{run_movement, MovementHandle, MovementStopper};
use crate::ride::{Leg, RideSimulation, RideStatus};
use crate::spatial::{route_length_miles, Coordinate};
use crate::vehicle::VehicleClass;

pub const FINDING_DRIVER_MESSAGE: &str = "Finding your driver...";
pub const NO_DRIVERS_MESSAGE: &str = "No drivers available at this time";

/// Bounds on the approach countdown's starting minutes.
const APPROACH_MINUTES: RangeInclusive<u64> = 1..=10;

/// Search progress as shown to the rider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchStatus {
    pub is_searching: bool,
    pub attempts: u32,
    pub max_attempts: u32,
    pub message: Option<String>,
}

/// One movement tick of a leg.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegUpdate {
    pub leg: Leg,
    pub position: Coordinate,
    pub progress: f64,
    /// Minutes left on the leg, never below one while it runs.
    pub remaining_minutes: u64,
}

/// Point-in-time copy of the session state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub request: Option<RideRequest>,
    /// `None` while idle.
    pub ride: Option<RideSimulation>,
    pub search: SearchStatus,
}

type SharedState = Arc<Mutex<SessionSnapshot>>;

fn lock(state: &Mutex<SessionSnapshot>) -> MutexGuard<'_, SessionSnapshot> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn searching_message(attempt: u32, max: u32) -> String {
    if attempt <= 1 {
        FINDING_DRIVER_MESSAGE.to_string()
    } else {
        format!("Searching again... ({}/{})", attempt, max)
    }
}

pub struct RideSession {
    engine: MatchingEngine,
    state: SharedState,
    search_task: Option<JoinHandle<()>>,
    leg_task: Option<MovementStopper>,
}

impl RideSession {
    pub fn new(engine: MatchingEngine) -> Self {
        Self {
            engine,
            state: Arc::default(),
            search_task: None,
            leg_task: None,
        }
    }

    pub fn from_config(config: Arc<SimulationConfig>) -> Result<Self, DispatchError> {
        Ok(Self::new(MatchingEngine::from_config(config)?))
    }

    pub fn engine(&self) -> &MatchingEngine {
        &self.engine
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        lock(&self.state).clone()
    }

    /// Status of the current ride; `None` while idle.
    pub fn status(&self) -> Option<RideStatus> {
        lock(&self.state).ride.as_ref().map(RideSimulation::status)
    }

    pub fn search_status(&self) -> SearchStatus {
        lock(&self.state).search.clone()
    }

    /// Fare for the current ride's trip route, once it is known.
    pub fn fare(&self) -> Option<f64> {
        let state = lock(&self.state);
        let request = state.request?;
        let ride = state.ride.as_ref()?;
        if ride.trip_route.is_empty() {
            return None;
        }
        Some(
            self.engine
                .config()
                .pricing
                .calculate_fare(ride.trip_info.as_ref(), request.class),
        )
    }

    /// Start a new ride request in the background, replacing any previous
    /// ride. Must be called from within a tokio runtime.
    pub fn request_ride(&mut self, pickup: Coordinate, dropoff: Coordinate, class: VehicleClass) {
        self.abort_tasks();

        let request = RideRequest::new(pickup, dropoff, class);
        let max = self.engine.config().max_search_attempts.max(1);
        *lock(&self.state) = SessionSnapshot {
            request: Some(request),
            ride: Some(RideSimulation::searching()),
            search: SearchStatus {
                is_searching: true,
                attempts: 0,
                max_attempts: max,
                message: Some(FINDING_DRIVER_MESSAGE.to_string()),
            },
        };
        info!(class = %class, "ride requested");

        let engine = self.engine.clone();
        let state = Arc::clone(&self.state);
        self.search_task = Some(tokio::spawn(async move {
            let observer_state = Arc::clone(&state);
            let outcome = engine
                .find_ride(request, move |update| {
                    apply_search_update(&observer_state, update)
                })
                .await;

            match outcome {
                SearchOutcome::Matched(ride) => install_match(&state, ride),
                SearchOutcome::NoDriversAvailable { attempts } => {
                    if !mark_unmatched(&state, attempts) {
                        return;
                    }
                    sleep(engine.config().no_drivers_display_delay()).await;
                    let mut snapshot = lock(&state);
                    if snapshot.ride.as_ref().map(RideSimulation::status)
                        == Some(RideStatus::Unmatched)
                    {
                        *snapshot = SessionSnapshot::default();
                    }
                }
                SearchOutcome::Cancelled => {}
            }
        }));
    }

    /// Abandon a pending search, including the "no drivers" display timer.
    /// A searching ride becomes `Cancelled`; an unmatched one is cleared.
    /// Rides that already have a driver are left alone.
    pub fn cancel_search(&mut self) {
        if let Some(task) = self.search_task.take() {
            task.abort();
        }

        let mut state = lock(&self.state);
        let status = state.ride.as_ref().map(RideSimulation::status);
        match status {
            Some(RideStatus::Searching) => {
                if let Some(ride) = state.ride.as_mut() {
                    let _ = ride.transition_to(RideStatus::Cancelled);
                }
                state.search = SearchStatus::default();
                info!("search cancelled");
            }
            Some(RideStatus::Unmatched) => *state = SessionSnapshot::default(),
            _ => {}
        }
    }

    /// Animate `leg` of the current ride. `observer` receives every tick.
    ///
    /// The ride moves to the next status when the returned handle finishes
    /// on its own; cancelling or dropping the handle leaves the status as
    /// it was. A leg whose route has fewer than two points returns an inert
    /// handle and changes nothing.
    pub fn start_leg<F>(
        &mut self,
        leg: Leg,
        mut observer: F,
    ) -> Result<MovementHandle, DispatchError>
    where
        F: FnMut(LegUpdate) + Send + 'static,
    {
        let config = Arc::clone(self.engine.config());
        let (route, initial_minutes) = {
            let mut state = lock(&self.state);
            let ride = state.ride.as_mut().ok_or(DispatchError::NoActiveRide)?;
            ride.begin_leg(leg)?;
            let route = ride.route(leg).clone();
            if route.len() < 2 {
                warn!(?leg, points = route.len(), "degenerate leg route, not animating");
                return Ok(MovementHandle::inert());
            }
            (route, leg_minutes(ride, leg, &config))
        };

        if let Some(previous) = self.leg_task.take() {
            previous.stop();
        }

        let duration = match leg {
            Leg::Approach => config.approach_duration(),
            Leg::Trip => config.trip_duration(),
        };
        info!(
            ?leg,
            points = route.len(),
            duration_ms = duration.as_millis() as u64,
            "leg started"
        );

        let state = Arc::clone(&self.state);
        let handle = MovementHandle::spawn(|gate| async move {
            let tick_state = Arc::clone(&state);
            let tick = move |position: Coordinate, progress: f64| {
                {
                    let mut snapshot = lock(&tick_state);
                    match snapshot.ride.as_mut() {
                        Some(ride) if ride.status() == leg.required_status() => {
                            ride.driver_position = Some(position);
                            ride.progress = progress;
                        }
                        _ => return,
                    }
                }
                observer(LegUpdate {
                    leg,
                    position,
                    progress,
                    remaining_minutes: remaining_minutes(initial_minutes, progress),
                });
            };
            if !run_movement(route, duration, &gate, tick).await {
                return false;
            }

            gate.deliver(|| {
                let mut snapshot = lock(&state);
                if let Some(ride) = snapshot.ride.as_mut() {
                    match ride.finish_leg(leg) {
                        Ok(()) => info!(?leg, status = ?ride.status(), "leg finished"),
                        Err(err) => warn!(error = %err, "leg finished on a ride that moved on"),
                    }
                }
            })
        });
        self.leg_task = handle.stopper();
        Ok(handle)
    }

    /// Tear down the search and any running leg, and cancel the ride if its
    /// status still allows it. Returns whether the ride was cancelled.
    pub fn cancel_ride(&mut self) -> bool {
        self.abort_tasks();

        let mut state = lock(&self.state);
        state.search = SearchStatus::default();
        let Some(ride) = state.ride.as_mut() else {
            return false;
        };
        match ride.transition_to(RideStatus::Cancelled) {
            Ok(()) => {
                info!("ride cancelled");
                true
            }
            Err(_) => false,
        }
    }

    fn abort_tasks(&mut self) {
        if let Some(task) = self.search_task.take() {
            task.abort();
        }
        if let Some(leg) = self.leg_task.take() {
            leg.stop();
        }
    }
}

impl Drop for RideSession {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

fn apply_search_update(state: &Mutex<SessionSnapshot>, update: SearchUpdate) {
    let mut snapshot = lock(state);
    if snapshot.ride.as_ref().map(RideSimulation::status) != Some(RideStatus::Searching) {
        return;
    }
    match update {
        SearchUpdate::Searching { attempt, max } | SearchUpdate::Retrying { attempt, max } => {
            if let Some(ride) = snapshot.ride.as_mut() {
                ride.search_attempts = attempt;
            }
            snapshot.search = SearchStatus {
                is_searching: true,
                attempts: attempt,
                max_attempts: max,
                message: Some(searching_message(attempt, max)),
            };
        }
        SearchUpdate::NoDriversAvailable => {
            snapshot.search.is_searching = false;
            snapshot.search.message = Some(NO_DRIVERS_MESSAGE.to_string());
        }
    }
}

fn install_match(state: &Mutex<SessionSnapshot>, ride: RideSimulation) {
    let mut snapshot = lock(state);
    // The search may have been cancelled while the match was in flight.
    if snapshot.ride.as_ref().map(RideSimulation::status) != Some(RideStatus::Searching) {
        return;
    }
    snapshot.search = SearchStatus {
        is_searching: false,
        attempts: ride.search_attempts,
        max_attempts: snapshot.search.max_attempts,
        message: None,
    };
    snapshot.ride = Some(ride);
}

fn mark_unmatched(state: &Mutex<SessionSnapshot>, attempts: u32) -> bool {
    let mut snapshot = lock(state);
    let Some(ride) = snapshot.ride.as_mut() else {
        return false;
    };
    ride.search_attempts = attempts;
    ride.transition_to(RideStatus::Unmatched).is_ok()
}

/// Minutes the leg starts with: the driver's ETA for the approach, shown
/// within [`APPROACH_MINUTES`], and the routed duration (or a straight-line
/// estimate) for the trip.
fn leg_minutes(ride: &RideSimulation, leg: Leg, config: &SimulationConfig) -> u64 {
    match leg {
        Leg::Approach => {
            let eta_secs = ride.driver.as_ref().map_or(0, |driver| driver.eta_secs);
            let minutes = eta_secs.div_ceil(60);
            minutes.clamp(*APPROACH_MINUTES.start(), *APPROACH_MINUTES.end())
        }
        Leg::Trip => {
            let seconds = ride.trip_info.map_or_else(
                || route_length_miles(&ride.trip_route) / config.avg_speed_mph * 3600.0,
                |info| info.duration_seconds,
            );
            (seconds / 60.0).ceil() as u64
        }
    }
}
