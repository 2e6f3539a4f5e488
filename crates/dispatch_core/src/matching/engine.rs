use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::search::{DriverSearch, SimulatedDriverSearch};
use super::types::{RideRequest, SearchOutcome, SearchUpdate};
use crate::config::SimulationConfig;
use crate::driver::Driver;
use crate::error::DispatchError;
use crate::ride::{RideSimulation, RideStatus};
use crate::routing::{build_route_provider, RoutingGateway};
use crate::spatial::Coordinate;
use crate::vehicle::VehicleClass;

/// Finds drivers for ride requests and prepares their routes.
///
/// Cheap to clone; clones share the configuration, the search backend and
/// the routing gateway.
#[derive(Clone)]
pub struct MatchingEngine {
    config: Arc<SimulationConfig>,
    search: Arc<dyn DriverSearch>,
    gateway: RoutingGateway,
}

impl MatchingEngine {
    pub fn new(
        config: Arc<SimulationConfig>,
        search: Arc<dyn DriverSearch>,
        gateway: RoutingGateway,
    ) -> Self {
        Self {
            config,
            search,
            gateway,
        }
    }

    /// Engine with the simulated fleet and the configured route provider.
    pub fn from_config(config: Arc<SimulationConfig>) -> Result<Self, DispatchError> {
        config.validate()?;
        let provider = build_route_provider(&config.route_provider, config.avg_speed_mph)?;
        let search = Arc::new(SimulatedDriverSearch::from_config(Arc::clone(&config)));
        Ok(Self::new(config, search, RoutingGateway::from_boxed(provider)))
    }

    pub fn config(&self) -> &Arc<SimulationConfig> {
        &self.config
    }

    pub fn gateway(&self) -> &RoutingGateway {
        &self.gateway
    }

    /// A single search attempt, without routes.
    pub async fn simulate_driver_search(
        &self,
        pickup: Coordinate,
        class: VehicleClass,
    ) -> Option<Driver> {
        self.search.search(pickup, class).await
    }

    /// One attempt at a full match. On success both routes are fetched and
    /// the ride is `Approaching`; otherwise it stays `Searching` with no
    /// routes. Either way it reports one search attempt.
    pub async fn create_ride_simulation(
        &self,
        pickup: Coordinate,
        dropoff: Coordinate,
        class: VehicleClass,
    ) -> RideSimulation {
        let Some(driver) = self.simulate_driver_search(pickup, class).await else {
            let mut ride = RideSimulation::searching();
            ride.search_attempts = 1;
            return ride;
        };

        let (approach, trip) = tokio::join!(
            self.gateway.fetch_route(driver.current_location, pickup),
            self.gateway.fetch_route_with_info(pickup, dropoff),
        );
        RideSimulation::matched(driver, approach, trip.route, trip.info)
    }

    /// Search with retries until a driver is found or the attempt budget is
    /// spent. `observer` hears about each attempt before it starts, about a
    /// scheduled retry as soon as an attempt fails, and about exhaustion.
    pub async fn find_ride<F>(&self, request: RideRequest, mut observer: F) -> SearchOutcome
    where
        F: FnMut(SearchUpdate) + Send,
    {
        let max = self.config.max_search_attempts.max(1);

        for attempt in 1..=max {
            observer(SearchUpdate::Searching { attempt, max });
            debug!(attempt, max, class = %request.class, "searching for driver");

            let mut ride = self
                .create_ride_simulation(request.pickup, request.dropoff, request.class)
                .await;
            if ride.status() == RideStatus::Approaching {
                ride.search_attempts = attempt;
                if let Some(driver) = &ride.driver {
                    info!(
                        attempt,
                        driver_id = %driver.id,
                        eta_secs = driver.eta_secs,
                        "driver matched"
                    );
                }
                return SearchOutcome::Matched(ride);
            }

            if attempt < max {
                observer(SearchUpdate::Retrying {
                    attempt: attempt + 1,
                    max,
                });
                sleep(self.config.retry_delay()).await;
            }
        }

        warn!(attempts = max, "no drivers available");
        observer(SearchUpdate::NoDriversAvailable);
        SearchOutcome::NoDriversAvailable { attempts: max }
    }

    /// Run [`find_ride`](Self::find_ride) in the background.
    pub fn request_ride<F>(&self, request: RideRequest, observer: F) -> SearchHandle
    where
        F: FnMut(SearchUpdate) + Send + 'static,
    {
        let engine = self.clone();
        SearchHandle {
            task: Some(tokio::spawn(async move {
                engine.find_ride(request, observer).await
            })),
        }
    }
}

/// Owning handle to a background search chain. Dropping it cancels the
/// chain.
#[derive(Debug)]
pub struct SearchHandle {
    task: Option<JoinHandle<SearchOutcome>>,
}

impl SearchHandle {
    /// Stop the chain. Pending attempts and retry delays are abandoned and
    /// no update is delivered afterwards. Idempotent; a no-op once the
    /// chain has finished.
    pub fn cancel(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    pub async fn outcome(mut self) -> SearchOutcome {
        let Some(task) = self.task.take() else {
            return SearchOutcome::Cancelled;
        };
        task.await.unwrap_or(SearchOutcome::Cancelled)
    }
}

impl Drop for SearchHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
