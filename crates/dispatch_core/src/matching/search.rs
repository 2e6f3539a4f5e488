use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::debug;

use crate::config::SimulationConfig;
use crate::driver::{calculate_eta, Driver, DriverFactory};
use crate::random::{RandomSource, SeededRandom};
use crate::spatial::Coordinate;
use crate::vehicle::VehicleClass;

/// One attempt at finding a driver for a pickup.
#[async_trait]
pub trait DriverSearch: Send + Sync {
    /// `None` when no driver was available this time.
    async fn search(&self, pickup: Coordinate, class: VehicleClass) -> Option<Driver>;
}

/// Driver search against an imaginary fleet: waits `search_delay`, then
/// finds a freshly generated driver with probability
/// `search_success_probability`.
pub struct SimulatedDriverSearch {
    config: Arc<SimulationConfig>,
    factory: DriverFactory,
    rng: Mutex<Box<dyn RandomSource>>,
}

impl SimulatedDriverSearch {
    pub fn new(config: Arc<SimulationConfig>, rng: Box<dyn RandomSource>) -> Self {
        Self {
            factory: DriverFactory::new(config.driver_radius_miles),
            config,
            rng: Mutex::new(rng),
        }
    }

    /// Random source seeded from `config.seed`, or from entropy when unset.
    pub fn from_config(config: Arc<SimulationConfig>) -> Self {
        let rng = Box::new(SeededRandom::from_seed(config.seed));
        Self::new(config, rng)
    }

    fn draw(&self, pickup: Coordinate, class: VehicleClass) -> Option<Driver> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !rng.chance(self.config.search_success_probability) {
            return None;
        }
        Some(self.factory.generate(pickup, class, &mut **rng))
    }
}

#[async_trait]
impl DriverSearch for SimulatedDriverSearch {
    async fn search(&self, pickup: Coordinate, class: VehicleClass) -> Option<Driver> {
        sleep(self.config.search_delay()).await;

        let driver = self.draw(pickup, class)?;
        let eta = calculate_eta(driver.current_location, pickup, self.config.avg_speed_mph);
        debug!(driver_id = %driver.id, eta_secs = eta, "simulated driver available");
        Some(driver.with_eta(eta))
    }
}
