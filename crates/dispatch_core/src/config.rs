//! Process-wide simulation configuration.
//!
//! Loaded once and shared read-only as `Arc<SimulationConfig>`; nothing in the
//! kernel mutates it after construction.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pricing::PricingTable;
use crate::routing::RouteProviderKind;

const DEFAULT_SEARCH_DELAY_MS: u64 = 5_000;
const DEFAULT_LEG_DURATION_MS: u64 = 30_000;
const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;
const DEFAULT_NO_DRIVERS_DISPLAY_MS: u64 = 3_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Artificial latency of one driver search.
    pub search_delay_ms: u64,
    /// Wall-clock length of the approach animation.
    pub approach_duration_ms: u64,
    /// Wall-clock length of the trip animation.
    pub trip_duration_ms: u64,
    /// How much faster than real time the demo runs.
    pub speed_multiplier: u32,
    pub max_search_attempts: u32,
    /// Probability (0.0–1.0) that a single search finds a driver.
    pub search_success_probability: f64,
    /// Delay before retrying a failed search.
    pub retry_delay_ms: u64,
    /// How long "no drivers available" stays up before the search clears.
    pub no_drivers_display_delay_ms: u64,
    /// Drivers spawn within this many miles of the pickup.
    pub driver_radius_miles: f64,
    /// Speed used for driver ETAs and straight-line route durations.
    pub avg_speed_mph: f64,
    /// Seed for the random source. `None` draws from entropy.
    pub seed: Option<u64>,
    pub route_provider: RouteProviderKind,
    pub pricing: PricingTable,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            search_delay_ms: DEFAULT_SEARCH_DELAY_MS,
            approach_duration_ms: DEFAULT_LEG_DURATION_MS,
            trip_duration_ms: DEFAULT_LEG_DURATION_MS,
            speed_multiplier: 16,
            max_search_attempts: 3,
            search_success_probability: 0.9,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            no_drivers_display_delay_ms: DEFAULT_NO_DRIVERS_DISPLAY_MS,
            driver_radius_miles: 2.0,
            avg_speed_mph: 30.0,
            seed: None,
            route_provider: RouteProviderKind::default(),
            pricing: PricingTable::default(),
        }
    }
}

impl SimulationConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.search_success_probability) {
            return Err(ConfigError::Invalid(format!(
                "search_success_probability must be within [0, 1], got {}",
                self.search_success_probability
            )));
        }
        if self.max_search_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_search_attempts must be at least 1".to_string(),
            ));
        }
        if self.approach_duration_ms == 0 || self.trip_duration_ms == 0 {
            return Err(ConfigError::Invalid(
                "leg durations must be positive".to_string(),
            ));
        }
        if self.avg_speed_mph.is_nan() || self.avg_speed_mph <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "avg_speed_mph must be positive, got {}",
                self.avg_speed_mph
            )));
        }
        if self.driver_radius_miles < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "driver_radius_miles must not be negative, got {}",
                self.driver_radius_miles
            )));
        }
        Ok(())
    }

    pub fn search_delay(&self) -> Duration {
        Duration::from_millis(self.search_delay_ms)
    }

    pub fn approach_duration(&self) -> Duration {
        Duration::from_millis(self.approach_duration_ms)
    }

    pub fn trip_duration(&self) -> Duration {
        Duration::from_millis(self.trip_duration_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn no_drivers_display_delay(&self) -> Duration {
        Duration::from_millis(self.no_drivers_display_delay_ms)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_search_delay_ms(mut self, ms: u64) -> Self {
        self.search_delay_ms = ms;
        self
    }

    pub fn with_leg_durations_ms(mut self, approach_ms: u64, trip_ms: u64) -> Self {
        self.approach_duration_ms = approach_ms;
        self.trip_duration_ms = trip_ms;
        self
    }

    pub fn with_max_search_attempts(mut self, attempts: u32) -> Self {
        self.max_search_attempts = attempts;
        self
    }

    pub fn with_search_success_probability(mut self, p: f64) -> Self {
        self.search_success_probability = p;
        self
    }

    pub fn with_retry_delay_ms(mut self, ms: u64) -> Self {
        self.retry_delay_ms = ms;
        self
    }

    pub fn with_route_provider(mut self, kind: RouteProviderKind) -> Self {
        self.route_provider = kind;
        self
    }

    pub fn with_pricing(mut self, pricing: PricingTable) -> Self {
        self.pricing = pricing;
        self
    }
}
