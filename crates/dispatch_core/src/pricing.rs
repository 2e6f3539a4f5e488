//! Fare calculation per vehicle class.
//!
//! Formula: `fare = base + km * per_km + minutes * per_min + surcharge`,
//! floored at the class minimum. Without route information the minimum fare
//! is charged.

use chrono::{Duration, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::format::{format_clock_time, format_fare};
use crate::routing::RouteInfo;
use crate::vehicle::VehicleClass;

/// Rates for one vehicle class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleConfig {
    pub name: String,
    pub base_rate: f64,
    pub per_km_rate: f64,
    pub per_min_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surcharge: Option<f64>,
    pub minimum_fare: f64,
    /// Minutes until a vehicle of this class reaches the pickup.
    pub arrival_time_minutes: u32,
}

/// Read-only pricing table keyed by vehicle class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingTable {
    pub standard: VehicleConfig,
    #[serde(alias = "accessible")]
    pub wheelchair: VehicleConfig,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self {
            standard: VehicleConfig {
                name: "Standard Ride".to_string(),
                base_rate: 3.50,
                per_km_rate: 1.25,
                per_min_rate: 0.30,
                surcharge: None,
                minimum_fare: 8.00,
                arrival_time_minutes: 4,
            },
            wheelchair: VehicleConfig {
                name: "Wheelchair Van".to_string(),
                base_rate: 5.00,
                per_km_rate: 1.60,
                per_min_rate: 0.40,
                surcharge: Some(5.00),
                minimum_fare: 12.00,
                arrival_time_minutes: 6,
            },
        }
    }
}

/// Formatted pricing shown when choosing a ride.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricingInfo {
    /// e.g. `$15.50`
    pub price: String,
    /// When the vehicle reaches the pickup, e.g. `11:44 PM`.
    pub arrival_time: String,
    /// Arrival plus travel time.
    pub eta: String,
    pub away_time: String,
}

/// One row of the ride chooser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehiclePricing {
    pub class: VehicleClass,
    pub id: &'static str,
    pub config: VehicleConfig,
    pub fare: f64,
    pub pricing: PricingInfo,
}

impl PricingTable {
    pub fn config(&self, class: VehicleClass) -> &VehicleConfig {
        match class {
            VehicleClass::Standard => &self.standard,
            VehicleClass::Accessible => &self.wheelchair,
        }
    }

    pub fn calculate_fare(&self, route_info: Option<&RouteInfo>, class: VehicleClass) -> f64 {
        let config = self.config(class);
        let Some(info) = route_info else {
            return config.minimum_fare;
        };

        let distance_km = info.distance_meters / 1000.0;
        let duration_min = info.duration_seconds / 60.0;
        let fare = config.base_rate
            + distance_km * config.per_km_rate
            + duration_min * config.per_min_rate
            + config.surcharge.unwrap_or(0.0);

        fare.max(config.minimum_fare)
    }

    /// Pricing as of `now`.
    pub fn pricing_info_at(
        &self,
        route_info: Option<&RouteInfo>,
        class: VehicleClass,
        now: NaiveDateTime,
    ) -> PricingInfo {
        let config = self.config(class);
        let fare = self.calculate_fare(route_info, class);

        let arrival = now + Duration::minutes(i64::from(config.arrival_time_minutes));
        let eta = match route_info {
            Some(info) => arrival + Duration::milliseconds((info.duration_seconds * 1000.0) as i64),
            None => arrival,
        };

        PricingInfo {
            price: format_fare(fare),
            arrival_time: format_clock_time(arrival),
            eta: format_clock_time(eta),
            away_time: format!("{} min away", config.arrival_time_minutes),
        }
    }

    /// Pricing against the local wall clock.
    pub fn pricing_info(&self, route_info: Option<&RouteInfo>, class: VehicleClass) -> PricingInfo {
        self.pricing_info_at(route_info, class, Local::now().naive_local())
    }

    /// Pricing for every vehicle class, in [`VehicleClass::ALL`] order.
    pub fn all_vehicle_pricing_at(
        &self,
        route_info: Option<&RouteInfo>,
        now: NaiveDateTime,
    ) -> Vec<VehiclePricing> {
        VehicleClass::ALL
            .iter()
            .map(|&class| VehiclePricing {
                class,
                id: class.pricing_key(),
                config: self.config(class).clone(),
                fare: self.calculate_fare(route_info, class),
                pricing: self.pricing_info_at(route_info, class, now),
            })
            .collect()
    }

    pub fn all_vehicle_pricing(&self, route_info: Option<&RouteInfo>) -> Vec<VehiclePricing> {
        self.all_vehicle_pricing_at(route_info, Local::now().naive_local())
    }
}

/// Fare under the default pricing table.
pub fn calculate_fare(route_info: Option<&RouteInfo>, class: VehicleClass) -> f64 {
    PricingTable::default().calculate_fare(route_info, class)
}
