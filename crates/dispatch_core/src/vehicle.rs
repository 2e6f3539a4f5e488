//! Vehicle classes and the vehicle pools drivers are drawn from.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Pricing and eligibility category chosen at request time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleClass {
    #[default]
    Standard,
    #[serde(alias = "wheelchair")]
    Accessible,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 2] = [VehicleClass::Standard, VehicleClass::Accessible];

    /// Identifier used by the pricing table.
    pub fn pricing_key(self) -> &'static str {
        match self {
            VehicleClass::Standard => "standard",
            VehicleClass::Accessible => "wheelchair",
        }
    }

    pub fn is_accessible(self) -> bool {
        matches!(self, VehicleClass::Accessible)
    }

    /// Vehicles a driver of this class may be driving.
    pub fn vehicle_pool(self) -> &'static [VehicleModel] {
        match self {
            VehicleClass::Standard => STANDARD_VEHICLES,
            VehicleClass::Accessible => ACCESSIBLE_VEHICLES,
        }
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleClass::Standard => f.write_str("standard"),
            VehicleClass::Accessible => f.write_str("accessible"),
        }
    }
}

impl FromStr for VehicleClass {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(VehicleClass::Standard),
            "accessible" | "wheelchair" => Ok(VehicleClass::Accessible),
            other => Err(DispatchError::UnknownVehicleClass(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VehicleModel {
    pub make: &'static str,
    pub model: &'static str,
}

const fn model(make: &'static str, model: &'static str) -> VehicleModel {
    VehicleModel { make, model }
}

pub const STANDARD_VEHICLES: &[VehicleModel] = &[
    model("Honda", "Civic"),
    model("Toyota", "Camry"),
    model("Honda", "Accord"),
    model("Nissan", "Altima"),
    model("Toyota", "Corolla"),
    model("Hyundai", "Elantra"),
    model("Ford", "Focus"),
    model("Chevrolet", "Cruze"),
];

pub const ACCESSIBLE_VEHICLES: &[VehicleModel] = &[
    model("Honda", "Odyssey"),
    model("Toyota", "Sienna"),
    model("Chrysler", "Pacifica"),
    model("Ford", "Transit Connect"),
];

pub const VEHICLE_COLORS: &[&str] = &[
    "Silver", "White", "Black", "Gray", "Blue", "Red", "Green", "Brown",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_accessible_spellings() {
        assert_eq!("accessible".parse::<VehicleClass>(), Ok(VehicleClass::Accessible));
        assert_eq!("Wheelchair".parse::<VehicleClass>(), Ok(VehicleClass::Accessible));
        assert_eq!("standard".parse::<VehicleClass>(), Ok(VehicleClass::Standard));
    }

    #[test]
    fn rejects_unknown_class() {
        assert_eq!(
            "limo".parse::<VehicleClass>(),
            Err(DispatchError::UnknownVehicleClass("limo".to_string()))
        );
    }

    #[test]
    fn serde_accepts_wheelchair_alias() {
        let class: VehicleClass = serde_json::from_str("\"wheelchair\"").expect("parse");
        assert_eq!(class, VehicleClass::Accessible);
        assert_eq!(
            serde_json::to_string(&VehicleClass::Accessible).expect("serialize"),
            "\"accessible\""
        );
    }

    #[test]
    fn accessible_pool_is_separate() {
        assert!(VehicleClass::Accessible
            .vehicle_pool()
            .iter()
            .all(|v| !STANDARD_VEHICLES.contains(v)));
    }
}
