//! Depth to ambient pressure conversion.
//!
//! Surface pressure comes from the dive site altitude (international
//! barometric formula) and the water column weight from the salinity.
//! Nothing in here is global: every computation builds its own
//! [`DepthConverter`] from the [`Options`](crate::options::Options) snapshot.

use defmt::Format;
use libm::pow;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Standard atmosphere at sea level in bar.
pub const STANDARD_PRESSURE: f64 = 1.01325;

/// Standard gravity in m/s2.
pub const GRAVITY: f64 = 9.80665;

/// Water vapour pressure in the lungs (bar), at 37 deg celsius.
pub const WATER_VAPOR_PRESSURE: f64 = 0.0627;

// barometric formula constants
const TEMPERATURE_LAPSE_RATE: f64 = 0.0065; // K/m
const SEA_LEVEL_TEMPERATURE: f64 = 288.15; // K
const MOLAR_MASS_AIR: f64 = 0.0289644; // kg/mol
const GAS_CONSTANT: f64 = 8.31447; // J/(mol K)

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Copy, Clone, PartialEq, Eq, Default)]
pub enum Salinity {
    Fresh,
    /// EN13319 density used by most dive computers.
    Brackish,
    #[default]
    Salt,
}

impl Salinity {
    /// Water density in kg/m3.
    pub fn density(self) -> f64 {
        match self {
            Salinity::Fresh => 1000.0,
            Salinity::Brackish => 1020.0,
            Salinity::Salt => 1030.0,
        }
    }
}

/// Atmospheric pressure in bar at given altitude in meters above sea level.
pub fn altitude_pressure(altitude: f64) -> f64 {
    let exponent = GRAVITY * MOLAR_MASS_AIR / (GAS_CONSTANT * TEMPERATURE_LAPSE_RATE);
    let base = 1.0 - TEMPERATURE_LAPSE_RATE * altitude / SEA_LEVEL_TEMPERATURE;
    STANDARD_PRESSURE * pow(base.max(0.0), exponent)
}

/// Converts between depth in meters and absolute ambient pressure in bar.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Copy, Clone, PartialEq)]
pub struct DepthConverter {
    pub surface_pressure: f64,
    pub density: f64,
}

impl DepthConverter {
    pub fn new(salinity: Salinity, altitude: f64) -> Self {
        DepthConverter {
            surface_pressure: altitude_pressure(altitude),
            density: salinity.density(),
        }
    }

    /// Sea level, salt water.
    pub fn simple() -> Self {
        Self::new(Salinity::Salt, 0.0)
    }

    /// Bar added by one meter of water column.
    pub fn bar_per_meter(&self) -> f64 {
        self.density * GRAVITY / 100_000.0
    }

    /// Absolute pressure in bar at `depth` meters, never negative.
    pub fn to_bar(&self, depth: f64) -> f64 {
        (self.surface_pressure + depth * self.bar_per_meter()).max(0.0)
    }

    /// Depth in meters where the absolute pressure equals `bar`.
    /// Returns negative values for pressures below the surface pressure.
    pub fn from_bar(&self, bar: f64) -> f64 {
        (bar - self.surface_pressure) / self.bar_per_meter()
    }
}

impl Default for DepthConverter {
    fn default() -> Self {
        Self::simple()
    }
}
