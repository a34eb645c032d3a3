use defmt::Format;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::gases::Gas;

/// Working pressure assumed when none is given, bar.
pub const DEFAULT_WORKING_PRESSURE: f64 = 200.0;

/// Single cylinder. Pressures in bar, size is the water volume in liters.
/// Gas is treated as ideal, so liters at surface = size * pressure.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Copy, Clone, PartialEq)]
pub struct Tank {
    pub size: f64,
    pub start_pressure: f64,
    pub working_pressure: f64,
    pub gas: Gas,
    pub consumed: f64,
    pub reserve: f64,
}

impl Tank {
    pub fn new(size: f64, start_pressure: f64, gas: Gas) -> Self {
        Tank {
            size,
            start_pressure,
            working_pressure: DEFAULT_WORKING_PRESSURE.max(start_pressure),
            gas,
            consumed: 0.0,
            reserve: 0.0,
        }
    }

    /// 15 l, 200 bar of air.
    pub fn air() -> Self {
        Self::new(15.0, 200.0, Gas::AIR)
    }

    pub fn validate(&self, index: usize) -> Result<(), PlanError> {
        let invalid = |reason| Err(PlanError::InvalidTank { index, reason });
        if !(self.size.is_finite() && self.size > 0.0) {
            return invalid("size must be positive");
        }
        if !(self.start_pressure.is_finite() && self.start_pressure >= 0.0) {
            return invalid("start pressure must not be negative");
        }
        if !(self.working_pressure.is_finite() && self.working_pressure > 0.0) {
            return invalid("working pressure must be positive");
        }
        if !(self.consumed.is_finite() && self.consumed >= 0.0) {
            return invalid("consumed gas must not be negative");
        }
        if !(self.reserve.is_finite() && self.reserve >= 0.0) {
            return invalid("reserve must not be negative");
        }
        self.gas.validate()
    }

    /// Remaining pressure, never below zero.
    pub fn end_pressure(&self) -> f64 {
        (self.start_pressure - self.consumed).max(0.0)
    }

    pub fn has_reserve(&self) -> bool {
        self.end_pressure() > self.reserve
    }

    /// Gas at surface pressure the full tank holds, liters.
    pub fn volume(&self) -> f64 {
        self.size * self.start_pressure
    }

    /// Gas still in the tank, liters.
    pub fn available(&self) -> f64 {
        self.size * self.end_pressure()
    }

    /// Pressure which may be spent before touching the reserve.
    pub fn usable(&self) -> f64 {
        (self.start_pressure - self.reserve).max(0.0)
    }

    pub fn consume_liters(&mut self, liters: f64) {
        self.consumed += liters / self.size;
    }
}

impl Default for Tank {
    fn default() -> Self {
        Self::air()
    }
}

/// Pressure after connecting tanks through a manifold or a transfill whip.
pub fn equalize(tanks: &[Tank]) -> f64 {
    let (gas, volume) = tanks.iter().fold((0.0, 0.0), |(gas, volume), tank| {
        (gas + tank.available(), volume + tank.size)
    });
    if volume <= 0.0 {
        return 0.0;
    }
    gas / volume
}

/// Smallest tank water volume holding `required` liters above `reserve`
/// when filled to `fill_pressure`. Infinite when the fill cannot cover the reserve.
pub fn pony_size(required: f64, fill_pressure: f64, reserve: f64) -> f64 {
    let usable = fill_pressure - reserve;
    if usable <= 0.0 {
        return f64::INFINITY;
    }
    required.max(0.0) / usable
}
