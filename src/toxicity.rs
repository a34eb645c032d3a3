//! Oxygen exposure bookkeeping.
//!
//! CNS uses the NOAA single exposure limits, OTU the Lambertsen unit
//! pulmonary toxic dose. Both are advisory counters, the scheduler never
//! reacts to them.

use defmt::Format;
use libm::pow;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Recommended maximum OTU for a single day.
pub const OTU_DAILY_LIMIT: f64 = 850.0;

const MIN_TOXIC_PPO2: f64 = 0.5;

// (ppO2 in bar, allowed exposure in minutes)
const NOAA_LIMITS: [(f64, f64); 11] = [
    (0.6, 720.0),
    (0.7, 570.0),
    (0.8, 450.0),
    (0.9, 360.0),
    (1.0, 300.0),
    (1.1, 240.0),
    (1.2, 210.0),
    (1.3, 180.0),
    (1.4, 150.0),
    (1.5, 120.0),
    (1.6, 45.0),
];

/// Allowed exposure in minutes at constant `ppo2`, infinite when harmless.
pub fn cns_limit(ppo2: f64) -> f64 {
    if ppo2 <= MIN_TOXIC_PPO2 {
        return f64::INFINITY;
    }
    let (first_ppo2, first_limit) = NOAA_LIMITS[0];
    if ppo2 <= first_ppo2 {
        // between 0.5 and 0.6 the table slope continues towards no limit
        let fraction = (ppo2 - MIN_TOXIC_PPO2) / (first_ppo2 - MIN_TOXIC_PPO2);
        return first_limit / fraction;
    }
    for pair in NOAA_LIMITS.windows(2) {
        let (low_ppo2, low_limit) = pair[0];
        let (high_ppo2, high_limit) = pair[1];
        if ppo2 <= high_ppo2 {
            let fraction = (ppo2 - low_ppo2) / (high_ppo2 - low_ppo2);
            return low_limit + (high_limit - low_limit) * fraction;
        }
    }
    NOAA_LIMITS[NOAA_LIMITS.len() - 1].1
}

/// CNS clock fraction (1.0 = 100 %) for `seconds` at constant `ppo2`.
pub fn cns(ppo2: f64, seconds: f64) -> f64 {
    let limit = cns_limit(ppo2);
    if !limit.is_finite() || seconds <= 0.0 {
        return 0.0;
    }
    seconds / 60.0 / limit
}

/// Oxygen tolerance units for `seconds` at constant `ppo2`.
pub fn otu(ppo2: f64, seconds: f64) -> f64 {
    if ppo2 <= MIN_TOXIC_PPO2 || seconds <= 0.0 {
        return 0.0;
    }
    seconds / 60.0 * pow((ppo2 - MIN_TOXIC_PPO2) / MIN_TOXIC_PPO2, 0.833)
}

/// Running CNS and OTU totals of one dive.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Copy, Clone, PartialEq, Default)]
pub struct OxygenToxicity {
    pub cns: f64,
    pub otu: f64,
}

impl OxygenToxicity {
    /// Adds a linear ppO2 change over `seconds`, sampled at its midpoint.
    pub fn add(&mut self, start_ppo2: f64, end_ppo2: f64, seconds: f64) {
        let ppo2 = (start_ppo2 + end_ppo2) / 2.0;
        self.cns += cns(ppo2, seconds);
        self.otu += otu(ppo2, seconds);
    }

    pub fn cns_exceeded(&self) -> bool {
        self.cns > 1.0
    }

    pub fn otu_exceeded(&self) -> bool {
        self.otu > OTU_DAILY_LIMIT
    }
}
