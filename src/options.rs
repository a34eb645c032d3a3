use alloc::vec::Vec;
use defmt::Format;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::gases::GasLimits;
use crate::pressure::{DepthConverter, Salinity};

/// Depth below which the slowest ascent speed applies.
pub const LAST_SPEED_CHANGE_DEPTH: f64 = 6.0;

const METRIC_STOP_DISTANCE: f64 = 3.0;
const IMPERIAL_STOP_DISTANCE: f64 = 3.048; // 10 ft

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Copy, Clone, PartialEq, Eq, Default)]
pub enum SafetyStop {
    #[default]
    Never,
    /// Only when the dive is deeper than `minimum_auto_stop_depth`.
    Auto,
    Always,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Copy, Clone, PartialEq, Eq, Default)]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

/// How much of the usable gas may be spent before turning the dive.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Copy, Clone, PartialEq, Eq, Default)]
pub enum UsageStrategy {
    #[default]
    All,
    Half,
    Thirds,
}

/// Snapshot of everything a profile computation needs besides the plan and tanks.
///
/// Depths in meters, speeds in meters per minute, durations in seconds,
/// pressures in bar, gas consumption in liters per minute.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Format, Copy, Clone, PartialEq)]
pub struct Options {
    pub gf_low: f64,                      // 0 < x <= 1
    pub gf_high: f64,                     // 0 < x <= 1
    pub altitude: f64,                    // m above sea level
    pub salinity: Salinity,
    pub units: Units,
    pub descent_speed: f64,               // m/min
    pub ascent_speed_50perc: f64,         // m/min, deeper than half of the max depth
    pub ascent_speed_50perc_to_6m: f64,   // m/min
    pub ascent_speed_6m: f64,             // m/min, last 6 m
    pub safety_stop: SafetyStop,
    pub safety_stop_depth: f64,           // m
    pub safety_stop_duration: f64,        // s
    pub minimum_auto_stop_depth: f64,     // m
    pub last_stop_depth: f64,             // m
    pub max_ppo2: f64,                    // bar
    pub max_deco_ppo2: f64,               // bar
    pub max_end: f64,                     // m
    pub oxygen_narcotic: bool,
    pub gas_switch_duration: f64,         // s
    pub problem_solving_duration: f64,    // s
    pub round_stops_to_minutes: bool,
    pub max_density: f64,                 // g/l
    pub sac_rate: f64,                    // l/min
    pub stress_sac_rate: f64,             // l/min
    pub min_reserve: f64,                 // bar
    pub usage_strategy: UsageStrategy,
}

impl Options {
    pub fn new(gf_low: f64, gf_high: f64) -> Self {
        Options {
            gf_low,
            gf_high,
            ..Options::default()
        }
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        check(in_unit_range(self.gf_low), "gf_low")?;
        check(in_unit_range(self.gf_high), "gf_high")?;
        check(self.gf_low <= self.gf_high, "gf_low")?;
        check((-500.0..=8000.0).contains(&self.altitude), "altitude")?;
        check(positive(self.descent_speed), "descent_speed")?;
        check(not_negative(self.ascent_speed_50perc), "ascent_speed_50perc")?;
        check(not_negative(self.ascent_speed_50perc_to_6m), "ascent_speed_50perc_to_6m")?;
        check(not_negative(self.ascent_speed_6m), "ascent_speed_6m")?;
        check(not_negative(self.safety_stop_depth), "safety_stop_depth")?;
        check(not_negative(self.safety_stop_duration), "safety_stop_duration")?;
        check(not_negative(self.minimum_auto_stop_depth), "minimum_auto_stop_depth")?;
        check(not_negative(self.last_stop_depth), "last_stop_depth")?;
        check(positive(self.max_ppo2), "max_ppo2")?;
        check(positive(self.max_deco_ppo2), "max_deco_ppo2")?;
        check(not_negative(self.max_end), "max_end")?;
        check(not_negative(self.gas_switch_duration), "gas_switch_duration")?;
        check(not_negative(self.problem_solving_duration), "problem_solving_duration")?;
        check(positive(self.max_density), "max_density")?;
        check(positive(self.sac_rate), "sac_rate")?;
        check(positive(self.stress_sac_rate), "stress_sac_rate")?;
        check(not_negative(self.min_reserve), "min_reserve")?;
        Ok(())
    }

    pub fn depth_converter(&self) -> DepthConverter {
        DepthConverter::new(self.salinity, self.altitude)
    }

    /// Distance between two deco stops, 3 m or 10 ft.
    pub fn stop_distance(&self) -> f64 {
        match self.units {
            Units::Metric => METRIC_STOP_DISTANCE,
            Units::Imperial => IMPERIAL_STOP_DISTANCE,
        }
    }

    /// Last stop depth, on the 10 ft grid in imperial units.
    pub fn last_stop(&self) -> f64 {
        self.on_grid(self.last_stop_depth)
    }

    /// Safety stop depth, on the 10 ft grid in imperial units.
    pub fn safety_stop_at(&self) -> f64 {
        self.on_grid(self.safety_stop_depth)
    }

    fn on_grid(&self, depth: f64) -> f64 {
        match self.units {
            Units::Metric => depth,
            Units::Imperial if depth <= 0.0 => 0.0,
            Units::Imperial => {
                let step = self.stop_distance();
                libm::round(depth / step).max(1.0) * step
            }
        }
    }

    pub fn bottom_limits(&self) -> GasLimits {
        GasLimits {
            max_ppo2: self.max_ppo2,
            max_end: self.max_end,
            oxygen_narcotic: self.oxygen_narcotic,
        }
    }

    pub fn deco_limits(&self) -> GasLimits {
        GasLimits {
            max_ppo2: self.max_deco_ppo2,
            ..self.bottom_limits()
        }
    }

    pub fn safety_stop_required(&self, max_depth: f64) -> bool {
        match self.safety_stop {
            SafetyStop::Never => false,
            SafetyStop::Auto => max_depth > self.minimum_auto_stop_depth,
            SafetyStop::Always => true,
        }
    }

    /// Ascent speed in m/min allowed at `depth` during a dive reaching `max_depth`.
    pub fn ascent_speed(&self, depth: f64, max_depth: f64) -> f64 {
        if depth <= LAST_SPEED_CHANGE_DEPTH {
            self.ascent_speed_6m
        } else if depth > max_depth / 2.0 {
            self.ascent_speed_50perc
        } else {
            self.ascent_speed_50perc_to_6m
        }
    }

    /// Splits an ascent from `from` to `to` at the speed tier boundaries.
    /// Returns `(start depth, end depth, duration in seconds)` for every piece.
    pub fn ascent_pieces(&self, from: f64, to: f64, max_depth: f64) -> Vec<(f64, f64, f64)> {
        let half = (max_depth / 2.0).max(LAST_SPEED_CHANGE_DEPTH);
        let mut pieces = Vec::with_capacity(3);
        let mut current = from;
        for boundary in [half, LAST_SPEED_CHANGE_DEPTH, to] {
            if boundary >= current || boundary < to {
                continue;
            }
            let speed = self.ascent_speed(current, max_depth);
            pieces.push((current, boundary, travel_seconds(current - boundary, speed)));
            current = boundary;
        }
        pieces
    }

    /// Seconds needed to ascend from `from` to `to`, honoring the speed tiers.
    pub fn ascent_duration(&self, from: f64, to: f64, max_depth: f64) -> f64 {
        self.ascent_pieces(from, to, max_depth)
            .iter()
            .map(|piece| piece.2)
            .sum()
    }

    /// Seconds needed to descend from `from` to `to`.
    pub fn descent_duration(&self, from: f64, to: f64) -> f64 {
        travel_seconds(to - from, self.descent_speed)
    }
}

impl Default for Options {
    fn default() -> Self {
        Options {
            gf_low: 1.0,
            gf_high: 1.0,
            altitude: 0.0,
            salinity: Salinity::Salt,
            units: Units::Metric,
            descent_speed: 20.0,
            ascent_speed_50perc: 9.0,
            ascent_speed_50perc_to_6m: 6.0,
            ascent_speed_6m: 3.0,
            safety_stop: SafetyStop::Never,
            safety_stop_depth: 3.0,
            safety_stop_duration: 180.0,
            minimum_auto_stop_depth: 10.0,
            last_stop_depth: 3.0,
            max_ppo2: 1.4,
            max_deco_ppo2: 1.6,
            max_end: 30.0,
            oxygen_narcotic: true,
            gas_switch_duration: 60.0,
            problem_solving_duration: 60.0,
            round_stops_to_minutes: false,
            max_density: 5.7,
            sac_rate: 20.0,
            stress_sac_rate: 30.0,
            min_reserve: 30.0,
            usage_strategy: UsageStrategy::All,
        }
    }
}

fn travel_seconds(distance: f64, speed: f64) -> f64 {
    if distance <= 0.0 {
        return 0.0;
    }
    if speed <= 0.0 {
        return f64::INFINITY;
    }
    distance / speed * 60.0
}

fn check(valid: bool, name: &'static str) -> Result<(), PlanError> {
    if valid {
        Ok(())
    } else {
        Err(PlanError::InvalidOption(name))
    }
}

fn in_unit_range(value: f64) -> bool {
    value > 0.0 && value <= 1.0
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn not_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}
