//! Gas consumption, reserves and turn points of a computed profile.

use alloc::vec;
use alloc::vec::Vec;
use defmt::Format;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::options::{Options, UsageStrategy};
use crate::pressure::DepthConverter;
use crate::profile::CalculatedProfile;
use crate::segments::{Plan, Segment};
use crate::simulate::{calculate, emergency_ascent};
use crate::tanks::Tank;

/// Upper bound of the bottom time search, minutes.
pub const MAX_BOTTOM_TIME: u32 = 1000;

/// Surface liters breathed during `segment` at `sac` l/min.
pub fn segment_liters(segment: &Segment, sac: f64, converter: &DepthConverter) -> f64 {
    let average_bar = (converter.to_bar(segment.start_depth) + converter.to_bar(segment.end_depth)) / 2.0;
    segment.duration / 60.0 * sac * average_bar
}

/// Liters taken from each tank by `segments`.
pub fn consumed_liters(segments: &[Segment], tanks: usize, sac: f64, converter: &DepthConverter) -> Vec<f64> {
    let mut liters = vec![0.0; tanks];
    for segment in segments {
        if let Some(used) = segment.tank.and_then(|index| liters.get_mut(index)) {
            *used += segment_liters(segment, sac, converter);
        }
    }
    liters
}

/// Pressure at which the dive has to be turned.
pub fn turn_pressure(tank: &Tank, strategy: UsageStrategy) -> f64 {
    let usable = tank.usable();
    match strategy {
        UsageStrategy::All => tank.reserve,
        UsageStrategy::Half => tank.start_pressure - usable / 2.0,
        UsageStrategy::Thirds => tank.start_pressure - usable / 3.0,
    }
}

/// Seconds since the dive start when `tank` drops to `pressure` while
/// breathing the planned part of `segments` (before `ascent_start`).
/// When the plan ends first, the last planned depth is extended.
pub fn turn_time(
    segments: &[Segment],
    ascent_start: f64,
    index: usize,
    tank: &Tank,
    pressure: f64,
    sac: f64,
    converter: &DepthConverter,
) -> f64 {
    let mut budget = (tank.start_pressure - pressure).max(0.0) * tank.size; // l
    let mut time = 0.0;
    let mut depth = 0.0;
    for segment in segments {
        if time >= ascent_start {
            break;
        }
        depth = segment.end_depth;
        if segment.tank != Some(index) {
            time += segment.duration;
            continue;
        }
        let liters = segment_liters(segment, sac, converter);
        if liters >= budget && liters > 0.0 {
            return time + segment.duration * budget / liters;
        }
        budget -= liters;
        time += segment.duration;
    }
    let per_second = sac * converter.to_bar(depth) / 60.0;
    time + budget / per_second
}

/// Consumption figures of one computed profile.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Clone, PartialEq)]
pub struct Consumption {
    /// Input tanks with `consumed` and `reserve` filled in.
    pub tanks: Vec<Tank>,
    /// Turn pressure of the tank the dive starts with, bar.
    pub turn_pressure: f64,
    /// Seconds since dive start.
    pub turn_time: f64,
    /// Problem solving plus ascent from the deepest point, s.
    pub emergency_ascent_duration: f64,
}

impl Consumption {
    /// Every tank keeps its reserve.
    pub fn enough_gas(&self) -> bool {
        self.tanks
            .iter()
            .all(|tank| tank.consumed <= 0.0 || tank.has_reserve())
    }
}

/// Rock bottom in bar per tank: gas for the emergency ascent at the stress SAC,
/// at least `min_reserve` for every tank the dive or the ascent uses.
pub fn rock_bottom(plan: &Plan, tanks: &[Tank], options: &Options) -> Result<Vec<f64>, PlanError> {
    let emergency = emergency_ascent(plan, tanks, options)?;
    Ok(reserves(plan, tanks, &emergency, options))
}

fn reserves(plan: &Plan, tanks: &[Tank], emergency: &[Segment], options: &Options) -> Vec<f64> {
    let converter = options.depth_converter();
    let liters = consumed_liters(emergency, tanks.len(), options.stress_sac_rate, &converter);
    let used = |index: usize| {
        plan.segments
            .iter()
            .chain(emergency.iter())
            .any(|segment| segment.tank == Some(index))
    };
    tanks
        .iter()
        .enumerate()
        .map(|(index, tank)| {
            let reserve = liters[index] / tank.size;
            if used(index) {
                reserve.max(options.min_reserve)
            } else {
                reserve
            }
        })
        .collect()
}

/// Consumed gas and reserves of `profile` computed from `plan` and `tanks`.
pub fn consumption(
    plan: &Plan,
    profile: &CalculatedProfile,
    tanks: &[Tank],
    options: &Options,
) -> Result<Consumption, PlanError> {
    let converter = options.depth_converter();
    let emergency = emergency_ascent(plan, tanks, options)?;
    let reserves = reserves(plan, tanks, &emergency, options);
    let liters = consumed_liters(&profile.segments, tanks.len(), options.sac_rate, &converter);

    let tanks: Vec<Tank> = tanks
        .iter()
        .zip(reserves)
        .zip(liters)
        .map(|((tank, reserve), liters)| Tank {
            consumed: tank.consumed + liters / tank.size,
            reserve,
            ..*tank
        })
        .collect();

    let bottom = plan.segments.first().and_then(|segment| segment.tank).unwrap_or(0);
    let (turn_pressure, turn_time) = match tanks.get(bottom) {
        Some(tank) => {
            let pressure = turn_pressure(tank, options.usage_strategy);
            let time = turn_time(
                &profile.segments,
                profile.ascent_start,
                bottom,
                tank,
                pressure,
                options.sac_rate,
                &converter,
            );
            (pressure, time)
        }
        None => (0.0, 0.0),
    };

    Ok(Consumption {
        tanks,
        turn_pressure,
        turn_time,
        emergency_ascent_duration: emergency.iter().map(|segment| segment.duration).sum(),
    })
}

/// Longest bottom time in whole minutes of a simple dive to `depth` from
/// the first tank which keeps every reserve. Descent time is included.
pub fn max_bottom_time(depth: f64, tanks: &[Tank], options: &Options) -> Result<u32, PlanError> {
    options.validate()?;
    let first = tanks.first().ok_or(PlanError::UnknownTank(0))?;
    let gas = first.gas;
    let fits = |minutes: u32| -> Result<bool, PlanError> {
        let plan = Plan::simple(depth, minutes as f64 * 60.0, 0, gas, options);
        if plan.not_enough_time {
            return Ok(false);
        }
        let profile = calculate(&plan, tanks, options)?;
        if profile.not_enough_gas {
            return Ok(false);
        }
        Ok(consumption(&plan, &profile, tanks, options)?.enough_gas())
    };

    // the descent has to fit into the bottom time
    let shortest = (libm::ceil(options.descent_duration(0.0, depth) / 60.0) as u32).clamp(1, MAX_BOTTOM_TIME);
    if !fits(shortest)? {
        return Ok(0);
    }
    let (mut low, mut high) = (shortest, MAX_BOTTOM_TIME);
    if fits(high)? {
        return Ok(high);
    }
    while high - low > 1 {
        let middle = low + (high - low) / 2;
        if fits(middle)? {
            low = middle;
        } else {
            high = middle;
        }
    }
    defmt::debug!("max bottom time at {} m: {} min", depth, low);
    Ok(low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gases::Gas;

    #[test]
    fn test_level_segment_liters() {
        let converter = DepthConverter::simple();
        let segment = Segment::level(10.0, 600.0, Gas::AIR, Some(0));
        let liters = segment_liters(&segment, 20.0, &converter);
        assert!((liters - 200.0 * converter.to_bar(10.0)).abs() < 1e-9);
    }

    #[test]
    fn test_turn_pressure_strategies() {
        let tank = Tank {
            reserve: 50.0,
            ..Tank::air()
        };
        assert_eq!(turn_pressure(&tank, UsageStrategy::All), 50.0);
        assert_eq!(turn_pressure(&tank, UsageStrategy::Half), 125.0);
        assert_eq!(turn_pressure(&tank, UsageStrategy::Thirds), 150.0);
    }

    #[test]
    fn test_turn_time_extrapolates_at_bottom() {
        let converter = DepthConverter::simple();
        let tank = Tank::air();
        let segments = [Segment::level(0.0, 60.0, Gas::AIR, Some(0))];
        // 1500 l budget, 20 l/min at the surface pressure
        let time = turn_time(&segments, 60.0, 0, &tank, 100.0, 20.0, &converter);
        let expected = 1500.0 / (20.0 * converter.surface_pressure) * 60.0;
        assert!((time - expected).abs() < 1e-6, "{}", time);
    }

    #[test]
    fn test_max_bottom_time_below_20m() {
        let options = Options::default();
        let tanks = [Tank::new(24.0, 200.0, Gas::AIR)];
        let at_30 = max_bottom_time(30.0, &tanks, &options).unwrap();
        let at_40 = max_bottom_time(40.0, &tanks, &options).unwrap();
        assert!(at_30 > 5, "{}", at_30);
        assert!(at_40 > 3, "{}", at_40);
        assert!(at_40 < at_30);
    }

    #[test]
    fn test_max_bottom_time_without_enough_gas() {
        let options = Options::default();
        let tanks = [Tank::new(1.0, 50.0, Gas::AIR)];
        assert_eq!(max_bottom_time(30.0, &tanks, &options), Ok(0));
    }

    #[test]
    fn test_unused_tank_has_no_consumption() {
        let converter = DepthConverter::simple();
        let segments = [Segment::level(10.0, 600.0, Gas::AIR, Some(1))];
        let liters = consumed_liters(&segments, 2, 20.0, &converter);
        assert_eq!(liters[0], 0.0);
        assert!(liters[1] > 0.0);
    }
}
