//! Profile scheduler: swims the requested plan and discovers the ascent.
//!
//! The plan is integrated as given. From its last point the scheduler walks
//! up the stop grid: on every stop it picks the best deco gas, holds while the
//! ceiling is deeper than the next stop and otherwise ascends to the next stop
//! with the speed of the current tier.

use alloc::vec::Vec;
use libm::{ceil, fabs, floor};

use crate::ceiling::{Ceiling, GradientFactors};
use crate::consumption::segment_liters;
use crate::error::PlanError;
use crate::events::{EventType, Events, analyze};
use crate::gases::{Gas, best_gas};
use crate::options::Options;
use crate::pressure::DepthConverter;
use crate::profile::CalculatedProfile;
use crate::segments::{DEPTH_TOLERANCE, Plan, Segment, SegmentKind};
use crate::tanks::Tank;
use crate::tissue::{LoadSegment, Tissues};
use crate::toxicity::OxygenToxicity;

/// Bound on scheduler steps, hold minutes included.
pub const ITERATION_LIMIT: usize = 10_000;

/// Longest piece integrated at once, one ceiling is recorded after each.
const STEP: f64 = 60.0; // s
const HOLD_TICK: f64 = 60.0; // s
const GAS_TOLERANCE: f64 = 1e-6; // l

/// Why the scheduler stopped before reaching the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Interrupt {
    OutOfGas,
    Broken,
}

struct Scheduler<'a> {
    options: &'a Options,
    converter: DepthConverter,
    tanks: &'a [Tank],
    gas_left: Vec<f64>, // l
    track_gas: bool,
    tissues: Tissues,
    gf: GradientFactors,
    toxicity: OxygenToxicity,
    segments: Vec<Segment>,
    ceilings: Vec<Ceiling>,
    events: Events,
    time: f64,
    depth: f64,
    gas: Gas,
    tank: Option<usize>,
    max_depth: f64,
    ascent_index: usize,
    iterations: usize,
    no_deco_exceeded: bool,
    not_enough_gas: bool,
    broken_ceiling: bool,
}

impl<'a> Scheduler<'a> {
    fn new(tanks: &'a [Tank], options: &'a Options, track_gas: bool) -> Self {
        let converter = options.depth_converter();
        Scheduler {
            options,
            converter,
            tanks,
            gas_left: tanks.iter().map(Tank::available).collect(),
            track_gas,
            tissues: Tissues::surface_equilibrium(converter.surface_pressure),
            gf: GradientFactors::from_options(options),
            toxicity: OxygenToxicity::default(),
            segments: Vec::new(),
            ceilings: Vec::new(),
            events: Events::new(),
            time: 0.0,
            depth: 0.0,
            gas: Gas::AIR,
            tank: None,
            max_depth: 0.0,
            ascent_index: usize::MAX,
            iterations: 0,
            no_deco_exceeded: false,
            not_enough_gas: false,
            broken_ceiling: false,
        }
    }

    /// Integrates the plan as requested, switching tanks where the plan does.
    fn swim(&mut self, plan: &Plan) -> Result<(), Interrupt> {
        self.max_depth = plan.max_depth();
        for (index, segment) in plan.segments.iter().enumerate() {
            if index == 0 {
                self.gas = segment.gas;
                self.tank = segment.tank;
            } else if segment.tank != self.tank || segment.gas != self.gas {
                self.gas = segment.gas;
                self.tank = segment.tank;
                if self.options.gas_switch_duration > 0.0 {
                    let switch = Segment::level(segment.start_depth, self.options.gas_switch_duration, self.gas, self.tank)
                        .with_kind(SegmentKind::GasSwitch);
                    self.execute(switch)?;
                }
            }
            self.execute(*segment)?;
        }
        Ok(())
    }

    fn ascend_to_surface(&mut self) -> Result<(), Interrupt> {
        self.ascent_index = self.segments.len();
        let stop_distance = self.options.stop_distance();
        let last_stop = self.options.last_stop();
        let safety_stop = self.options.safety_stop_at();
        let mut safety_pending = self.options.safety_stop_required(self.max_depth);
        defmt::debug!("ascent from {} m, safety stop pending: {}", self.depth, safety_pending);

        while self.depth > DEPTH_TOLERANCE {
            self.tick()?;
            self.switch_gas()?;

            let safety_depth = if safety_pending {
                Some(safety_stop)
            } else {
                None
            };
            let next = next_stop(self.depth, stop_distance, last_stop, safety_depth);
            let deco = self.hold_duration(next)?;
            let on_safety_stop = safety_pending && fabs(self.depth - safety_stop) <= DEPTH_TOLERANCE;

            if deco > 0.0 || on_safety_stop {
                let mut duration = deco;
                let mut kind = SegmentKind::DecoStop;
                if deco > 0.0 {
                    self.no_deco_exceeded = true;
                }
                if on_safety_stop {
                    safety_pending = false;
                    if deco < self.options.safety_stop_duration {
                        duration = self.options.safety_stop_duration;
                        if deco <= 0.0 {
                            kind = SegmentKind::SafetyStop;
                        }
                    }
                    defmt::debug!("safety stop at {} m", self.depth);
                }
                defmt::debug!("stop at {} m for {} s", self.depth, duration);
                let stop = Segment::level(self.depth, duration, self.gas, self.tank).with_kind(kind);
                self.execute(stop)?;
            }
            self.ascend(next)?;
        }
        self.depth = 0.0;
        Ok(())
    }

    /// Seconds to stay at the current depth until the ceiling allows `next`.
    fn hold_duration(&mut self, next: f64) -> Result<f64, Interrupt> {
        let mut gf = self.gf;
        if gf.ceiling(&self.tissues, &self.converter) <= next + DEPTH_TOLERANCE {
            return Ok(0.0);
        }

        let pressure = self.converter.to_bar(self.depth);
        let mut tissues = self.tissues;
        let mut duration = 0.0;
        loop {
            self.tick()?;
            let before = tissues;
            tissues.load(&LoadSegment::flat(pressure, HOLD_TICK), &self.gas);
            duration += HOLD_TICK;
            if gf.ceiling(&tissues, &self.converter) > next + DEPTH_TOLERANCE {
                continue;
            }
            if self.options.round_stops_to_minutes {
                return Ok(duration);
            }
            // the last minute cleared the ceiling, find the second it happened
            let (mut low, mut high) = (0.0, HOLD_TICK);
            while high - low > 1.0 {
                let middle = floor((low + high) / 2.0);
                let probe = before.loaded(&LoadSegment::flat(pressure, middle), &self.gas);
                if gf.ceiling(&probe, &self.converter) > next + DEPTH_TOLERANCE {
                    low = middle;
                } else {
                    high = middle;
                }
            }
            return Ok(duration - HOLD_TICK + ceil(high));
        }
    }

    /// Ascends to `target` through the speed tiers.
    fn ascend(&mut self, target: f64) -> Result<(), Interrupt> {
        for (start, end, seconds) in self.options.ascent_pieces(self.depth, target, self.max_depth) {
            if !seconds.is_finite() {
                defmt::warn!("ascent from {} m can not finish", start);
                return Err(self.broken());
            }
            let piece = Segment::new(start, end, seconds, self.gas, self.tank);
            self.execute(piece)?;
        }
        Ok(())
    }

    /// Changes to the best breathable tank for the current depth.
    fn switch_gas(&mut self) -> Result<(), Interrupt> {
        let limits = self.options.deco_limits();
        let candidates = self
            .tanks
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.track_gas || self.gas_left[*index] > GAS_TOLERANCE)
            .map(|(index, tank)| (index, tank.gas));
        let Some(best) = best_gas(candidates, self.depth, &limits, &self.converter) else {
            return Ok(());
        };
        let gas = self.tanks[best].gas;
        let current_breathable = self.gas.is_breathable(self.depth, &limits, &self.converter);
        let richer = gas.o2 > self.gas.o2 + 1e-9;
        if Some(best) == self.tank || gas == self.gas || !(richer || !current_breathable) {
            return Ok(());
        }

        defmt::info!("gas switch at {} m to tank {}", self.depth, best);
        self.gas = gas;
        self.tank = Some(best);
        if self.options.gas_switch_duration > 0.0 {
            let switch = Segment::level(self.depth, self.options.gas_switch_duration, gas, self.tank)
                .with_kind(SegmentKind::GasSwitch);
            self.execute(switch)?;
        }
        Ok(())
    }

    /// Breathes the segment: charges the tank, loads tissues and appends it.
    fn execute(&mut self, segment: Segment) -> Result<(), Interrupt> {
        let mut segment = segment;
        let mut exhausted = false;

        if let (true, Some(tank)) = (self.track_gas, segment.tank) {
            let needed = segment_liters(&segment, self.options.sac_rate, &self.converter);
            let left = self.gas_left[tank];
            if needed > left + GAS_TOLERANCE {
                match self.spare_tank(&segment) {
                    Some(spare) => {
                        defmt::info!("tank {} is empty, breathing from tank {}", tank, spare);
                        segment.tank = Some(spare);
                        segment.gas = self.tanks[spare].gas;
                        self.tank = segment.tank;
                        self.gas = segment.gas;
                        self.gas_left[spare] -= segment_liters(&segment, self.options.sac_rate, &self.converter);
                    }
                    None => {
                        let fraction = if needed > 0.0 { (left / needed).clamp(0.0, 1.0) } else { 0.0 };
                        let duration = segment.duration * fraction;
                        segment.end_depth = segment.depth_at(duration);
                        segment.duration = duration;
                        self.gas_left[tank] = 0.0;
                        exhausted = true;
                    }
                }
            } else {
                self.gas_left[tank] = left - needed;
            }
        }

        self.integrate(&segment);
        self.append(segment);

        if exhausted {
            defmt::warn!("out of gas at {} m after {} s", self.depth, self.time);
            self.not_enough_gas = true;
            self.events
                .add(EventType::NotEnoughGas, self.time, self.depth, Some(self.gas), Some(self.segments.len() - 1));
            return Err(Interrupt::OutOfGas);
        }
        Ok(())
    }

    /// Another tank breathable at the segment depth holding gas for all of it.
    fn spare_tank(&self, segment: &Segment) -> Option<usize> {
        if self.segments.len() < self.ascent_index {
            return None;
        }
        let limits = self.options.deco_limits();
        let candidates = self.tanks.iter().enumerate().filter_map(|(index, tank)| {
            let candidate = Segment { gas: tank.gas, tank: Some(index), ..*segment };
            let needed = segment_liters(&candidate, self.options.sac_rate, &self.converter);
            let enough = Some(index) != segment.tank && self.gas_left[index] >= needed;
            let breathable = tank.gas.is_breathable(segment.max_depth(), &limits, &self.converter);
            (enough && breathable).then_some((index, tank.gas))
        });
        best_gas(candidates, segment.start_depth.min(segment.end_depth), &limits, &self.converter)
    }

    /// Loads tissues in pieces of at most one minute, recording a ceiling after each.
    fn integrate(&mut self, segment: &Segment) {
        let pieces = ceil(segment.duration / STEP).max(1.0) as usize;
        let step = segment.duration / pieces as f64;
        for piece in 0..pieces {
            let start = segment.depth_at(step * piece as f64);
            let end = segment.depth_at(step * (piece + 1) as f64);
            let load = LoadSegment {
                start_pressure: self.converter.to_bar(start),
                end_pressure: self.converter.to_bar(end),
                duration: step,
            };
            self.tissues.load(&load, &segment.gas);
            self.toxicity.add(
                segment.gas.ppo2(start, &self.converter),
                segment.gas.ppo2(end, &self.converter),
                step,
            );
            self.time += step;
            if step > 0.0 {
                let depth = self.gf.ceiling(&self.tissues, &self.converter);
                self.ceilings.push(Ceiling { time: self.time, depth });
            }
        }
        self.depth = segment.end_depth;
    }

    /// Appends the segment, joining computed ascents breathed from the same tank.
    fn append(&mut self, segment: Segment) {
        let ascending = self.segments.len() > self.ascent_index;
        if let Some(last) = self.segments.last_mut() {
            let joinable = ascending
                && last.kind == SegmentKind::Ascent
                && segment.kind == SegmentKind::Ascent
                && last.gas == segment.gas
                && last.tank == segment.tank
                && fabs(last.end_depth - segment.start_depth) <= DEPTH_TOLERANCE;
            if joinable {
                last.end_depth = segment.end_depth;
                last.duration += segment.duration;
                return;
            }
        }
        self.segments.push(segment);
    }

    fn tick(&mut self) -> Result<(), Interrupt> {
        self.iterations += 1;
        if self.iterations > ITERATION_LIMIT {
            defmt::warn!("ascent not finished after {} steps", ITERATION_LIMIT);
            return Err(self.broken());
        }
        Ok(())
    }

    fn broken(&mut self) -> Interrupt {
        self.broken_ceiling = true;
        self.events
            .add(EventType::BrokenCeiling, self.time, self.depth, Some(self.gas), self.segments.len().checked_sub(1));
        Interrupt::Broken
    }

    fn finish(self, not_enough_time: bool) -> CalculatedProfile {
        let ascent_start = self.ascent_start();
        let mut events = self.events;
        analyze(&self.segments, &self.ceilings, self.options, ascent_start, &mut events);
        let broken_ceiling = self.broken_ceiling || events.contains(EventType::BrokenCeiling);
        CalculatedProfile {
            segments: self.segments,
            ceilings: self.ceilings,
            events,
            no_deco_exceeded: self.no_deco_exceeded,
            not_enough_gas: self.not_enough_gas,
            not_enough_time,
            broken_ceiling,
            tissues: self.tissues,
            oxygen_toxicity: self.toxicity,
            ascent_start,
        }
    }

    fn ascent_start(&self) -> f64 {
        self.segments
            .iter()
            .take(self.ascent_index.min(self.segments.len()))
            .map(|segment| segment.duration)
            .sum()
    }
}

/// Next depth of the stop grid strictly above `depth`.
///
/// Stops shallower than `last_stop` are skipped and a pending safety stop
/// is inserted when it lies between the current depth and the grid stop.
pub fn next_stop(depth: f64, stop_distance: f64, last_stop: f64, safety_stop: Option<f64>) -> f64 {
    let grid = (floor((depth - DEPTH_TOLERANCE) / stop_distance) * stop_distance).max(0.0);
    let mut next = if grid < last_stop - DEPTH_TOLERANCE {
        if depth > last_stop + DEPTH_TOLERANCE { last_stop } else { 0.0 }
    } else {
        grid
    };
    if let Some(safety) = safety_stop {
        if safety < depth - DEPTH_TOLERANCE && safety > next + DEPTH_TOLERANCE {
            next = safety;
        }
    }
    next
}

fn validate(plan: &Plan, tanks: &[Tank], options: &Options) -> Result<(), PlanError> {
    options.validate()?;
    for (index, tank) in tanks.iter().enumerate() {
        tank.validate(index)?;
    }
    plan.validate(tanks.len())
}

/// Computes the full profile for `plan`: the requested segments followed by
/// the ascent with all stops and gas switches.
///
/// Only invalid input is reported as an error. Running out of gas, a broken
/// ceiling or missing time end up as flags and events of the profile.
pub fn calculate(plan: &Plan, tanks: &[Tank], options: &Options) -> Result<CalculatedProfile, PlanError> {
    validate(plan, tanks, options)?;
    let mut scheduler = Scheduler::new(tanks, options, true);
    if scheduler.swim(plan).is_ok() {
        // interruptions are already recorded as flags
        let _ = scheduler.ascend_to_surface();
    }
    defmt::info!(
        "profile: {} segments, {} s, deco: {}",
        scheduler.segments.len(),
        scheduler.time,
        scheduler.no_deco_exceeded
    );
    Ok(scheduler.finish(plan.not_enough_time))
}

/// Single level dive breathing from twin 12 l filled to 200 bar with `gas`.
/// `duration` counts from the start of the descent, in seconds.
pub fn simple_dive(depth: f64, duration: f64, gas: Gas, options: &Options) -> Result<CalculatedProfile, PlanError> {
    let tank = [Tank::new(24.0, 200.0, gas)];
    let plan = Plan::simple(depth, duration, 0, gas, options);
    calculate(&plan, &tank, options)
}

/// Index of the last segment reaching the maximum depth of the plan.
pub fn last_max_depth_index(plan: &Plan) -> Option<usize> {
    let max_depth = plan.max_depth();
    plan.segments
        .iter()
        .rposition(|segment| fabs(segment.max_depth() - max_depth) <= DEPTH_TOLERANCE)
}

/// Worst case ascent: the plan is cut at its last point at maximum depth,
/// the diver solves a problem there and ascends without any gas limit.
/// Returns the problem solving hold followed by the ascent.
pub fn emergency_ascent(plan: &Plan, tanks: &[Tank], options: &Options) -> Result<Vec<Segment>, PlanError> {
    validate(plan, tanks, options)?;
    let cut = last_max_depth_index(plan).ok_or(PlanError::EmptyPlan)?;
    let last = plan.segments[cut];
    let max_depth = last.max_depth();

    let mut segments: Vec<Segment> = plan.segments[..=cut].to_vec();
    if last.end_depth < max_depth - DEPTH_TOLERANCE {
        // the deepest point is the start of an ascending segment
        segments[cut] = Segment::level(max_depth, 0.0, last.gas, last.tank);
    }
    let mut emergency = Plan::new(segments);
    let start = emergency.segments.len();
    emergency.push(Segment::level(max_depth, options.problem_solving_duration, last.gas, last.tank));

    let mut scheduler = Scheduler::new(tanks, options, false);
    if scheduler.swim(&emergency).is_ok() {
        let _ = scheduler.ascend_to_surface();
    }
    Ok(scheduler.segments.split_off(start.min(scheduler.segments.len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_stop_on_grid() {
        assert_eq!(next_stop(30.0, 3.0, 3.0, None), 27.0);
        assert_eq!(next_stop(31.3, 3.0, 3.0, None), 30.0);
        assert_eq!(next_stop(6.0, 3.0, 3.0, None), 3.0);
        assert_eq!(next_stop(3.0, 3.0, 3.0, None), 0.0);
    }

    #[test]
    fn test_next_stop_respects_last_stop() {
        assert_eq!(next_stop(6.0, 3.0, 6.0, None), 0.0);
        assert_eq!(next_stop(6.0, 3.0, 5.0, None), 5.0);
        assert_eq!(next_stop(5.0, 3.0, 5.0, None), 0.0);
    }

    #[test]
    fn test_next_stop_inserts_safety_stop() {
        assert_eq!(next_stop(6.0, 3.0, 6.0, Some(3.0)), 3.0);
        assert_eq!(next_stop(6.0, 3.0, 3.0, Some(5.0)), 5.0);
        assert_eq!(next_stop(3.0, 3.0, 3.0, Some(3.0)), 0.0);
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let options = Options::new(0.0, 0.8);
        let result = simple_dive(30.0, 1200.0, Gas::AIR, &options);
        assert_eq!(result, Err(PlanError::InvalidOption("gf_low")));
    }

    #[test]
    fn test_ascent_ends_on_surface() {
        let profile = simple_dive(18.0, 30.0 * 60.0, Gas::AIR, &Options::default()).unwrap();
        assert!(profile.ends_on_surface());
        assert!((profile.ascent_start - 30.0 * 60.0).abs() < 1e-9);
        assert!(!profile.no_deco_exceeded);
    }

    #[test]
    fn test_zero_ascent_speed_breaks_the_ceiling() {
        let options = Options {
            ascent_speed_6m: 0.0,
            ..Options::default()
        };
        let profile = simple_dive(20.0, 10.0 * 60.0, Gas::AIR, &options).unwrap();
        assert!(profile.broken_ceiling);
        assert!(!profile.ends_on_surface());
        assert!(profile.events.contains(EventType::BrokenCeiling));
    }

    #[test]
    fn test_rounded_stops_are_whole_minutes() {
        let options = Options {
            round_stops_to_minutes: true,
            ..Options::new(0.3, 0.7)
        };
        let profile = simple_dive(40.0, 25.0 * 60.0, Gas::AIR, &options).unwrap();
        assert!(profile.no_deco_exceeded);
        for stop in profile.deco_stops() {
            assert_eq!(stop.duration % 60.0, 0.0, "{:?}", stop);
        }
    }

    #[test]
    fn test_emergency_ascent_starts_with_problem_solving() {
        let options = Options::default();
        let plan = Plan::simple(30.0, 20.0 * 60.0, 0, Gas::AIR, &options);
        let segments = emergency_ascent(&plan, &[Tank::air()], &options).unwrap();
        assert_eq!(segments[0].duration, options.problem_solving_duration);
        assert_eq!(segments[0].start_depth, 30.0);
        assert_eq!(segments.last().map(|segment| segment.end_depth), Some(0.0));
    }
}
