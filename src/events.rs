//! Rule violations and notable moments of a computed profile.
//!
//! Events never stop a computation. The scheduler threads one [`Events`]
//! accumulator through the ascent and [`analyze`] appends the violations
//! found on the realized segments.

use alloc::vec::Vec;
use defmt::Format;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ceiling::Ceiling;
use crate::gases::{Gas, MIN_PPO2};
use crate::options::Options;
use crate::segments::Segment;

const SPEED_TOLERANCE: f64 = 1e-3; // m/min
const CEILING_TOLERANCE: f64 = 0.1; // m
const LIMIT_TOLERANCE: f64 = 1e-9;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Copy, Clone, PartialEq, Eq)]
pub enum EventType {
    LowPpO2,
    HighPpO2,
    HighAscentSpeed,
    HighDescentSpeed,
    BrokenCeiling,
    SwitchToHigherN2,
    MaxEndExceeded,
    HighGasDensity,
    GasSwitch,
    NotEnoughGas,
}

impl EventType {
    pub fn severity(self) -> Severity {
        match self {
            EventType::GasSwitch => Severity::Info,
            EventType::HighAscentSpeed
            | EventType::HighDescentSpeed
            | EventType::SwitchToHigherN2
            | EventType::MaxEndExceeded
            | EventType::HighGasDensity => Severity::Warning,
            EventType::LowPpO2 | EventType::HighPpO2 | EventType::BrokenCeiling | EventType::NotEnoughGas => {
                Severity::Error
            }
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Copy, Clone, PartialEq)]
pub struct Event {
    pub event_type: EventType,
    pub time: f64,  // s since dive start
    pub depth: f64, // m
    pub gas: Option<Gas>,
    /// Index of the realized segment the event belongs to.
    pub segment: Option<usize>,
    pub severity: Severity,
}

/// Append-only event list.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Clone, PartialEq, Default)]
pub struct Events {
    items: Vec<Event>,
}

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, event_type: EventType, time: f64, depth: f64, gas: Option<Gas>, segment: Option<usize>) {
        self.items.push(Event {
            event_type,
            time,
            depth,
            gas,
            segment,
            severity: event_type.severity(),
        });
    }

    pub fn items(&self) -> &[Event] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, event_type: EventType) -> bool {
        self.items.iter().any(|event| event.event_type == event_type)
    }

    pub fn count(&self, event_type: EventType) -> usize {
        self.items.iter().filter(|event| event.event_type == event_type).count()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|event| event.severity == Severity::Error)
    }

    /// Orders events by time, keeping insertion order for equal times.
    pub fn sort(&mut self) {
        self.items.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    pub fn into_vec(self) -> Vec<Event> {
        self.items
    }
}

/// Records a condition once when it starts and rearms when it clears.
#[derive(Default)]
struct Latch(bool);

impl Latch {
    fn rises(&mut self, active: bool) -> bool {
        let rising = active && !self.0;
        self.0 = active;
        rising
    }
}

#[derive(Default)]
struct Latches {
    low_ppo2: Latch,
    high_ppo2: Latch,
    ascent_speed: Latch,
    descent_speed: Latch,
    max_end: Latch,
    density: Latch,
    broken_ceiling: Latch,
}

/// Walks the realized segments and records every rule violation.
///
/// ppO2 is checked against the bottom limit until `ascent_start` and
/// against the deco limit afterwards.
pub fn analyze(segments: &[Segment], ceilings: &[Ceiling], options: &Options, ascent_start: f64, events: &mut Events) {
    let converter = options.depth_converter();
    let max_depth = segments.iter().map(Segment::max_depth).fold(0.0, f64::max);
    let mut latches = Latches::default();
    let mut time = 0.0;
    let mut previous_gas: Option<Gas> = None;

    for (index, segment) in segments.iter().enumerate() {
        let deepest = segment.max_depth();
        let shallowest = segment.start_depth.min(segment.end_depth);
        let gas = segment.gas;
        let segment_ref = Some(index);

        if let Some(previous) = previous_gas {
            if previous != gas {
                events.add(EventType::GasSwitch, time, segment.start_depth, Some(gas), segment_ref);
                if gas.n2() > previous.n2() + LIMIT_TOLERANCE {
                    events.add(EventType::SwitchToHigherN2, time, segment.start_depth, Some(gas), segment_ref);
                }
            }
        }
        previous_gas = Some(gas);

        let speed = segment.speed();
        let too_fast_up = segment.is_ascent()
            && -speed > options.ascent_speed(segment.start_depth, max_depth) + SPEED_TOLERANCE;
        if latches.ascent_speed.rises(too_fast_up) {
            events.add(EventType::HighAscentSpeed, time, segment.start_depth, Some(gas), segment_ref);
        }
        let too_fast_down = segment.is_descent() && speed > options.descent_speed + SPEED_TOLERANCE;
        if latches.descent_speed.rises(too_fast_down) {
            events.add(EventType::HighDescentSpeed, time, segment.start_depth, Some(gas), segment_ref);
        }

        let max_ppo2 = if time + segment.duration > ascent_start + LIMIT_TOLERANCE {
            options.max_deco_ppo2
        } else {
            options.max_ppo2
        };
        let high_ppo2 = gas.ppo2(deepest, &converter) > max_ppo2 + LIMIT_TOLERANCE;
        if latches.high_ppo2.rises(high_ppo2) {
            events.add(EventType::HighPpO2, time, deepest, Some(gas), segment_ref);
        }
        let low_ppo2 = gas.ppo2(shallowest, &converter) < MIN_PPO2 - LIMIT_TOLERANCE;
        if latches.low_ppo2.rises(low_ppo2) {
            events.add(EventType::LowPpO2, time, shallowest, Some(gas), segment_ref);
        }

        let end = gas.end(deepest, options.oxygen_narcotic, &converter);
        if latches.max_end.rises(end > options.max_end + LIMIT_TOLERANCE) {
            events.add(EventType::MaxEndExceeded, time, deepest, Some(gas), segment_ref);
        }
        let dense = gas.density(deepest, &converter) > options.max_density + LIMIT_TOLERANCE;
        if latches.density.rises(dense) {
            events.add(EventType::HighGasDensity, time, deepest, Some(gas), segment_ref);
        }

        time += segment.duration;
    }

    check_ceilings(segments, ceilings, &mut latches.broken_ceiling, events);
    events.sort();
}

fn check_ceilings(segments: &[Segment], ceilings: &[Ceiling], latch: &mut Latch, events: &mut Events) {
    let mut index = 0;
    let mut segment_start = 0.0;
    for ceiling in ceilings {
        while index < segments.len() && segment_start + segments[index].duration < ceiling.time - LIMIT_TOLERANCE {
            segment_start += segments[index].duration;
            index += 1;
        }
        let Some(segment) = segments.get(index) else {
            break;
        };
        let depth = segment.depth_at(ceiling.time - segment_start);
        if latch.rises(depth < ceiling.depth - CEILING_TOLERANCE) {
            events.add(EventType::BrokenCeiling, ceiling.time, depth, Some(segment.gas), Some(index));
        }
    }
}
