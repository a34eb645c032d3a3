//! Dive shape as a chain of linear depth-time segments.

use alloc::vec::Vec;
use defmt::Format;
use libm::fabs;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::gases::Gas;
use crate::options::Options;

/// Depth difference still considered the same depth, m.
pub const DEPTH_TOLERANCE: f64 = 1e-6;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Copy, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    Descent,
    Level,
    Ascent,
    DecoStop,
    SafetyStop,
    GasSwitch,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Copy, Clone, PartialEq)]
pub struct Segment {
    pub start_depth: f64, // m
    pub end_depth: f64,   // m
    pub duration: f64,    // s
    pub gas: Gas,
    /// Index into the tanks the profile was computed with.
    pub tank: Option<usize>,
    pub kind: SegmentKind,
}

impl Segment {
    pub fn new(start_depth: f64, end_depth: f64, duration: f64, gas: Gas, tank: Option<usize>) -> Self {
        let kind = if end_depth > start_depth + DEPTH_TOLERANCE {
            SegmentKind::Descent
        } else if end_depth < start_depth - DEPTH_TOLERANCE {
            SegmentKind::Ascent
        } else {
            SegmentKind::Level
        };
        Segment {
            start_depth,
            end_depth,
            duration,
            gas,
            tank,
            kind,
        }
    }

    pub fn level(depth: f64, duration: f64, gas: Gas, tank: Option<usize>) -> Self {
        Self::new(depth, depth, duration, gas, tank)
    }

    pub fn with_kind(self, kind: SegmentKind) -> Self {
        Segment { kind, ..self }
    }

    /// Vertical speed in m/min, positive while descending.
    pub fn speed(&self) -> f64 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        (self.end_depth - self.start_depth) / self.duration * 60.0
    }

    pub fn average_depth(&self) -> f64 {
        (self.start_depth + self.end_depth) / 2.0
    }

    pub fn max_depth(&self) -> f64 {
        self.start_depth.max(self.end_depth)
    }

    /// Depth `offset` seconds after the segment start.
    pub fn depth_at(&self, offset: f64) -> f64 {
        if self.duration <= 0.0 {
            return self.end_depth;
        }
        let fraction = (offset / self.duration).clamp(0.0, 1.0);
        self.start_depth + (self.end_depth - self.start_depth) * fraction
    }

    pub fn is_descent(&self) -> bool {
        self.end_depth > self.start_depth + DEPTH_TOLERANCE
    }

    pub fn is_ascent(&self) -> bool {
        self.end_depth < self.start_depth - DEPTH_TOLERANCE
    }

    pub fn is_flat(&self) -> bool {
        !self.is_descent() && !self.is_ascent()
    }

    fn validate(&self, index: usize, tanks: usize) -> Result<(), PlanError> {
        let invalid = |reason| Err(PlanError::InvalidSegment { index, reason });
        if !(self.start_depth.is_finite() && self.end_depth.is_finite()) {
            return invalid("depth must be finite");
        }
        if self.start_depth < 0.0 || self.end_depth < 0.0 {
            return invalid("depth must not be negative");
        }
        if !(self.duration.is_finite() && self.duration >= 0.0) {
            return invalid("duration must not be negative");
        }
        if let Some(tank) = self.tank {
            if tank >= tanks {
                return Err(PlanError::UnknownTank(tank));
            }
        }
        self.gas.validate()
    }
}

/// Segments requested by the diver, without the ascent.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Clone, PartialEq, Default)]
pub struct Plan {
    pub segments: Vec<Segment>,
    /// Descent alone does not fit into the requested duration.
    pub not_enough_time: bool,
}

impl Plan {
    pub fn new(segments: Vec<Segment>) -> Self {
        Plan {
            segments,
            not_enough_time: false,
        }
    }

    /// Descent to `depth` and a level there. `duration` is the whole time
    /// at depth including the descent, in seconds.
    pub fn simple(depth: f64, duration: f64, tank: usize, gas: Gas, options: &Options) -> Self {
        let descent = options.descent_duration(0.0, depth);
        let mut segments = Vec::with_capacity(2);
        segments.push(Segment::new(0.0, depth, descent, gas, Some(tank)));
        let not_enough_time = descent > duration;
        if !not_enough_time && duration > descent {
            segments.push(Segment::level(depth, duration - descent, gas, Some(tank)));
        }
        Plan {
            segments,
            not_enough_time,
        }
    }

    /// Moves to `depth` at the configured speed and stays there for `duration`
    /// seconds. The travel is not counted into `duration`.
    pub fn add_level(&mut self, depth: f64, duration: f64, tank: usize, gas: Gas, options: &Options) {
        let from = self.end_depth();
        if fabs(depth - from) > DEPTH_TOLERANCE {
            let travel = if depth > from {
                options.descent_duration(from, depth)
            } else {
                options.ascent_duration(from, depth, self.max_depth().max(depth))
            };
            self.segments.push(Segment::new(from, depth, travel, gas, Some(tank)));
        }
        if duration > 0.0 {
            self.segments.push(Segment::level(depth, duration, gas, Some(tank)));
        }
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn end_depth(&self) -> f64 {
        self.segments.last().map(|segment| segment.end_depth).unwrap_or(0.0)
    }

    pub fn max_depth(&self) -> f64 {
        self.segments.iter().map(Segment::max_depth).fold(0.0, f64::max)
    }

    pub fn duration(&self) -> f64 {
        self.segments.iter().map(|segment| segment.duration).sum()
    }

    /// Checks the plan shape against `tanks` available tanks.
    pub fn validate(&self, tanks: usize) -> Result<(), PlanError> {
        let first = self.segments.first().ok_or(PlanError::EmptyPlan)?;
        if fabs(first.start_depth) > DEPTH_TOLERANCE {
            return Err(PlanError::InvalidSegment {
                index: 0,
                reason: "plan must start at the surface",
            });
        }
        for (index, segment) in self.segments.iter().enumerate() {
            segment.validate(index, tanks)?;
        }
        for (index, pair) in self.segments.windows(2).enumerate() {
            if fabs(pair[0].end_depth - pair[1].start_depth) > DEPTH_TOLERANCE {
                return Err(PlanError::DisconnectedSegments(index + 1));
            }
        }
        Ok(())
    }
}
