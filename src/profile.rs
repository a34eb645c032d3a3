use alloc::vec::Vec;
use defmt::Format;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ceiling::Ceiling;
use crate::events::Events;
use crate::segments::{Segment, SegmentKind};
use crate::tissue::Tissues;
use crate::toxicity::OxygenToxicity;

/// Result of one profile computation. Never mutated after it is returned,
/// the next computation produces a new one.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Clone, PartialEq)]
pub struct CalculatedProfile {
    /// Realized plan followed by the computed ascent.
    pub segments: Vec<Segment>,
    pub ceilings: Vec<Ceiling>,
    pub events: Events,
    /// At least one mandatory decompression stop was needed.
    pub no_deco_exceeded: bool,
    /// The profile was cut where the gas ran out.
    pub not_enough_gas: bool,
    /// The requested duration does not cover the descent.
    pub not_enough_time: bool,
    /// The diver was above the ceiling or the ascent could not be scheduled.
    pub broken_ceiling: bool,
    /// Tissue state at the end of the last segment.
    pub tissues: Tissues,
    pub oxygen_toxicity: OxygenToxicity,
    /// Seconds from the dive start to the begin of the ascent.
    pub ascent_start: f64,
}

impl CalculatedProfile {
    pub fn max_depth(&self) -> f64 {
        self.segments.iter().map(Segment::max_depth).fold(0.0, f64::max)
    }

    /// Time weighted average depth.
    pub fn average_depth(&self) -> f64 {
        let duration = self.total_duration();
        if duration <= 0.0 {
            return 0.0;
        }
        let weighted: f64 = self
            .segments
            .iter()
            .map(|segment| segment.average_depth() * segment.duration)
            .sum();
        weighted / duration
    }

    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|segment| segment.duration).sum()
    }

    /// Seconds from the begin of the ascent to the surface.
    pub fn time_to_surface(&self) -> f64 {
        (self.total_duration() - self.ascent_start).max(0.0)
    }

    pub fn end_depth(&self) -> f64 {
        self.segments.last().map(|segment| segment.end_depth).unwrap_or(0.0)
    }

    pub fn ends_on_surface(&self) -> bool {
        self.end_depth() <= 0.0
    }

    pub fn stops(&self) -> impl Iterator<Item = &Segment> {
        self.segments
            .iter()
            .filter(|segment| matches!(segment.kind, SegmentKind::DecoStop | SegmentKind::SafetyStop))
    }

    pub fn deco_stops(&self) -> impl Iterator<Item = &Segment> {
        self.segments
            .iter()
            .filter(|segment| segment.kind == SegmentKind::DecoStop)
    }

    /// Deepest ceiling reached during the dive.
    pub fn max_ceiling(&self) -> f64 {
        self.ceilings.iter().map(|ceiling| ceiling.depth).fold(0.0, f64::max)
    }
}
