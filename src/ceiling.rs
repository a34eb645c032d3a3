use defmt::Format;
use libm::{ceil, fabs};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::m_value::tolerated_pressure;
use crate::options::Options;
use crate::pressure::DepthConverter;
use crate::tissue::Tissues;

const MAX_REFINEMENTS: usize = 20;
const CONVERGENCE: f64 = 1e-4; // m

/// Required minimum depth at a point in time of the dive.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Copy, Clone, PartialEq)]
pub struct Ceiling {
    pub time: f64,  // s since dive start
    pub depth: f64, // m
}

/// Highest tolerated ambient pressure across all compartments under a fixed
/// gradient factor, with the index of the leading compartment.
#[inline(never)]
pub fn max_tolerated_pressure(tissues: &Tissues, gf: f64) -> (f64, usize) {
    let mut max_pressure = f64::MIN;
    let mut leading = 0;
    for (index, (compartment, tissue)) in tissues.iter().enumerate() {
        let tolerated = tolerated_pressure(compartment, tissue, gf);
        if tolerated > max_pressure {
            max_pressure = tolerated;
            leading = index;
        }
    }
    (max_pressure, leading)
}

/// Ceiling depth under a fixed gradient factor, never shallower than the surface.
pub fn max_ceiling(tissues: &Tissues, gf: f64, converter: &DepthConverter) -> (f64, usize) {
    let (pressure, leading) = max_tolerated_pressure(tissues, gf);
    (converter.from_bar(pressure).max(0.0), leading)
}

/// Rounds a ceiling up to the next stop of the `stop_distance` grid.
pub fn round_to_stop(depth: f64, stop_distance: f64) -> f64 {
    if depth <= 0.0 {
        return 0.0;
    }
    // ceilings sitting on a stop within float noise stay on it
    ceil(depth / stop_distance - 1e-9) * stop_distance
}

/// Gradient factor pair interpolated between the deepest required stop
/// (`low`) and the surface (`high`).
///
/// The first stop anchor is bootstrapped from a pass at `low` and only ever
/// moves deeper during one dive, so the interpolation stays stable while
/// the diver ascends.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Copy, Clone, PartialEq)]
pub struct GradientFactors {
    pub low: f64,
    pub high: f64,
    first_stop: f64,
}

impl GradientFactors {
    pub fn new(low: f64, high: f64) -> Self {
        GradientFactors {
            low,
            high,
            first_stop: 0.0,
        }
    }

    pub fn from_options(options: &Options) -> Self {
        Self::new(options.gf_low, options.gf_high)
    }

    /// Depth where `low` applies, 0 until a ceiling was first required.
    pub fn first_stop(&self) -> f64 {
        self.first_stop
    }

    /// Effective gradient factor at `depth`.
    pub fn at_depth(&self, depth: f64) -> f64 {
        if self.first_stop <= 0.0 {
            self.high
        } else if depth >= self.first_stop {
            self.low
        } else {
            self.high - (self.high - self.low) * depth / self.first_stop
        }
    }

    /// Ceiling depth for the current tissue state.
    ///
    /// Pass one bounds the first stop with `low`, pass two walks the
    /// fixed point `depth = ceiling(gf(depth))` up from the `high` ceiling.
    /// The walk is monotone and bounded by the pass one ceiling.
    pub fn ceiling(&mut self, tissues: &Tissues, converter: &DepthConverter) -> f64 {
        let (surface_ceiling, _) = max_ceiling(tissues, self.high, converter);
        if surface_ceiling <= 0.0 {
            return 0.0;
        }

        let (deepest, _) = max_ceiling(tissues, self.low, converter);
        self.first_stop = self.first_stop.max(deepest);

        let mut depth = surface_ceiling;
        for _ in 0..MAX_REFINEMENTS {
            let (next, _) = max_ceiling(tissues, self.at_depth(depth), converter);
            let delta = fabs(next - depth);
            depth = next;
            if delta < CONVERGENCE {
                break;
            }
        }
        depth.max(0.0)
    }

    /// Same as [`GradientFactors::ceiling`] rounded up to the stop grid.
    pub fn ceiling_stop(&mut self, tissues: &Tissues, converter: &DepthConverter, stop_distance: f64) -> f64 {
        round_to_stop(self.ceiling(tissues, converter), stop_distance)
    }
}
