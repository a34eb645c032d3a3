//! Partial pressure blending.
//!
//! The source tank is optionally bled first, then helium, oxygen and the
//! top mix are added. Gases are treated as ideal.

use defmt::Format;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::gases::Gas;

const TOLERANCE: f64 = 1e-6; // bar

/// Pressure and mix of a tank.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Copy, Clone, PartialEq)]
pub struct TankFill {
    pub pressure: f64, // bar
    pub gas: Gas,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Copy, Clone, PartialEq)]
pub struct MixRequest {
    pub source: TankFill,
    pub target: TankFill,
    pub top_mix: Gas,
}

/// Bar to bleed and to add. All zero when `unable_to_calculate` is set.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Copy, Clone, PartialEq, Default)]
pub struct MixResult {
    pub remove_from_source: f64,
    pub add_he: f64,
    pub add_o2: f64,
    pub add_top: f64,
    pub unable_to_calculate: bool,
}

impl MixResult {
    fn unable() -> Self {
        MixResult {
            unable_to_calculate: true,
            ..MixResult::default()
        }
    }
}

/// Amounts added for a given bled source, plus the nitrogen mismatch left
/// when the top mix carries no nitrogen.
#[derive(Debug, Clone, Copy)]
struct Amounts {
    he: f64,
    o2: f64,
    top: f64,
    n2_mismatch: f64,
}

impl Amounts {
    fn feasible(&self) -> bool {
        [self.he, self.o2, self.top].iter().all(|value| *value >= -TOLERANCE) && near_zero(self.n2_mismatch)
    }
}

fn near_zero(value: f64) -> bool {
    (-TOLERANCE..=TOLERANCE).contains(&value)
}

pub struct GasBlender;

impl GasBlender {
    /// Finds the least bleeding of the source tank which lets the target
    /// be reached by adding helium, oxygen and top mix only.
    pub fn mix(request: &MixRequest) -> Result<MixResult, PlanError> {
        request.source.gas.validate()?;
        request.target.gas.validate()?;
        request.top_mix.validate()?;
        for pressure in [request.source.pressure, request.target.pressure] {
            if !(pressure.is_finite() && pressure >= 0.0) {
                return Err(PlanError::InvalidOption("pressure"));
            }
        }

        let available = request.source.pressure;
        let at_start = amounts(request, 0.0);
        let at_empty = amounts(request, available);

        // every amount is linear in the bled pressure, try where each crosses zero
        let mut candidates = [0.0; 5];
        let starts = [at_start.he, at_start.o2, at_start.top, at_start.n2_mismatch];
        let ends = [at_empty.he, at_empty.o2, at_empty.top, at_empty.n2_mismatch];
        for (index, (start, end)) in starts.iter().zip(ends.iter()).enumerate() {
            candidates[index + 1] = if near_zero(start - end) {
                0.0
            } else {
                (available * start / (start - end)).clamp(0.0, available)
            };
        }
        candidates.sort_by(|a, b| a.total_cmp(b));

        for removed in candidates {
            let solution = amounts(request, removed);
            if solution.feasible() {
                return Ok(MixResult {
                    remove_from_source: removed,
                    add_he: solution.he.max(0.0),
                    add_o2: solution.o2.max(0.0),
                    add_top: solution.top.max(0.0),
                    unable_to_calculate: false,
                });
            }
        }
        defmt::debug!("blend not reachable");
        Ok(MixResult::unable())
    }
}

fn amounts(request: &MixRequest, removed: f64) -> Amounts {
    let remaining = request.source.pressure - removed;
    let source = request.source.gas;
    let target = request.target.gas;
    let top_mix = request.top_mix;
    let total = request.target.pressure;

    let missing_n2 = total * target.n2() - remaining * source.n2();
    let (top, n2_mismatch) = if top_mix.n2() > TOLERANCE {
        (missing_n2 / top_mix.n2(), 0.0)
    } else {
        (0.0, missing_n2)
    };
    Amounts {
        he: total * target.he - remaining * source.he - top * top_mix.he,
        o2: total * target.o2 - remaining * source.o2 - top * top_mix.o2,
        top,
        n2_mismatch,
    }
}
