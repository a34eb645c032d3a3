use alloc::vec::Vec;
use defmt::Format;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ceiling::GradientFactors;
use crate::error::PlanError;
use crate::gases::Gas;
use crate::options::{Options, Units};
use crate::tissue::{LoadSegment, Tissues};

/// Longest no decompression time reported, minutes.
pub const NDL_LIMIT: u32 = 1000;

const METRIC_DEPTHS: (f64, f64) = (12.0, 42.0); // m
const IMPERIAL_DEPTHS: (f64, f64) = (40.0, 140.0); // ft
const FOOT: f64 = 0.3048; // m

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Copy, Clone, PartialEq)]
pub struct NdlLimit {
    pub depth: f64, // m
    pub limit: u32, // min
}

/// Whole minutes at `depth` after the descent before a stop becomes
/// mandatory, starting from surface saturated tissues.
pub fn no_deco_limit(depth: f64, gas: &Gas, options: &Options) -> Result<u32, PlanError> {
    options.validate()?;
    gas.validate()?;
    if !(depth.is_finite() && depth >= 0.0) {
        return Err(PlanError::InvalidSegment {
            index: 0,
            reason: "depth must not be negative",
        });
    }

    let converter = options.depth_converter();
    let mut gf = GradientFactors::from_options(options);
    let mut tissues = Tissues::surface_equilibrium(converter.surface_pressure);
    let pressure = converter.to_bar(depth);

    tissues.load(
        &LoadSegment {
            start_pressure: converter.surface_pressure,
            end_pressure: pressure,
            duration: options.descent_duration(0.0, depth),
        },
        gas,
    );
    if gf.ceiling(&tissues, &converter) > 0.0 {
        return Ok(0);
    }

    let minute = LoadSegment::flat(pressure, 60.0);
    let mut bottom_time = 0;
    while bottom_time < NDL_LIMIT {
        tissues.load(&minute, gas);
        if gf.ceiling(&tissues, &converter) > 0.0 {
            break;
        }
        bottom_time += 1;
    }
    Ok(bottom_time)
}

/// No decompression limits for the recreational depth range, one entry per stop distance.
pub fn ndl_table(gas: &Gas, options: &Options) -> Result<Vec<NdlLimit>, PlanError> {
    let (first, last, unit) = match options.units {
        Units::Metric => (METRIC_DEPTHS.0, METRIC_DEPTHS.1, 1.0),
        Units::Imperial => (IMPERIAL_DEPTHS.0 * FOOT, IMPERIAL_DEPTHS.1 * FOOT, FOOT),
    };
    let step = options.stop_distance();
    let mut table = Vec::new();
    let mut depth = first;
    while depth <= last + 1e-6 {
        let limit = no_deco_limit(depth, gas, options)?;
        defmt::debug!("ndl at {} m: {} min", depth, limit);
        // imperial depths stay on whole feet
        let depth_value = libm::round(depth / unit) * unit;
        table.push(NdlLimit {
            depth: depth_value,
            limit,
        });
        depth += step;
    }
    Ok(table)
}
