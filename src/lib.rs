#![no_std]

//! Decompression planning engine: Bühlmann ZHL-16C with gradient factors.
//!
//! A [`Plan`] of requested segments, the available [`Tank`]s and an
//! [`Options`] snapshot go in, a [`CalculatedProfile`] with the realized
//! segments, ceilings and events comes out. NDL tables, gas consumption
//! and gas blending are computed on top of it.

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod blender;
pub mod ceiling;
pub mod consumption;
pub mod error;
pub mod events;
pub mod gases;
pub mod m_value;
pub mod ndl;
pub mod options;
pub mod pressure;
pub mod profile;
pub mod segments;
pub mod simulate;
pub mod tanks;
pub mod tissue;
pub mod toxicity;
pub mod zh16c;

pub use blender::{GasBlender, MixRequest, MixResult, TankFill};
pub use ceiling::{Ceiling, GradientFactors};
pub use consumption::{Consumption, consumption, max_bottom_time, rock_bottom};
pub use error::PlanError;
pub use events::{Event, EventType, Events, Severity};
pub use gases::{Gas, GasLimits};
pub use ndl::{NdlLimit, ndl_table, no_deco_limit};
pub use options::{Options, SafetyStop, Units, UsageStrategy};
pub use pressure::{DepthConverter, Salinity};
pub use profile::CalculatedProfile;
pub use segments::{Plan, Segment, SegmentKind};
pub use simulate::{calculate, emergency_ascent, simple_dive};
pub use tanks::Tank;
pub use tissue::{Tissue, Tissues};
pub use toxicity::OxygenToxicity;
