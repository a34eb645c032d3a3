use defmt::Format;
use thiserror::Error;

/// Invalid call shapes rejected before any computation starts.
///
/// Expected domain conditions (not enough gas, broken ceiling, unreachable
/// blend) are never reported through this type; they end up as flags and
/// events on the computed results.
#[derive(Error, Debug, Format, Clone, Copy, PartialEq)]
pub enum PlanError {
    #[error("gas fractions out of range: o2 {o2}, he {he}")]
    InvalidGas { o2: f64, he: f64 },

    #[error("unknown gas name")]
    UnknownGasName,

    #[error("tank {index} is invalid: {reason}")]
    InvalidTank { index: usize, reason: &'static str },

    #[error("tank index {0} is out of range")]
    UnknownTank(usize),

    #[error("segment {index} is invalid: {reason}")]
    InvalidSegment { index: usize, reason: &'static str },

    #[error("segment {0} does not start where the previous one ends")]
    DisconnectedSegments(usize),

    #[error("plan has no segments")]
    EmptyPlan,

    #[error("invalid option: {0}")]
    InvalidOption(&'static str),
}
