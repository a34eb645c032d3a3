//! Bühlmann ZHL-16C compartment constants (Bühlmann / Baker).

use defmt::Format;

/// Number of tissue compartments.
pub const COMPARTMENTS_COUNT: usize = 16;

/// Immutable physiological constants of one tissue compartment.
#[derive(Debug, Format, Copy, Clone, PartialEq)]
pub struct Compartment {
    /// N2 half-time in minutes
    pub n2_half_time: f64,
    /// N2 'a' coefficient in bar
    pub n2_a: f64,
    /// N2 'b' coefficient
    pub n2_b: f64,
    /// He half-time in minutes
    pub he_half_time: f64,
    /// He 'a' coefficient in bar
    pub he_a: f64,
    /// He 'b' coefficient
    pub he_b: f64,
}

impl Compartment {
    const fn new(n2_half_time: f64, n2_a: f64, n2_b: f64, he_half_time: f64, he_a: f64, he_b: f64) -> Self {
        Compartment {
            n2_half_time,
            n2_a,
            n2_b,
            he_half_time,
            he_a,
            he_b,
        }
    }
}

/// ZHL-16C table, shared read-only by every computation.
pub static COMPARTMENTS: [Compartment; COMPARTMENTS_COUNT] = [
    Compartment::new(5.0, 1.1696, 0.5578, 1.88, 1.6189, 0.4770),
    Compartment::new(8.0, 1.0000, 0.6514, 3.02, 1.3830, 0.5747),
    Compartment::new(12.5, 0.8618, 0.7222, 4.72, 1.1919, 0.6527),
    Compartment::new(18.5, 0.7562, 0.7825, 6.99, 1.0458, 0.7223),
    Compartment::new(27.0, 0.6200, 0.8126, 10.21, 0.9220, 0.7582),
    Compartment::new(38.3, 0.5043, 0.8434, 14.48, 0.8205, 0.7957),
    Compartment::new(54.3, 0.4410, 0.8693, 20.53, 0.7305, 0.8279),
    Compartment::new(77.0, 0.4000, 0.8910, 29.11, 0.6502, 0.8553),
    Compartment::new(109.0, 0.3750, 0.9092, 41.20, 0.5950, 0.8757),
    Compartment::new(146.0, 0.3500, 0.9222, 55.19, 0.5545, 0.8903),
    Compartment::new(187.0, 0.3295, 0.9319, 70.69, 0.5333, 0.8997),
    Compartment::new(239.0, 0.3065, 0.9403, 90.34, 0.5189, 0.9073),
    Compartment::new(305.0, 0.2835, 0.9477, 115.29, 0.5181, 0.9122),
    Compartment::new(390.0, 0.2610, 0.9544, 147.42, 0.5176, 0.9171),
    Compartment::new(498.0, 0.2480, 0.9602, 188.24, 0.5172, 0.9217),
    Compartment::new(635.0, 0.2327, 0.9653, 240.03, 0.5119, 0.9267),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_times_are_increasing() {
        for pair in COMPARTMENTS.windows(2) {
            assert!(pair[0].n2_half_time < pair[1].n2_half_time);
            assert!(pair[0].he_half_time < pair[1].he_half_time);
        }
    }
}
