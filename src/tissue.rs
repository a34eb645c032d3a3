use defmt::Format;
use libm::{exp, log};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::gases::{AIR_O2, Gas};
use crate::pressure::WATER_VAPOR_PRESSURE;
use crate::zh16c::{COMPARTMENTS, COMPARTMENTS_COUNT, Compartment};

/// Inert gas partial pressures (bar) of one compartment.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Default, Clone, Copy, Debug, Format, PartialEq)]
pub struct Tissue {
    pub load_n2: f64,
    pub load_he: f64,
}

impl Tissue {
    pub fn total(&self) -> f64 {
        self.load_n2 + self.load_he
    }
}

/// Linear change of ambient pressure over time, the unit of tissue loading.
#[derive(Clone, Copy, Debug, Format, PartialEq)]
pub struct LoadSegment {
    /// ambient pressure at the segment start in bar
    pub start_pressure: f64,
    /// ambient pressure at the segment end in bar
    pub end_pressure: f64,
    pub duration: f64, // s
}

impl LoadSegment {
    pub fn flat(pressure: f64, duration: f64) -> Self {
        LoadSegment {
            start_pressure: pressure,
            end_pressure: pressure,
            duration,
        }
    }

    /// Pressure change rate in bar/min.
    pub fn rate(&self) -> f64 {
        (self.end_pressure - self.start_pressure) / (self.duration / 60.0)
    }
}

// pt(t) = palv0 + R(t - 1/k) - [palv0 - pt0 - R/k] * e^(-kt)
// pt(t) -> partial pressure of the gas in the tissue at time t
// pt0 -> initial partial pressure of the gas in the tissue at t=0
// palv0 -> initial alveolar partial pressure of the gas in the mix at t=0
// k -> tissue time constant, ln2 / half time
// R -> rate of change of the inert gas partial pressure in the alveoli (bar/min)
//      R = Q * Ramb in which Q is the fraction of the inert gas and Ramb is the rate of change of the ambient pressure
// t -> time in minutes
pub fn schreiner(tissue_pressure: f64, alveolar_pressure: f64, rate: f64, half_time: f64, minutes: f64) -> f64 {
    let k = log(2.0) / half_time;
    alveolar_pressure + rate * (minutes - 1.0 / k)
        - (alveolar_pressure - tissue_pressure - rate / k) * exp(-k * minutes)
}

/// Loads one compartment with both inert gases over `segment`.
pub fn calculate_tissue(tissue: Tissue, compartment: &Compartment, segment: &LoadSegment, gas: &Gas) -> Tissue {
    if segment.duration <= 0.0 {
        return tissue;
    }

    let minutes = segment.duration / 60.0;
    let alveolar = (segment.start_pressure - WATER_VAPOR_PRESSURE).max(0.0);
    let rate = segment.rate();

    let n2 = gas.n2();
    let he = gas.he;

    Tissue {
        load_n2: schreiner(tissue.load_n2, alveolar * n2, rate * n2, compartment.n2_half_time, minutes),
        load_he: schreiner(tissue.load_he, alveolar * he, rate * he, compartment.he_half_time, minutes),
    }
}

/// Saturation state of all compartments during one dive.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Format, PartialEq)]
pub struct Tissues {
    compartments: [Tissue; COMPARTMENTS_COUNT],
}

impl Tissues {
    /// Diver breathing air at the surface long enough to be fully saturated.
    pub fn surface_equilibrium(surface_pressure: f64) -> Self {
        let load_n2 = (surface_pressure - WATER_VAPOR_PRESSURE) * (1.0 - AIR_O2);
        Tissues {
            compartments: [Tissue { load_n2, load_he: 0.0 }; COMPARTMENTS_COUNT],
        }
    }

    pub fn from_compartments(compartments: [Tissue; COMPARTMENTS_COUNT]) -> Self {
        Tissues { compartments }
    }

    pub fn compartments(&self) -> &[Tissue; COMPARTMENTS_COUNT] {
        &self.compartments
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Compartment, &Tissue)> {
        COMPARTMENTS.iter().zip(self.compartments.iter())
    }

    /// Integrates the segment into every compartment, in compartment order.
    pub fn load(&mut self, segment: &LoadSegment, gas: &Gas) {
        for (tissue, compartment) in self.compartments.iter_mut().zip(COMPARTMENTS.iter()) {
            *tissue = calculate_tissue(*tissue, compartment, segment, gas);
        }
    }

    /// Pure variant of [`Tissues::load`].
    pub fn loaded(&self, segment: &LoadSegment, gas: &Gas) -> Tissues {
        let mut next = *self;
        next.load(segment, gas);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_tissue_no_change() {
        let tissue = Tissue {
            load_n2: 2.4,
            load_he: 0.6,
        };
        let segment = LoadSegment::flat(4.0, 0.0);
        let result = calculate_tissue(tissue, &COMPARTMENTS[0], &segment, &Gas::new(0.18, 0.45));
        assert_eq!(result, tissue);
    }

    #[test]
    fn test_ongassing_at_depth() {
        let tissue = Tissue {
            load_n2: 0.75,
            load_he: 0.0,
        };
        let segment = LoadSegment::flat(4.0, 60.0);
        let result = calculate_tissue(tissue, &COMPARTMENTS[0], &segment, &Gas::AIR);
        assert!(result.load_n2 > tissue.load_n2);
        assert_eq!(result.load_he, 0.0);
    }

    #[test]
    fn test_half_time_halves_the_gradient() {
        let tissue = Tissue::default();
        let compartment = &COMPARTMENTS[0];
        let pressure = 2.0;
        let segment = LoadSegment::flat(pressure, compartment.n2_half_time * 60.0);
        let result = calculate_tissue(tissue, compartment, &segment, &Gas::AIR);
        let inspired = (pressure - WATER_VAPOR_PRESSURE) * Gas::AIR.n2();
        assert!((result.load_n2 - inspired / 2.0).abs() < 1e-9);
    }
}
