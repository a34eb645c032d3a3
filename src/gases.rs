//! Gas mix arithmetic: partial pressures, depth limits and gas selection.

use core::fmt;
use core::str::FromStr;

use defmt::Format;
use libm::{fabs, round};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::pressure::{DepthConverter, STANDARD_PRESSURE};

/// Lowest ppO2 still able to sustain consciousness.
pub const MIN_PPO2: f64 = 0.18;

/// Oxygen fraction of air.
pub const AIR_O2: f64 = 0.209;

// densities in g/l at 1 atm
const O2_DENSITY: f64 = 1.429;
const N2_DENSITY: f64 = 1.2506;
const HE_DENSITY: f64 = 0.1786;

const TOLERANCE: f64 = 1e-9;

/// Partial pressure in bar of a gas fraction at `depth`.
pub fn partial_pressure(fraction: f64, depth: f64, converter: &DepthConverter) -> f64 {
    fraction * converter.to_bar(depth)
}

/// Maximum operating depth of an oxygen fraction for the given ppO2 limit.
pub fn mod_depth(max_ppo2: f64, o2: f64, converter: &DepthConverter) -> f64 {
    if o2 <= 0.0 {
        return f64::INFINITY;
    }
    converter.from_bar(max_ppo2 / o2).max(0.0)
}

/// Richest oxygen fraction breathable at `depth`.
pub fn best_mix(max_ppo2: f64, depth: f64, converter: &DepthConverter) -> f64 {
    (max_ppo2 / converter.to_bar(depth)).min(1.0)
}

/// Trimix with the richest oxygen and the least helium keeping the END
/// at or above `max_end`.
pub fn best_trimix(max_ppo2: f64, depth: f64, max_end: f64, oxygen_narcotic: bool, converter: &DepthConverter) -> Gas {
    let o2 = best_mix(max_ppo2, depth, converter);
    let air = Gas::AIR.narcotic_fraction(oxygen_narcotic);
    let narcotic = air * converter.to_bar(max_end) / converter.to_bar(depth);
    let allowed_n2 = if oxygen_narcotic { narcotic - o2 } else { narcotic };
    let he = (1.0 - o2 - allowed_n2.max(0.0)).max(0.0);
    Gas::new(o2, he.min(1.0 - o2))
}

/// Limits a gas must satisfy to be breathed at a given depth.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Copy, Clone, PartialEq)]
pub struct GasLimits {
    pub max_ppo2: f64,
    pub max_end: f64,
    pub oxygen_narcotic: bool,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Format, Copy, Clone, PartialEq)]
pub struct Gas {
    pub o2: f64,
    pub he: f64,
}

impl Gas {
    pub const AIR: Gas = Gas::new(AIR_O2, 0.0);
    pub const OXYGEN: Gas = Gas::new(1.0, 0.0);

    pub const fn new(o2: f64, he: f64) -> Self {
        Gas { o2, he }
    }

    pub fn nitrox(o2: f64) -> Self {
        Gas::new(o2, 0.0)
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        let in_range = |fraction: f64| fraction.is_finite() && (0.0..=1.0).contains(&fraction);
        if in_range(self.o2) && in_range(self.he) && self.o2 + self.he <= 1.0 + TOLERANCE {
            Ok(())
        } else {
            Err(PlanError::InvalidGas {
                o2: self.o2,
                he: self.he,
            })
        }
    }

    pub fn n2(&self) -> f64 {
        (1.0 - self.o2 - self.he).max(0.0)
    }

    /// Fraction which counts as narcotic.
    pub fn narcotic_fraction(&self, oxygen_narcotic: bool) -> f64 {
        if oxygen_narcotic {
            self.n2() + self.o2
        } else {
            self.n2()
        }
    }

    pub fn ppo2(&self, depth: f64, converter: &DepthConverter) -> f64 {
        partial_pressure(self.o2, depth, converter)
    }

    /// Maximum operating depth.
    pub fn mod_depth(&self, max_ppo2: f64, converter: &DepthConverter) -> f64 {
        mod_depth(max_ppo2, self.o2, converter)
    }

    /// Shallowest depth where the mix still delivers [`MIN_PPO2`].
    pub fn ceiling(&self, converter: &DepthConverter) -> f64 {
        if self.o2 <= 0.0 {
            return f64::INFINITY;
        }
        converter.from_bar(MIN_PPO2 / self.o2).max(0.0)
    }

    /// Equivalent narcotic depth at `depth`.
    pub fn end(&self, depth: f64, oxygen_narcotic: bool, converter: &DepthConverter) -> f64 {
        let air = Gas::AIR.narcotic_fraction(oxygen_narcotic);
        let narcotic = self.narcotic_fraction(oxygen_narcotic) * converter.to_bar(depth);
        converter.from_bar(narcotic / air).max(0.0)
    }

    /// Maximum narcotic depth for the given END limit.
    pub fn mnd(&self, max_end: f64, oxygen_narcotic: bool, converter: &DepthConverter) -> f64 {
        let narcotic = self.narcotic_fraction(oxygen_narcotic);
        if narcotic <= 0.0 {
            return f64::INFINITY;
        }
        let air = Gas::AIR.narcotic_fraction(oxygen_narcotic);
        converter.from_bar(converter.to_bar(max_end) * air / narcotic).max(0.0)
    }

    /// Gas density in g/l at `depth`.
    pub fn density(&self, depth: f64, converter: &DepthConverter) -> f64 {
        let surface = self.o2 * O2_DENSITY + self.n2() * N2_DENSITY + self.he * HE_DENSITY;
        surface * converter.to_bar(depth) / STANDARD_PRESSURE
    }

    pub fn is_breathable(&self, depth: f64, limits: &GasLimits, converter: &DepthConverter) -> bool {
        let ppo2 = self.ppo2(depth, converter);
        ppo2 <= limits.max_ppo2 + TOLERANCE
            && ppo2 >= MIN_PPO2 - TOLERANCE
            && self.end(depth, limits.oxygen_narcotic, converter) <= limits.max_end + TOLERANCE
    }

    pub fn is_air(&self) -> bool {
        self.he == 0.0 && fabs(self.o2 - AIR_O2) < 0.0015
    }

    fn percent(fraction: f64) -> u32 {
        round(fraction * 100.0) as u32
    }
}

/// Picks the gas which minimizes the inert gas loading at `depth` among the
/// breathable candidates. Ties prefer less helium, then the first candidate.
pub fn best_gas<I>(candidates: I, depth: f64, limits: &GasLimits, converter: &DepthConverter) -> Option<usize>
where
    I: IntoIterator<Item = (usize, Gas)>,
{
    let mut best: Option<(usize, Gas)> = None;
    for (index, gas) in candidates {
        if !gas.is_breathable(depth, limits, converter) {
            continue;
        }
        let better = match best {
            None => true,
            Some((_, current)) => {
                gas.o2 > current.o2 + TOLERANCE
                    || (fabs(gas.o2 - current.o2) <= TOLERANCE && gas.he < current.he - TOLERANCE)
            }
        };
        if better {
            best = Some((index, gas));
        }
    }
    best.map(|(index, _)| index)
}

impl fmt::Display for Gas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o2 = Gas::percent(self.o2);
        let he = Gas::percent(self.he);
        if self.is_air() {
            write!(f, "Air")
        } else if o2 == 100 {
            write!(f, "Oxygen")
        } else if he == 0 {
            write!(f, "EAN{}", o2)
        } else if o2 + he == 100 {
            write!(f, "Heliox {}/{}", o2, he)
        } else if o2 >= 21 {
            write!(f, "Helitrox {}/{}", o2, he)
        } else {
            write!(f, "Trimix {}/{}", o2, he)
        }
    }
}

impl FromStr for Gas {
    type Err = PlanError;

    /// Accepts `Air`, `Oxygen`, `EAN32`, `Trimix 18/45`, `Helitrox 25/25`,
    /// `Heliox 10/90` or a bare `18/45`.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("air") {
            return Ok(Gas::AIR);
        }
        if name.eq_ignore_ascii_case("oxygen") || name.eq_ignore_ascii_case("o2") {
            return Ok(Gas::OXYGEN);
        }
        let parse_percent = |text: &str| {
            text.trim()
                .parse::<u32>()
                .ok()
                .filter(|value| *value <= 100)
                .map(|value| value as f64 / 100.0)
                .ok_or(PlanError::UnknownGasName)
        };

        let gas = if let Some(o2) = strip_prefix_ignore_case(name, "ean") {
            Gas::nitrox(parse_percent(o2)?)
        } else {
            let fractions = ["trimix", "helitrox", "heliox"]
                .iter()
                .find_map(|prefix| strip_prefix_ignore_case(name, prefix))
                .unwrap_or(name);
            let (o2, he) = fractions.split_once('/').ok_or(PlanError::UnknownGasName)?;
            Gas::new(parse_percent(o2)?, parse_percent(he)?)
        };
        gas.validate()?;
        Ok(gas)
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        text.get(prefix.len()..)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    fn converter() -> DepthConverter {
        DepthConverter::simple()
    }

    #[test]
    fn test_nitrogen_is_derived() {
        let gas = Gas::new(0.18, 0.45);
        assert!((gas.n2() - 0.37).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_fractions() {
        assert!(Gas::new(0.6, 0.5).validate().is_err());
        assert!(Gas::new(-0.1, 0.0).validate().is_err());
        assert!(Gas::new(f64::NAN, 0.0).validate().is_err());
        assert!(Gas::new(0.21, 0.79).validate().is_ok());
    }

    #[test]
    fn test_mod_of_ean32() {
        let depth = Gas::nitrox(0.32).mod_depth(1.4, &converter());
        assert!((depth - 33.3).abs() < 0.1, "{}", depth);
    }

    #[test]
    fn test_best_mix_at_30m() {
        let o2 = best_mix(1.4, 30.0, &converter());
        assert!((o2 - 0.346).abs() < 0.001, "{}", o2);
        assert_eq!(best_mix(1.6, 0.0, &converter()), 1.0);
    }

    #[test]
    fn test_end_of_air_is_depth() {
        let end = Gas::AIR.end(30.0, true, &converter());
        assert!((end - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_helium_reduces_end() {
        let end = Gas::new(0.18, 0.45).end(45.0, true, &converter());
        assert!(end < 25.0, "{}", end);
    }

    #[test]
    fn test_oxygen_narcotic_changes_mnd() {
        let gas = Gas::nitrox(0.32);
        let narcotic = gas.mnd(30.0, true, &converter());
        let not_narcotic = gas.mnd(30.0, false, &converter());
        assert!((narcotic - 30.0).abs() < 1e-9);
        assert!(not_narcotic > narcotic);
    }

    #[test]
    fn test_heliox_has_no_narcotic_limit() {
        assert!(Gas::new(0.1, 0.9).mnd(30.0, false, &converter()).is_infinite());
    }

    #[test]
    fn test_hypoxic_ceiling() {
        let ceiling = Gas::new(0.10, 0.70).ceiling(&converter());
        assert!(ceiling > 7.0 && ceiling < 9.0, "{}", ceiling);
        assert_eq!(Gas::AIR.ceiling(&converter()), 0.0);
    }

    #[test]
    fn test_air_density_at_40m_is_high() {
        let density = Gas::AIR.density(40.0, &converter());
        assert!(density > 5.7, "{}", density);
        assert!(Gas::new(0.18, 0.45).density(40.0, &converter()) < 5.7);
    }

    #[test]
    fn test_best_trimix_keeps_end() {
        let gas = best_trimix(1.4, 60.0, 30.0, true, &converter());
        let end = gas.end(60.0, true, &converter());
        assert!((end - 30.0).abs() < 0.01, "{}", end);
        assert!(gas.validate().is_ok());
    }

    #[test]
    fn test_best_gas_prefers_oxygen_rich() {
        let limits = GasLimits {
            max_ppo2: 1.6,
            max_end: 30.0,
            oxygen_narcotic: true,
        };
        let gases = vec![
            (0, Gas::new(0.18, 0.45)),
            (1, Gas::nitrox(0.5)),
            (2, Gas::OXYGEN),
        ];
        let pick = |depth: f64| best_gas(gases.iter().copied(), depth, &limits, &converter());
        assert_eq!(pick(40.0), Some(0));
        assert_eq!(pick(21.0), Some(1));
        assert_eq!(pick(3.0), Some(2));
    }

    #[test]
    fn test_gas_names() {
        assert_eq!(Gas::AIR.to_string(), "Air");
        assert_eq!(Gas::OXYGEN.to_string(), "Oxygen");
        assert_eq!(Gas::nitrox(0.32).to_string(), "EAN32");
        assert_eq!(Gas::new(0.18, 0.45).to_string(), "Trimix 18/45");
        assert_eq!(Gas::new(0.25, 0.25).to_string(), "Helitrox 25/25");
        assert_eq!(Gas::new(0.10, 0.90).to_string(), "Heliox 10/90");
    }

    #[test]
    fn test_parse_gas_names() {
        assert_eq!("air".parse::<Gas>(), Ok(Gas::AIR));
        assert_eq!("EAN50".parse::<Gas>(), Ok(Gas::nitrox(0.5)));
        assert_eq!("Trimix 18/45".parse::<Gas>(), Ok(Gas::new(0.18, 0.45)));
        assert_eq!("21/35".parse::<Gas>(), Ok(Gas::new(0.21, 0.35)));
        assert_eq!("EAN120".parse::<Gas>(), Err(PlanError::UnknownGasName));
        assert!("60/60".parse::<Gas>().is_err());
    }
}
