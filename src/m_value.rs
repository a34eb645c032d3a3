use crate::tissue::Tissue;
use crate::zh16c::Compartment;

/// Bühlmann a/b coefficients blended by the share of each inert gas in the
/// compartment (Workman/Baker). Falls back to the N2 pair for an empty tissue.
pub fn coefficients(compartment: &Compartment, tissue: &Tissue) -> (f64, f64) {
    let p_total = tissue.total();
    if p_total <= 1e-10 {
        return (compartment.n2_a, compartment.n2_b);
    }
    let a = (compartment.n2_a * tissue.load_n2 + compartment.he_a * tissue.load_he) / p_total;
    let b = (compartment.n2_b * tissue.load_n2 + compartment.he_b * tissue.load_he) / p_total;
    (a, b)
}

/// Maximum tolerated inert gas pressure at `ambient_pressure`.
pub fn calculate_m_value(compartment: &Compartment, tissue: &Tissue, ambient_pressure: f64) -> f64 {
    let (a, b) = coefficients(compartment, tissue);
    a + ambient_pressure / b
}

/// Lowest ambient pressure the compartment tolerates under gradient factor `gf`.
pub fn tolerated_pressure(compartment: &Compartment, tissue: &Tissue, gf: f64) -> f64 {
    let (a, b) = coefficients(compartment, tissue);
    (tissue.total() - a * gf) / (gf / b + 1.0 - gf)
}

/// Supersaturation at `ambient_pressure` as a fraction of the M-value gradient.
/// Zero or negative while the tissue is not supersaturated.
pub fn gradient_factor(compartment: &Compartment, tissue: &Tissue, ambient_pressure: f64) -> f64 {
    let denominator = calculate_m_value(compartment, tissue, ambient_pressure) - ambient_pressure;
    if denominator <= 1e-10 {
        return 0.0;
    }
    (tissue.total() - ambient_pressure) / denominator
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zh16c::COMPARTMENTS;

    #[test]
    fn test_pure_nitrogen_uses_nitrogen_coefficients() {
        let tissue = Tissue {
            load_n2: 2.0,
            load_he: 0.0,
        };
        let compartment = &COMPARTMENTS[3];
        assert_eq!(coefficients(compartment, &tissue), (compartment.n2_a, compartment.n2_b));
    }

    #[test]
    fn test_blended_coefficients_lie_between_gases() {
        let tissue = Tissue {
            load_n2: 1.0,
            load_he: 1.0,
        };
        let compartment = &COMPARTMENTS[0];
        let (a, b) = coefficients(compartment, &tissue);
        assert!((a - (compartment.n2_a + compartment.he_a) / 2.0).abs() < 1e-12);
        assert!((b - (compartment.n2_b + compartment.he_b) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_full_gradient_factor_tolerates_m_value() {
        let tissue = Tissue {
            load_n2: 3.11,
            load_he: 0.0,
        };
        let compartment = &COMPARTMENTS[1];
        let tolerated = tolerated_pressure(compartment, &tissue, 1.0);
        let m_value = calculate_m_value(compartment, &tissue, tolerated);
        assert!((m_value - tissue.total()).abs() < 1e-9);
        assert!((gradient_factor(compartment, &tissue, tolerated) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_lower_gradient_factor_is_more_conservative() {
        let tissue = Tissue {
            load_n2: 3.11,
            load_he: 0.0,
        };
        let compartment = &COMPARTMENTS[1];
        assert!(tolerated_pressure(compartment, &tissue, 0.3) > tolerated_pressure(compartment, &tissue, 1.0));
    }
}
