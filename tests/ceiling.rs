use dive_planner_deco::ceiling::{GradientFactors, max_ceiling, round_to_stop};
use dive_planner_deco::pressure::DepthConverter;
use dive_planner_deco::tissue::{LoadSegment, Tissue, Tissues};
use dive_planner_deco::Gas;
use rand::Rng;

fn dive(depth: f64, minutes: f64, converter: &DepthConverter) -> Tissues {
    let mut tissues = Tissues::surface_equilibrium(converter.surface_pressure);
    tissues.load(
        &LoadSegment {
            start_pressure: converter.surface_pressure,
            end_pressure: converter.to_bar(depth),
            duration: depth / 20.0 * 60.0,
        },
        &Gas::AIR,
    );
    tissues.load(&LoadSegment::flat(converter.to_bar(depth), minutes * 60.0), &Gas::AIR);
    tissues
}

#[test]
fn test_random_tissues_never_give_negative_ceiling() {
    let converter = DepthConverter::simple();
    let mut rng = rand::rng();
    for _ in 0..200 {
        let mut compartments = [Tissue::default(); 16];
        for tissue in compartments.iter_mut() {
            tissue.load_n2 = rng.random_range(0.0..5.0);
            tissue.load_he = rng.random_range(0.0..3.0);
        }
        let tissues = Tissues::from_compartments(compartments);
        let mut gf = GradientFactors::new(rng.random_range(0.1..0.6), rng.random_range(0.6..1.0));
        let ceiling = gf.ceiling(&tissues, &converter);
        assert!(ceiling >= 0.0);
        assert!(ceiling.is_finite());
    }
}

#[test]
fn test_ceiling_decreases_while_holding_at_a_stop() {
    let converter = DepthConverter::simple();
    let mut tissues = dive(40.0, 25.0, &converter);
    let mut gf = GradientFactors::new(0.3, 0.85);

    let mut previous = gf.ceiling(&tissues, &converter);
    assert!(previous > 3.0, "{}", previous);
    let stop = LoadSegment::flat(converter.to_bar(3.0), 60.0);
    for _ in 0..120 {
        tissues.load(&stop, &Gas::AIR);
        let next = gf.ceiling(&tissues, &converter);
        assert!(next <= previous + 1e-3, "{} > {}", next, previous);
        previous = next;
    }
    assert_eq!(previous, 0.0);
}

#[test]
fn test_lower_gradient_factors_are_more_conservative() {
    let converter = DepthConverter::simple();
    let tissues = dive(45.0, 20.0, &converter);
    let conservative = GradientFactors::new(0.3, 0.7).ceiling(&tissues, &converter);
    let liberal = GradientFactors::new(0.8, 0.9).ceiling(&tissues, &converter);
    let raw = GradientFactors::new(1.0, 1.0).ceiling(&tissues, &converter);
    assert!(conservative > liberal);
    assert!(liberal > raw);
    assert!((raw - max_ceiling(&tissues, 1.0, &converter).0).abs() < 1e-9);
}

#[test]
fn test_ceiling_stop_stays_on_grid() {
    let converter = DepthConverter::simple();
    let mut gf = GradientFactors::new(0.4, 0.85);
    for minutes in [15.0, 25.0, 40.0] {
        let tissues = dive(40.0, minutes, &converter);
        let stop = gf.ceiling_stop(&tissues, &converter, 3.0);
        let ceiling = gf.ceiling(&tissues, &converter);
        assert_eq!(stop % 3.0, 0.0, "{}", stop);
        assert!(stop >= ceiling);
        assert!(stop - ceiling < 3.0);
    }
}

#[test]
fn test_round_to_stop() {
    assert_eq!(round_to_stop(0.0, 3.0), 0.0);
    assert_eq!(round_to_stop(0.2, 3.0), 3.0);
    assert_eq!(round_to_stop(6.0, 3.0), 6.0);
    assert_eq!(round_to_stop(6.01, 3.0), 9.0);
}
