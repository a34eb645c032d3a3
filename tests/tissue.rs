use dive_planner_deco::pressure::{DepthConverter, WATER_VAPOR_PRESSURE};
use dive_planner_deco::tissue::{LoadSegment, Tissue, Tissues, calculate_tissue};
use dive_planner_deco::zh16c::COMPARTMENTS;
use dive_planner_deco::Gas;
use rand::Rng;

#[test]
fn test_zero_duration_keeps_every_compartment() {
    let tissues = Tissues::surface_equilibrium(1.01325);
    let segment = LoadSegment::flat(5.0, 0.0);
    assert_eq!(tissues.loaded(&segment, &Gas::new(0.18, 0.45)), tissues);
}

#[test]
fn test_long_exposure_reaches_equilibrium() {
    let trimix = Gas::new(0.21, 0.35);
    let pressure = 4.0;
    let mut tissues = Tissues::surface_equilibrium(1.01325);
    tissues.load(&LoadSegment::flat(pressure, 1e6), &trimix);

    let alveolar = pressure - WATER_VAPOR_PRESSURE;
    for tissue in tissues.compartments() {
        assert!((tissue.load_n2 - alveolar * trimix.n2()).abs() < 1e-6, "{:?}", tissue);
        assert!((tissue.load_he - alveolar * trimix.he).abs() < 1e-6, "{:?}", tissue);
    }
}

#[test]
fn test_offgassing_at_the_surface() {
    let converter = DepthConverter::simple();
    let mut tissues = Tissues::surface_equilibrium(converter.surface_pressure);
    tissues.load(&LoadSegment::flat(converter.to_bar(30.0), 20.0 * 60.0), &Gas::AIR);
    let saturated = tissues;

    tissues.load(&LoadSegment::flat(converter.surface_pressure, 10.0 * 60.0), &Gas::AIR);
    for (before, after) in saturated.compartments().iter().zip(tissues.compartments()) {
        assert!(after.load_n2 < before.load_n2);
    }
}

#[test]
fn test_descent_loads_less_than_level_at_depth() {
    let converter = DepthConverter::simple();
    let surface = Tissues::surface_equilibrium(converter.surface_pressure);
    let descent = LoadSegment {
        start_pressure: converter.surface_pressure,
        end_pressure: converter.to_bar(40.0),
        duration: 120.0,
    };
    let level = LoadSegment::flat(converter.to_bar(40.0), 120.0);

    let descended = surface.loaded(&descent, &Gas::AIR);
    let stayed = surface.loaded(&level, &Gas::AIR);
    for (descended, stayed) in descended.compartments().iter().zip(stayed.compartments()) {
        assert!(descended.load_n2 < stayed.load_n2);
        assert!(descended.load_n2 > surface.compartments()[0].load_n2);
    }
}

#[test]
fn test_random_loads_move_towards_inspired_pressure() {
    let mut rng = rand::rng();
    for _ in 0..200 {
        let tissue = Tissue {
            load_n2: rng.random_range(0.2..6.0),
            load_he: rng.random_range(0.0..4.0),
        };
        let pressure = rng.random_range(1.0..10.0);
        let minutes = rng.random_range(0.1..120.0);
        let o2 = rng.random_range(0.1..0.5);
        let gas = Gas::new(o2, rng.random_range(0.0..(1.0 - o2)));
        let compartment = &COMPARTMENTS[rng.random_range(0..COMPARTMENTS.len())];

        let segment = LoadSegment::flat(pressure, minutes * 60.0);
        let result = calculate_tissue(tissue, compartment, &segment, &gas);

        let inspired_n2 = (pressure - WATER_VAPOR_PRESSURE) * gas.n2();
        let inspired_he = (pressure - WATER_VAPOR_PRESSURE) * gas.he;
        assert!((result.load_n2 - inspired_n2).abs() <= (tissue.load_n2 - inspired_n2).abs() + 1e-12);
        assert!((result.load_he - inspired_he).abs() <= (tissue.load_he - inspired_he).abs() + 1e-12);
    }
}

#[test]
fn test_loading_in_pieces_matches_one_piece() {
    let converter = DepthConverter::simple();
    let surface = Tissues::surface_equilibrium(converter.surface_pressure);
    let whole = surface.loaded(&LoadSegment::flat(converter.to_bar(25.0), 600.0), &Gas::nitrox(0.32));

    let mut pieces = surface;
    for _ in 0..10 {
        pieces.load(&LoadSegment::flat(converter.to_bar(25.0), 60.0), &Gas::nitrox(0.32));
    }
    for (whole, pieces) in whole.compartments().iter().zip(pieces.compartments()) {
        assert!((whole.load_n2 - pieces.load_n2).abs() < 1e-9);
    }
}
