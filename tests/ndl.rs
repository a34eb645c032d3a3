use dive_planner_deco::ndl::{NDL_LIMIT, ndl_table, no_deco_limit};
use dive_planner_deco::{Gas, Options, simple_dive};

#[test]
fn test_air_table_matches_reference() {
    let table = ndl_table(&Gas::AIR, &Options::default()).unwrap();
    let mut reader = csv::Reader::from_path("tests/data/ndl_air.csv").unwrap();
    let mut rows = 0;
    for (record, entry) in reader.records().zip(table.iter()) {
        let record = record.unwrap();
        let depth: f64 = record[0].parse().unwrap();
        let min: u32 = record[1].parse().unwrap();
        let max: u32 = record[2].parse().unwrap();
        assert_eq!(entry.depth, depth);
        assert!((min..=max).contains(&entry.limit), "{} m: {}", depth, entry.limit);
        rows += 1;
    }
    assert_eq!(rows, table.len());
}

#[test]
fn test_table_covers_recreational_range() {
    let table = ndl_table(&Gas::AIR, &Options::default()).unwrap();
    assert_eq!(table.len(), 11);
    for (index, entry) in table.iter().enumerate() {
        assert_eq!(entry.depth, 12.0 + 3.0 * index as f64);
        assert!(entry.limit <= NDL_LIMIT);
    }
    for pair in table.windows(2) {
        assert!(pair[1].limit <= pair[0].limit, "{:?}", pair);
    }
}

#[test]
fn test_ndl_shrinks_with_gradient_factors() {
    let settings = [(1.0, 1.0), (0.85, 0.85), (0.5, 0.7), (0.3, 0.5)];
    for depth in [12.0, 18.0, 24.0, 30.0, 36.0, 42.0] {
        let limits: Vec<u32> = settings
            .iter()
            .map(|(low, high)| no_deco_limit(depth, &Gas::AIR, &Options::new(*low, *high)).unwrap())
            .collect();
        for pair in limits.windows(2) {
            assert!(pair[1] <= pair[0], "{} m: {:?}", depth, limits);
        }
    }
}

#[test]
fn test_dive_within_ndl_needs_no_stop() {
    let options = Options::default();
    let limit = no_deco_limit(24.0, &Gas::AIR, &options).unwrap();
    let descent = options.descent_duration(0.0, 24.0);
    let profile = simple_dive(24.0, descent + limit as f64 * 60.0, Gas::AIR, &options).unwrap();
    assert!(!profile.no_deco_exceeded);
    assert_eq!(profile.deco_stops().count(), 0);
}

#[test]
fn test_invalid_gas_is_rejected() {
    assert!(ndl_table(&Gas::new(0.8, 0.5), &Options::default()).is_err());
}
