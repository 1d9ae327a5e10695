//! Config loading tests against the shipped data/ directory.

use rotation_core::{
    config::RotationConfig, engine::RotationEngine, error::ErrorKind, store::RotationStore,
};

const DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../data");

#[test]
fn shipped_config_loads_and_matches_test_defaults() {
    let loaded = RotationConfig::load(DATA_DIR).expect("load data/rotation.json");
    let defaults = RotationConfig::default_test();

    let points = |c: &RotationConfig| {
        c.tiers.iter().map(|t| (t.name.clone(), t.points)).collect::<Vec<_>>()
    };
    assert_eq!(points(&loaded), points(&defaults));
    assert_eq!(loaded.unknown_tier_policy, defaults.unknown_tier_policy);
    assert_eq!(loaded.fallback_points, 1);
}

#[test]
fn missing_data_dir_is_reported() {
    let err = RotationConfig::load("/definitely/not/here").unwrap_err();
    assert!(err.to_string().contains("Cannot read"), "{err}");
}

#[test]
fn engine_lists_tiers_by_rank() {
    let config = RotationConfig::load(DATA_DIR).unwrap();
    let store = RotationStore::in_memory().unwrap();
    store.migrate().unwrap();
    let engine = RotationEngine::build(store, config).unwrap();

    let names: Vec<String> = engine.tiers().unwrap().into_iter().map(|t| t.name).collect();
    assert_eq!(names, ["Simple", "Earl", "Duke"]);
}

#[test]
fn engine_rejects_invalid_config() {
    let mut config = RotationConfig::default_test();
    config.fallback_points = 0;
    let store = RotationStore::in_memory().unwrap();
    store.migrate().unwrap();

    let Err(err) = RotationEngine::build(store, config) else {
        panic!("zero fallback points must be rejected");
    };
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("fallback_points"), "{err}");
}
