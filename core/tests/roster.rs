//! Roster tests: naming rules, partial updates, activation tracking.

use rotation_core::{
    engine::RotationEngine,
    error::{ErrorKind, RotationError},
    roster::ParticipantPatch,
};

fn build() -> RotationEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    RotationEngine::build_test().expect("build test engine")
}

#[test]
fn new_participant_starts_with_zeroed_aggregates() {
    let engine = build();
    let p = engine.add_participant("  Morgan  ", true).unwrap();
    assert_eq!(p.name, "Morgan", "names are trimmed");
    assert!(p.active);
    assert_eq!(p.total_awards, 0);
    assert_eq!(p.total_points, 0);
    assert!(p.last_award_at.is_none());
    assert!(p.last_award_tier.is_none());

    let tracked = engine
        .with_store(|s| s.cycle_record(&p.participant_id, 0))
        .unwrap();
    assert_eq!(tracked, Some(false), "active participants are tracked on creation");
}

#[test]
fn empty_name_is_rejected() {
    let engine = build();
    let err = engine.add_participant("   ", true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(engine.participants().unwrap().is_empty());
}

#[test]
fn duplicate_name_is_a_conflict() {
    let engine = build();
    engine.add_participant("Robin", true).unwrap();
    let err = engine.add_participant("Robin", false).unwrap_err();
    assert!(matches!(err, RotationError::Conflict(_)), "{err:?}");
    assert_eq!(engine.participants().unwrap().len(), 1);
}

#[test]
fn rename_to_taken_name_is_a_conflict() {
    let engine = build();
    engine.add_participant("Robin", true).unwrap();
    let kit = engine.add_participant("Kit", true).unwrap().participant_id;

    let err = engine
        .update_participant(&kit, ParticipantPatch { name: Some("Robin".into()), active: None })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(engine.participant(&kit).unwrap().name, "Kit");
}

#[test]
fn patch_writes_only_supplied_fields() {
    let engine = build();
    let id = engine.add_participant("Kit", true).unwrap().participant_id;

    let renamed = engine
        .update_participant(&id, ParticipantPatch { name: Some("Kitt".into()), active: None })
        .unwrap();
    assert_eq!(renamed.name, "Kitt");
    assert!(renamed.active, "active untouched by a name-only patch");

    let paused = engine
        .update_participant(&id, ParticipantPatch { name: None, active: Some(false) })
        .unwrap();
    assert_eq!(paused.name, "Kitt");
    assert!(!paused.active);
}

#[test]
fn empty_patch_is_rejected() {
    let engine = build();
    let id = engine.add_participant("Kit", true).unwrap().participant_id;
    let err = engine.update_participant(&id, ParticipantPatch::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn updating_unknown_participant_is_not_found() {
    let engine = build();
    let err = engine.set_active("ghost", true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(engine.remove_participant("ghost").unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn inactive_participants_are_excluded_from_ranking() {
    let engine = build();
    engine.add_participant("Alpha", true).unwrap();
    let beta = engine.add_participant("Beta", true).unwrap().participant_id;
    engine.add_participant("Gamma", false).unwrap();

    let ranked = engine.rank().unwrap();
    let names: Vec<&str> = ranked.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Alpha", "Beta"], "never-awarded ties fall back to name order");

    engine.set_active(&beta, false).unwrap();
    let next = engine.next_candidate().unwrap().unwrap();
    assert_eq!(next.name, "Alpha");
    assert_eq!(engine.rank().unwrap().len(), 1);
}

#[test]
fn activation_tracks_participant_once() {
    let engine = build();
    let id = engine.add_participant("Late", false).unwrap().participant_id;
    assert_eq!(engine.with_store(|s| s.cycle_record(&id, 0)).unwrap(), None);

    engine.set_active(&id, true).unwrap();
    engine.set_active(&id, true).unwrap();
    let count = engine.with_store(|s| s.cycle_record_count(&id, 0)).unwrap();
    assert_eq!(count, 1);
}

#[test]
fn active_listing_and_roster_counts() {
    let engine = build();
    let a = engine.add_participant("Ari", true).unwrap().participant_id;
    engine.add_participant("Bo", true).unwrap();
    engine.add_participant("Cy", false).unwrap();
    engine.add_participant("Dee", true).unwrap();

    let a_award = chrono::Utc::now();
    engine.grant_award(&a, "Simple", a_award).unwrap();
    engine.grant_award(&a, "Simple", a_award).unwrap();

    let active: Vec<String> = engine
        .active_participants()
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(active, ["Ari", "Bo", "Dee"]);
    assert_eq!(engine.participants().unwrap().len(), 4);

    let stats = engine.roster_stats().unwrap();
    assert_eq!((stats.total, stats.active, stats.inactive), (4, 3, 1));
    assert!((stats.avg_awards - 0.5).abs() < 1e-9, "{}", stats.avg_awards);
}

#[test]
fn roster_counts_on_empty_roster() {
    let engine = build();
    let stats = engine.roster_stats().unwrap();
    assert_eq!((stats.total, stats.active, stats.inactive), (0, 0, 0));
    assert_eq!(stats.avg_awards, 0.0);
}
