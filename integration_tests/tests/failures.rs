mod common;

use std::fs;

use timeline_core::{InputBundle, InputPaths, RequirementDeckError, TimelineError};

#[test]
fn deck_row_for_unknown_region_fails_the_run() {
    let mut bundle = common::fixture_bundle().unwrap();
    bundle.deck.rows[0].region = 9_999;

    let err = bundle.build_context().unwrap_err();
    assert!(matches!(
        err,
        TimelineError::RequirementDeck(RequirementDeckError::UnknownRegion { region: 9_999, .. })
    ));
}

#[test]
fn deck_file_with_unknown_sensor_fails_to_load() {
    let mut bundle = common::fixture_bundle().unwrap();
    bundle.deck.rows[1].scores[0].sensor = 42;
    let path = std::env::temp_dir().join(format!(
        "value_timeline_bad_deck_{}.json",
        std::process::id()
    ));
    fs::write(&path, serde_json::to_string_pretty(&bundle.deck).unwrap()).unwrap();

    let paths = InputPaths {
        requirement_deck: Some(path.clone()),
        ..common::fixture_paths()
    };
    let result = InputBundle::load(&paths).and_then(|bundle| bundle.build_context());
    fs::remove_file(&path).ok();

    assert!(matches!(
        result,
        Err(TimelineError::RequirementDeck(RequirementDeckError::UnknownSensor { row: 1, sensor: 42 }))
    ));
}

#[test]
fn malformed_file_is_not_replaced_by_builtin() {
    let path = std::env::temp_dir().join(format!(
        "value_timeline_bad_scenario_{}.json",
        std::process::id()
    ));
    fs::write(&path, "{ \"step_seconds\": ").unwrap();

    let paths = InputPaths {
        scenario: Some(path.clone()),
        ..common::fixture_paths()
    };
    let result = InputBundle::load(&paths);
    fs::remove_file(&path).ok();

    assert!(matches!(result, Err(TimelineError::Scenario(_))));
}
