mod common;

use timeline_core::ValueTimeline;
use timeline_schema::{decode_export, encode_export, hash_export, TimelineExport};

fn export() -> TimelineExport {
    let context = common::fixture_context().unwrap();
    let clock = context.scenario.clock;
    let timelines = common::generate(context).unwrap();
    TimelineExport::new(
        clock.time_steps,
        clock.step_seconds,
        timelines
            .iter()
            .map(ValueTimeline::to_platform_record)
            .collect(),
    )
}

#[test]
fn repeated_runs_hash_identically() {
    let first = export();
    let second = export();
    assert_eq!(first.header.hash, second.header.hash);
    assert_eq!(first.platforms, second.platforms);
}

#[test]
fn export_keeps_scenario_order_and_hash() {
    let export = export();
    let names: Vec<&str> = export
        .platforms
        .iter()
        .map(|platform| platform.platform.as_str())
        .collect();
    assert_eq!(names, ["SURVEY", "RESPONDER"]);
    assert_eq!(export.header.platform_count, 2);
    assert_eq!(export.header.time_steps, 4);

    let decoded = decode_export(&encode_export(&export).unwrap()).unwrap();
    assert_eq!(hash_export(&decoded), export.header.hash);
}
