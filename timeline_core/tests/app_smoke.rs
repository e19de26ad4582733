use std::sync::Arc;

use timeline_core::{build_generation_app, run_generation, GenerationSummary, InputBundle};

#[test]
fn builtin_scenario_generates_every_platform() {
    let bundle = InputBundle::builtin();
    let context = Arc::new(bundle.build_context().expect("builtin inputs build"));
    let mut app = build_generation_app(Arc::clone(&context));

    let timelines = run_generation(&mut app).expect("generation succeeds");
    assert_eq!(timelines.len(), context.scenario.platforms.len());
    for (timeline, platform) in timelines.iter().zip(&context.scenario.platforms) {
        assert_eq!(timeline.platform, platform.name);
        assert_eq!(timeline.len(), context.scenario.clock.time_steps);
        for element in timeline.elements() {
            assert_eq!(element.resources.len(), platform.sensors.len());
            assert!(element.score <= timeline.maximum_score());
        }
    }

    let summary = app.world.resource::<GenerationSummary>();
    assert_eq!(summary.runs, 1);
    assert!(!summary.failed);
    assert_eq!(summary.platforms, timelines.len());
}

#[test]
fn repeated_updates_are_deterministic() {
    let context = Arc::new(
        InputBundle::builtin()
            .build_context()
            .expect("builtin inputs build"),
    );
    let mut app = build_generation_app(context);

    let first = run_generation(&mut app).expect("first pass");
    let second = run_generation(&mut app).expect("second pass");
    assert_eq!(first, second);
    assert_eq!(app.world.resource::<GenerationSummary>().runs, 2);
}
