#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use timeline_core::{
    build_generation_app, run_generation, InputBundle, InputPaths, RunContext, ValueTimeline,
};

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Paths for the fixture world: a 10° grid, two track-driven platforms and a
/// small deck centred on region 343 (the cell at 0–10°N, 0–10°E).
pub fn fixture_paths() -> InputPaths {
    InputPaths {
        region_table: Some(fixture_path("regions.json")),
        sensor_catalog: Some(fixture_path("sensors.json")),
        crisis_config: Some(fixture_path("crises.json")),
        requirement_deck: Some(fixture_path("deck.json")),
        scenario: Some(fixture_path("scenario.json")),
    }
}

pub fn fixture_bundle() -> anyhow::Result<InputBundle> {
    InputBundle::load(&fixture_paths()).context("loading fixture inputs")
}

pub fn fixture_context() -> anyhow::Result<RunContext> {
    fixture_bundle()?
        .build_context()
        .context("building fixture context")
}

pub fn generate(context: RunContext) -> anyhow::Result<Vec<ValueTimeline>> {
    let mut app = build_generation_app(Arc::new(context));
    run_generation(&mut app).context("generating timelines")
}

pub fn timeline<'a>(timelines: &'a [ValueTimeline], platform: &str) -> &'a ValueTimeline {
    timelines
        .iter()
        .find(|timeline| timeline.platform == platform)
        .unwrap_or_else(|| panic!("no timeline for {platform}"))
}
