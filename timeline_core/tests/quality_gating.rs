use std::collections::BTreeSet;

use bevy::math::DVec3;
use timeline_core::{
    CollectionGeometry, GeoPoint, InputBundle, QualityKind, QualityModel, SlantRangeQuality,
    TimelineGenerator, VehicleState,
};

/// Targets along a meridian, walking away from the subsatellite point.
fn qualities(sensor_number: u32) -> (QualityKind, Vec<Option<f64>>) {
    let context = InputBundle::builtin()
        .build_context()
        .expect("builtin inputs build");
    let sensor = context.catalog.sensor(sensor_number).expect("sensor in catalog");
    let state = VehicleState::above(GeoPoint::from_degrees(0.0, 0.0), 600.0, DVec3::new(0.0, 0.0, 7.5));
    let qualities = (0..40)
        .map(|step| {
            let target = GeoPoint::from_degrees(step as f64 * 0.5, 0.0).surface_position();
            SlantRangeQuality.evaluate(sensor, &CollectionGeometry::new(target, state))
        })
        .collect();
    (sensor.quality_kind, qualities)
}

#[test]
fn gsd_degrades_with_distance_until_vetoed() {
    let (kind, qualities) = qualities(1);
    assert_eq!(kind, QualityKind::Gsd);
    let nadir = qualities[0].expect("nadir is collectable");
    assert!((nadir - 0.5).abs() < 1e-9);

    let achieved: Vec<f64> = qualities.iter().map_while(|quality| *quality).collect();
    assert!(achieved.len() < qualities.len(), "minimum elevation never vetoed");
    assert!(qualities[achieved.len()..].iter().all(Option::is_none));
    assert!(achieved.windows(2).all(|pair| pair[1] > pair[0]));
}

#[test]
fn niirs_drops_with_distance() {
    let (kind, qualities) = qualities(2);
    assert_eq!(kind, QualityKind::Niirs);

    let achieved: Vec<f64> = qualities.into_iter().map(|quality| quality.expect("no veto")).collect();
    assert!(achieved.windows(2).all(|pair| pair[1] < pair[0]));
    assert!(kind.satisfies(achieved[0], 5.0));
}

/// (platform, time index, sensor) triples that carry a real requirement for
/// sensors of `kind`, after rewriting every deck quality level whose code
/// starts with `prefix`.
fn real_assignments(
    kind: QualityKind,
    prefix: &str,
    tighten: impl Fn(f64) -> f64,
) -> BTreeSet<(String, usize, u32)> {
    let mut bundle = InputBundle::builtin();
    for (code, value) in bundle.deck.quality_levels.iter_mut() {
        if code.starts_with(prefix) {
            *value = tighten(*value);
        }
    }
    let context = bundle.build_context().expect("builtin inputs build");
    let sensors: Vec<u32> = context
        .catalog
        .sensors()
        .iter()
        .filter(|sensor| sensor.quality_kind == kind)
        .map(|sensor| sensor.number)
        .collect();
    let timelines = TimelineGenerator::new(&context)
        .generate_all()
        .expect("builtin generation");

    let mut found = BTreeSet::new();
    for timeline in &timelines {
        for element in timeline.elements() {
            for resource in &element.resources {
                if resource.mission.is_some() && sensors.contains(&resource.sensor) {
                    found.insert((timeline.platform.clone(), element.time_index, resource.sensor));
                }
            }
        }
    }
    found
}

fn assert_never_grows(sets: &[BTreeSet<(String, usize, u32)>]) {
    assert!(!sets[0].is_empty(), "nothing imaged at the loosest levels");
    for pair in sets.windows(2) {
        assert!(
            pair[1].is_subset(&pair[0]),
            "stricter levels imaged {:?}",
            pair[1].difference(&pair[0]).collect::<Vec<_>>()
        );
    }
    assert!(sets[sets.len() - 1].is_empty());
}

#[test]
fn stricter_gsd_levels_never_add_collections() {
    let sets: Vec<_> = [8.0, 1.0, 0.75, 0.5, 0.25, 0.0]
        .into_iter()
        .map(|factor| real_assignments(QualityKind::Gsd, "G", move |value| value * factor))
        .collect();
    assert_never_grows(&sets);
}

#[test]
fn stricter_niirs_levels_never_add_collections() {
    let sets: Vec<_> = [-10.0, 0.0, 0.5, 1.0, 2.0, 20.0]
        .into_iter()
        .map(|offset| real_assignments(QualityKind::Niirs, "N", move |value| value + offset))
        .collect();
    assert_never_grows(&sets);
}
