mod common;

use timeline_core::{FullRegionNumber, TimelineError};
use timeline_schema::{EphemerisBlock, PlatformBlock};

#[test]
fn crisis_region_tags_element_with_most_valuable_area() {
    let context = common::fixture_context().unwrap();
    let crises = std::sync::Arc::clone(&context.crises);
    let timelines = common::generate(context).unwrap();
    let responder = common::timeline(&timelines, "RESPONDER");

    // Over region 343: only the Flood area is in view.
    let first = responder.element(0);
    assert_eq!(first.crisis_level, 1);
    assert_eq!(first.score, 30.0);
    assert_eq!(responder.objective_score(0, &crises), 30.0 + 30.0 * 1.5);

    // On the 343/344 boundary both areas are in view; Quake pays more.
    let second = responder.element(1);
    assert_eq!(second.crisis_level, 2);
    assert_eq!(responder.objective_score(1, &crises), 30.0 * 2.0);
}

#[test]
fn crisis_only_region_gets_placeholder() {
    let timelines = common::generate(common::fixture_context().unwrap()).unwrap();
    let responder = common::timeline(&timelines, "RESPONDER");

    let step = responder.element(1);
    assert_eq!(step.score, 0.0);
    let resource = &step.resources[0];
    assert_eq!(resource.imaged_region, Some(FullRegionNumber::new(344, None)));
    assert_eq!(resource.mission, None);
    assert_eq!(resource.sub_priority, 0);
    assert!((resource.collection_time - 5.0).abs() < 1e-9);

    let data = step.most_valuable.as_ref().expect("placeholder region");
    assert!(data.crisis.is_some());
    assert!(data.requirements().iter().all(|requirement| requirement.placeholder));
}

#[test]
fn non_member_never_sees_crisis_levels() {
    let timelines = common::generate(common::fixture_context().unwrap()).unwrap();
    let survey = common::timeline(&timelines, "SURVEY");
    assert!(survey.elements().iter().all(|element| element.crisis_level == 0));
}

#[test]
fn crisis_member_with_lopsided_crisis_cones_fails() {
    let mut bundle = common::fixture_bundle().unwrap();
    bundle.scenario.platforms.push(PlatformBlock {
        name: "LOPSIDED".to_string(),
        user: "ALPHA".to_string(),
        deck: 1,
        sensors: vec![3],
        service_tier: None,
        revisit: false,
        ephemeris: EphemerisBlock::GroundSite {
            latitude_deg: 5.0,
            longitude_deg: 5.0,
            altitude_km: 0.0,
        },
    });
    let context = bundle.build_context().unwrap();

    let err = common::generate(context).unwrap_err();
    let err = err
        .downcast_ref::<TimelineError>()
        .expect("generation error");
    assert!(matches!(
        err,
        TimelineError::AsymmetricCrisisCones { sensor: 3, .. }
    ));
}

fn responder_never_images(timelines: &[timeline_core::ValueTimeline], regions: &[u32]) {
    let responder = common::timeline(timelines, "RESPONDER");
    for element in responder.elements() {
        assert_eq!(element.crisis_level, 0, "step {}", element.time_index);
        assert_eq!(element.score, 0.0, "step {}", element.time_index);
        for resource in &element.resources {
            let imaged = resource.imaged_region.map(|region| region.number());
            assert!(
                imaged.map_or(true, |number| !regions.contains(&number)),
                "step {} imaged {imaged:?}",
                element.time_index
            );
        }
    }
}

#[test]
fn revisit_platform_never_images_ineligible_crisis_regions() {
    let mut bundle = common::fixture_bundle().unwrap();
    let responder = bundle
        .scenario
        .platforms
        .iter_mut()
        .find(|platform| platform.name == "RESPONDER")
        .unwrap();
    // No fixture region is flagged for revisit.
    responder.revisit = true;

    let timelines = common::generate(bundle.build_context().unwrap()).unwrap();
    responder_never_images(&timelines, &[343, 344]);
}

#[test]
fn service_tier_without_access_never_images_crisis_regions() {
    let mut bundle = common::fixture_bundle().unwrap();
    for region in bundle
        .regions
        .regions
        .iter_mut()
        .filter(|region| matches!(region.number, 343 | 344))
    {
        region.service_tiers[0].access_level = 0;
    }
    let responder = bundle
        .scenario
        .platforms
        .iter_mut()
        .find(|platform| platform.name == "RESPONDER")
        .unwrap();
    responder.service_tier = Some(0);

    let timelines = common::generate(bundle.build_context().unwrap()).unwrap();
    responder_never_images(&timelines, &[343, 344]);
}
