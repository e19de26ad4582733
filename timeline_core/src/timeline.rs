//! Per-platform value timelines and the elements they are made of.

use timeline_schema::{PlatformTimelineRecord, ResourceRecord, TimelineRecord};

use crate::crisis::CrisisRegistry;
use crate::earth::FullRegionNumber;
use crate::region_data::RegionData;
use crate::sensor::Sensor;

/// What one of the platform's sensors would collect at a time step.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceAssignment {
    pub sensor: u32,
    pub mission: Option<usize>,
    pub sub_priority: u32,
    pub imaged_region: Option<FullRegionNumber>,
    pub collection_time: f64,
    pub max_bits: f64,
    pub resource_factor: f64,
    pub value: f64,
}

impl ResourceAssignment {
    fn idle(sensor: u32) -> Self {
        Self {
            sensor,
            mission: None,
            sub_priority: 0,
            imaged_region: None,
            collection_time: 0.0,
            max_bits: 0.0,
            resource_factor: 0.0,
            value: 0.0,
        }
    }

    /// A crisis placeholder has no points or area, but pointing the sensor at
    /// the region still costs the minimum dwell of one `seconds_per_point`.
    fn for_region(sensor: &Sensor, data: &RegionData, step_seconds: f64) -> Self {
        let Some(requirement) = data.most_valuable_requirement() else {
            return Self::idle(sensor.number);
        };
        let collection_time = sensor.collection_time(requirement.points, requirement.area_km2);
        let resource_factor = if step_seconds > 0.0 {
            (collection_time / step_seconds).min(1.0)
        } else {
            1.0
        };
        Self {
            sensor: sensor.number,
            mission: requirement.mission,
            sub_priority: if requirement.placeholder {
                0
            } else {
                requirement.sub_priority
            },
            imaged_region: Some(data.full_number),
            collection_time,
            max_bits: sensor.max_bits(collection_time),
            resource_factor,
            value: requirement.value(),
        }
    }

    fn to_record(&self) -> ResourceRecord {
        ResourceRecord {
            sensor: self.sensor,
            mission: self.mission,
            sub_priority: self.sub_priority,
            imaged_region: self.imaged_region.map(FullRegionNumber::as_f64),
            collection_time: self.collection_time,
            max_bits: self.max_bits,
            resource_factor: self.resource_factor,
        }
    }
}

/// Scored outcome of one platform at one time step.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTimelineElement {
    pub time_index: usize,
    pub score: f64,
    pub overflown_region: Option<FullRegionNumber>,
    pub crisis_level: u32,
    pub resources: Vec<ResourceAssignment>,
    pub most_valuable: Option<RegionData>,
}

impl ValueTimelineElement {
    /// Assign each sensor its most valuable region and score the step by the
    /// best assignment.
    pub fn build(
        time_index: usize,
        overflown_region: Option<FullRegionNumber>,
        crisis_level: u32,
        sensors: &[&Sensor],
        region_data: Vec<RegionData>,
        step_seconds: f64,
    ) -> Self {
        let resources: Vec<ResourceAssignment> = sensors
            .iter()
            .map(|sensor| {
                best_of(region_data.iter().filter(|data| data.sensor == sensor.number))
                    .map(|data| ResourceAssignment::for_region(sensor, data, step_seconds))
                    .unwrap_or_else(|| ResourceAssignment::idle(sensor.number))
            })
            .collect();
        let score = resources
            .iter()
            .map(|resource| resource.value)
            .fold(0.0, f64::max);
        let most_valuable = best_of(region_data.iter()).cloned();
        Self {
            time_index,
            score,
            overflown_region,
            crisis_level,
            resources,
            most_valuable,
        }
    }

    pub fn empty(time_index: usize, overflown_region: Option<FullRegionNumber>, sensors: &[&Sensor]) -> Self {
        Self::build(time_index, overflown_region, 0, sensors, Vec::new(), 0.0)
    }
}

fn best_of<'a>(candidates: impl Iterator<Item = &'a RegionData>) -> Option<&'a RegionData> {
    let mut best: Option<&RegionData> = None;
    for data in candidates {
        if best.map_or(true, |current| data.value() > current.value()) {
            best = Some(data);
        }
    }
    best
}

/// One platform's elements across the whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTimeline {
    pub platform: String,
    pub user: String,
    elements: Vec<ValueTimelineElement>,
    maximum_score: f64,
}

impl ValueTimeline {
    pub fn new(platform: impl Into<String>, user: impl Into<String>, elements: Vec<ValueTimelineElement>) -> Self {
        let maximum_score = elements
            .iter()
            .map(|element| element.score)
            .fold(0.0, f64::max);
        Self {
            platform: platform.into(),
            user: user.into(),
            elements,
            maximum_score,
        }
    }

    pub fn elements(&self) -> &[ValueTimelineElement] {
        &self.elements
    }

    pub fn element(&self, time_index: usize) -> &ValueTimelineElement {
        &self.elements[time_index]
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn maximum_score(&self) -> f64 {
        self.maximum_score
    }

    /// Score including the crisis bonus for the step's crisis level.
    pub fn objective_score(&self, time_index: usize, crises: &CrisisRegistry) -> f64 {
        let element = self.element(time_index);
        crises.objective_score(
            element.score,
            element.crisis_level,
            &self.user,
            self.maximum_score,
        )
    }

    pub fn to_records(&self) -> Vec<TimelineRecord> {
        self.elements
            .iter()
            .map(|element| TimelineRecord {
                user: self.user.clone(),
                time_index: element.time_index,
                overflown_region: element.overflown_region.map(FullRegionNumber::as_f64),
                score: element.score,
                crisis_level: element.crisis_level,
                resources: element
                    .resources
                    .iter()
                    .map(ResourceAssignment::to_record)
                    .collect(),
            })
            .collect()
    }

    pub fn to_platform_record(&self) -> PlatformTimelineRecord {
        PlatformTimelineRecord {
            platform: self.platform.clone(),
            user: self.user.clone(),
            maximum_score: self.maximum_score,
            records: self.to_records(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::access_pattern::{AccessPattern, PatternShape};
    use crate::cone_angle::ConeAngleData;
    use crate::crisis::{CrisisArea, CrisisAreaId};
    use crate::earth::RegionId;
    use crate::quality::QualityKind;
    use crate::requirements::Requirement;

    fn sensor(number: u32) -> Sensor {
        Sensor {
            number,
            name: format!("S{number}"),
            quality_kind: QualityKind::Gsd,
            reference_quality: 1.0,
            reference_range_km: 500.0,
            minimum_elevation: None,
            data_rate_bps: 1000.0,
            seconds_per_point: 6.0,
            area_rate_km2_per_s: 0.0,
            pattern: AccessPattern::new(
                ConeAngleData::from_radians(Some(0.2), &[]),
                PatternShape::Cone,
                false,
            ),
        }
    }

    fn data(region: u32, sensor: u32, score: f64, points: u32) -> RegionData {
        let full = FullRegionNumber::new(region, None);
        let mut data = RegionData::new(RegionId(region), full, sensor, None, false);
        data.add_requirement(
            Arc::new(Requirement {
                region: full,
                deck: 1,
                sensor,
                mission: Some(1),
                required_quality: 1.0,
                priority_rank: 1,
                priority_weight: 2.0,
                sub_priority: 4,
                score,
                area_km2: 0.0,
                points,
                placeholder: false,
            }),
            0.5,
            QualityKind::Gsd,
        );
        data
    }

    #[test]
    fn element_assigns_best_region_per_sensor() {
        let (one, two) = (sensor(1), sensor(2));
        let element = ValueTimelineElement::build(
            3,
            Some(FullRegionNumber::new(5, None)),
            0,
            &[&one, &two],
            vec![data(10, 1, 1.0, 1), data(11, 1, 3.0, 20), data(12, 2, 2.0, 2)],
            60.0,
        );
        assert_eq!(element.score, 6.0);
        let first = &element.resources[0];
        assert_eq!(first.imaged_region, Some(FullRegionNumber::new(11, None)));
        assert_eq!(first.collection_time, 120.0);
        assert_eq!(first.resource_factor, 1.0);
        assert_eq!(first.max_bits, 120_000.0);
        let second = &element.resources[1];
        assert_eq!(second.collection_time, 12.0);
        assert!((second.resource_factor - 0.2).abs() < 1e-12);
        assert_eq!(second.mission, Some(1));
        assert_eq!(
            element.most_valuable.as_ref().map(|data| data.full_number),
            Some(FullRegionNumber::new(11, None))
        );
    }

    #[test]
    fn idle_sensors_report_nothing() {
        let one = sensor(1);
        let element = ValueTimelineElement::empty(0, None, &[&one]);
        assert_eq!(element.score, 0.0);
        assert_eq!(element.resources[0].imaged_region, None);
        assert!(element.most_valuable.is_none());
    }

    #[test]
    fn maximum_score_and_objective() {
        let one = sensor(1);
        let elements = vec![
            ValueTimelineElement::build(0, None, 0, &[&one], vec![data(10, 1, 1.0, 1)], 60.0),
            ValueTimelineElement::build(1, None, 4, &[&one], vec![data(11, 1, 5.0, 1)], 60.0),
        ];
        let timeline = ValueTimeline::new("SAT-1", "ALPHA", elements);
        assert_eq!(timeline.maximum_score(), 10.0);

        let crises = CrisisRegistry::new(vec![CrisisArea {
            name: "Flood".to_string(),
            level: 4,
            regions: vec![11],
            users: vec![("ALPHA".to_string(), 0.5)],
        }]);
        assert_eq!(timeline.objective_score(0, &crises), 2.0);
        assert_eq!(timeline.objective_score(1, &crises), 15.0);

        let records = timeline.to_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].crisis_level, 4);
        assert_eq!(records[1].resources[0].imaged_region, Some(11.0));
    }

    #[test]
    fn crisis_placeholder_survives_into_element() {
        let one = sensor(1);
        let mut crisis = RegionData::new(
            RegionId(3),
            FullRegionNumber::new(3, None),
            1,
            Some(CrisisAreaId(0)),
            false,
        );
        crisis.apply_placeholder();
        let element = ValueTimelineElement::build(0, None, 1, &[&one], vec![crisis], 60.0);
        let resource = &element.resources[0];
        assert_eq!(resource.imaged_region, Some(FullRegionNumber::new(3, None)));
        assert_eq!(resource.mission, None);
        assert_eq!(resource.sub_priority, 0);
        assert_eq!(resource.collection_time, 6.0);
        assert_eq!(resource.max_bits, 6_000.0);
        assert!((resource.resource_factor - 0.1).abs() < 1e-12);
        assert_eq!(element.score, 0.0);
        assert!(element.most_valuable.is_some());
    }
}
