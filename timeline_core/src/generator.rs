//! Timeline generation.
//!
//! Each platform walks the clock independently. Per time step the pipeline
//! resolves the vehicle state, collects the regions every sensor can see,
//! matches requirements against achievable quality and finally builds the
//! step's [`ValueTimelineElement`]. Platforms run in parallel on rayon; the
//! shared registries in [`RunContext`] are only read.

use std::collections::HashSet;
use std::sync::Arc;

use rayon::prelude::*;

use crate::access_pattern::{AccessPatternError, AngleSelector};
use crate::crisis::CrisisAreaId;
use crate::earth::RegionId;
use crate::error::TimelineError;
use crate::geometry::VehicleState;
use crate::quality::CollectionGeometry;
use crate::region_data::RegionData;
use crate::requirements::RequirementKey;
use crate::scenario::{Platform, RunContext};
use crate::sensor::Sensor;
use crate::timeline::{ValueTimeline, ValueTimelineElement};

const TARGET: &str = "value_timeline::generator";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    PositionResolved,
    RegionsCollected,
    RequirementsMatched,
    ElementBuilt,
}

/// Regions one sensor sees at one step.
#[derive(Debug, Default)]
struct SensorView {
    normal: Vec<RegionId>,
    crisis: Vec<RegionId>,
}

pub struct TimelineGenerator<'a> {
    context: &'a RunContext,
}

impl<'a> TimelineGenerator<'a> {
    pub fn new(context: &'a RunContext) -> Self {
        Self { context }
    }

    /// Timelines for every platform, in scenario order. The first error
    /// aborts the run.
    pub fn generate_all(&self) -> Result<Vec<ValueTimeline>, TimelineError> {
        self.context
            .scenario
            .platforms
            .par_iter()
            .map(|platform| self.generate(platform))
            .collect()
    }

    pub fn generate(&self, platform: &Platform) -> Result<ValueTimeline, TimelineError> {
        let sensors = self.platform_sensors(platform)?;
        let crisis_user = self.context.crises.user_has_membership(&platform.user);
        if crisis_user {
            if let Some(sensor) = sensors
                .iter()
                .find(|sensor| !sensor.pattern.has_symmetric_crisis_cones())
            {
                return Err(TimelineError::AsymmetricCrisisCones {
                    sensor: sensor.number,
                    user: platform.user.clone(),
                });
            }
        }

        let elements = (0..self.context.scenario.clock.time_steps)
            .map(|time_index| self.step(platform, &sensors, time_index, crisis_user))
            .collect::<Result<Vec<_>, _>>()?;
        let timeline = ValueTimeline::new(&platform.name, &platform.user, elements);

        tracing::info!(
            target: TARGET,
            platform = %platform.name,
            user = %platform.user,
            steps = timeline.len(),
            maximum_score = timeline.maximum_score(),
            "timeline.generated"
        );
        Ok(timeline)
    }

    fn platform_sensors(&self, platform: &Platform) -> Result<Vec<&'a Sensor>, TimelineError> {
        platform
            .sensors
            .iter()
            .map(|number| {
                self.context
                    .catalog
                    .sensor(*number)
                    .ok_or_else(|| TimelineError::MissingSensor {
                        platform: platform.name.clone(),
                        sensor: *number,
                    })
            })
            .collect()
    }

    fn step(
        &self,
        platform: &Platform,
        sensors: &[&'a Sensor],
        time_index: usize,
        crisis_user: bool,
    ) -> Result<ValueTimelineElement, TimelineError> {
        let context = self.context;
        let index = &context.index;
        let clock = context.scenario.clock;

        let state = platform
            .ephemeris
            .state(time_index, clock.elapsed(time_index));
        let overflown = index
            .region_at(state.subpoint())
            .map(|id| index.region(id).full_number());
        trace_stage(platform, time_index, GenerationStage::PositionResolved, 0);

        let views = sensors
            .iter()
            .map(|sensor| self.collect_view(platform, sensor, &state, crisis_user))
            .collect::<Result<Vec<_>, _>>()?;
        let crisis_area = if crisis_user {
            context.crises.most_valuable(
                views
                    .iter()
                    .flat_map(|view| view.crisis.iter())
                    .map(|id| index.region(*id).number()),
                &platform.user,
            )
        } else {
            None
        };
        let crisis_level = crisis_area
            .map(|id| context.crises.area(id).level)
            .unwrap_or(0);
        trace_stage(
            platform,
            time_index,
            GenerationStage::RegionsCollected,
            views.iter().map(|view| view.normal.len() + view.crisis.len()).sum(),
        );

        let mut region_data = Vec::new();
        for (sensor, view) in sensors.iter().zip(&views) {
            self.match_view(platform, sensor, &state, view, crisis_area, &mut region_data)?;
        }
        trace_stage(
            platform,
            time_index,
            GenerationStage::RequirementsMatched,
            region_data.len(),
        );

        let element = ValueTimelineElement::build(
            time_index,
            overflown,
            crisis_level,
            sensors,
            region_data,
            clock.step_seconds,
        );
        trace_stage(platform, time_index, GenerationStage::ElementBuilt, element.resources.len());
        Ok(element)
    }

    fn collect_view(
        &self,
        platform: &Platform,
        sensor: &Sensor,
        state: &VehicleState,
        crisis_user: bool,
    ) -> Result<SensorView, TimelineError> {
        let index = &self.context.index;
        let include_partial = self.context.scenario.settings.include_partial_regions;
        let pattern_error = |source: AccessPatternError| TimelineError::Pattern {
            sensor: sensor.number,
            platform: platform.name.clone(),
            user: platform.user.clone(),
            source,
        };

        let selector = if platform.revisit {
            AngleSelector::Revisit
        } else {
            AngleSelector::Largest
        };
        let eligible = |id: &RegionId| {
            let region = index.region(*id);
            (!platform.revisit || region.is_revisit_eligible())
                && platform
                    .service_tier
                    .map_or(true, |tier| region.access_level(tier) > 0)
        };
        let mut normal = sensor
            .pattern
            .contained_regions(index, state, selector, include_partial)
            .map_err(pattern_error)?;
        normal.retain(eligible);

        // The crisis cone widens what the platform sees, not what it may image.
        let mut crisis = if crisis_user {
            sensor
                .pattern
                .contained_regions(index, state, AngleSelector::Crisis, include_partial)
                .map_err(pattern_error)?
        } else {
            Vec::new()
        };
        crisis.retain(eligible);
        Ok(SensorView { normal, crisis })
    }

    fn match_view(
        &self,
        platform: &Platform,
        sensor: &Sensor,
        state: &VehicleState,
        view: &SensorView,
        crisis_area: Option<CrisisAreaId>,
        out: &mut Vec<RegionData>,
    ) -> Result<(), TimelineError> {
        let context = self.context;
        let index = &context.index;
        let track_quality = context.scenario.settings.track_target_quality;
        let crisis_view: HashSet<RegionId> = view.crisis.iter().copied().collect();
        let crisis_for = |id: RegionId| {
            crisis_area.filter(|area| {
                crisis_view.contains(&id)
                    && context.crises.area(*area).contains_region(index.region(id).number())
            })
        };

        for &id in &view.normal {
            let region = index.region(id);
            let mut data = RegionData::new(
                id,
                region.full_number(),
                sensor.number,
                crisis_for(id),
                track_quality,
            );
            self.match_requirements(platform, sensor, state, &mut data)?;
            data.apply_placeholder();
            if data.is_valid() {
                out.push(data);
            }
        }

        let normal: HashSet<RegionId> = view.normal.iter().copied().collect();
        for &id in view.crisis.iter().filter(|id| !normal.contains(id)) {
            let Some(area) = crisis_for(id) else {
                continue;
            };
            let mut data = RegionData::new(
                id,
                index.region(id).full_number(),
                sensor.number,
                Some(area),
                track_quality,
            );
            self.match_requirements(platform, sensor, state, &mut data)?;
            data.apply_placeholder();
            out.push(data);
        }
        Ok(())
    }

    fn match_requirements(
        &self,
        platform: &Platform,
        sensor: &Sensor,
        state: &VehicleState,
        data: &mut RegionData,
    ) -> Result<(), TimelineError> {
        let context = self.context;
        let key = RequirementKey {
            region: data.full_number,
            deck: platform.deck,
            sensor: sensor.number,
        };
        let candidates = context.requirements.get(&key);
        if candidates.is_empty() {
            return Ok(());
        }

        let target = context.index.region(data.region).center().surface_position();
        let geometry = CollectionGeometry::new(target, *state);
        let Some(quality) = context.quality.evaluate(sensor, &geometry) else {
            return Ok(());
        };

        for requirement in candidates {
            if requirement.score <= 0.0
                || !sensor
                    .quality_kind
                    .satisfies(quality, requirement.required_quality)
            {
                continue;
            }
            let Some(mission) = requirement
                .mission
                .and_then(|mission| context.catalog.mission(mission))
            else {
                continue;
            };
            let inside = sensor
                .pattern
                .inside_access_pattern(mission, target, state)
                .map_err(|source| TimelineError::Pattern {
                    sensor: sensor.number,
                    platform: platform.name.clone(),
                    user: platform.user.clone(),
                    source,
                })?;
            if inside {
                data.add_requirement(Arc::clone(requirement), quality, sensor.quality_kind);
            }
        }
        Ok(())
    }
}

fn trace_stage(platform: &Platform, time_index: usize, stage: GenerationStage, count: usize) {
    tracing::trace!(
        target: TARGET,
        platform = %platform.name,
        time_index,
        stage = ?stage,
        count,
        "timeline.stage"
    );
}
