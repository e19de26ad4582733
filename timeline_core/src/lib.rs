//! Value timeline generation for a fleet of sensing platforms.
//!
//! Given a region partition of the globe, a sensor catalog, crisis areas, a
//! requirement deck and a scenario, the engine scores what every platform can
//! collect at every time step. [`build_generation_app`] wires the pipeline into
//! a headless Bevy [`App`]; [`run_generation`] drives one pass of it.

pub mod access_pattern;
pub mod config;
pub mod cone_angle;
pub mod crisis;
pub mod earth;
pub mod ephemeris;
mod error;
pub mod generator;
pub mod geometry;
pub mod metrics;
pub mod quality;
pub mod region_config;
pub mod region_data;
pub mod requirements;
pub mod scenario;
pub mod sensor;
pub mod timeline;

use std::sync::Arc;

use bevy::prelude::*;

pub use access_pattern::{AccessPattern, AccessPatternError, AngleSelector, ConeSide, PatternShape};
pub use config::{ConfigSource, InputBundle, InputPaths, InputSources};
pub use cone_angle::{ConeAngleData, CRISIS_TAG, REVISIT_TAG};
pub use crisis::{CrisisArea, CrisisAreaId, CrisisConfigError, CrisisRegistry};
pub use earth::{FullRegionNumber, Region, RegionFlags, RegionId, SpatialIndex};
pub use ephemeris::{CircularOrbit, Ephemeris, GroundSite, StateTrack};
pub use error::TimelineError;
pub use generator::{GenerationStage, TimelineGenerator};
pub use geometry::{GeoPoint, VehicleState};
pub use metrics::GenerationSummary;
pub use quality::{CollectionGeometry, QualityKind, QualityModel, SlantRangeQuality};
pub use region_config::RegionTableError;
pub use region_data::RegionData;
pub use requirements::{Requirement, RequirementDeckError, RequirementKey, RequirementMap};
pub use scenario::{
    GenerationSettings, Platform, RunContext, RunContextHandle, Scenario, ScenarioConfigError,
    SimulationClock,
};
pub use sensor::{Sensor, SensorCatalog, SensorCatalogError};
pub use timeline::{ResourceAssignment, ValueTimeline, ValueTimelineElement};

/// Output slot filled by the generation system.
#[derive(Resource, Default, Debug)]
pub struct GeneratedTimelines(Option<Result<Vec<ValueTimeline>, TimelineError>>);

impl GeneratedTimelines {
    pub fn result(&self) -> Option<&Result<Vec<ValueTimeline>, TimelineError>> {
        self.0.as_ref()
    }

    pub fn take(&mut self) -> Option<Result<Vec<ValueTimeline>, TimelineError>> {
        self.0.take()
    }
}

fn generate_timelines(context: Res<RunContextHandle>, mut generated: ResMut<GeneratedTimelines>) {
    let context = context.get();
    let result = TimelineGenerator::new(&context).generate_all();
    if let Err(err) = &result {
        tracing::error!(
            target: "value_timeline::generator",
            error = %err,
            "timeline.generation_failed"
        );
    }
    generated.0 = Some(result);
}

/// Construct a Bevy [`App`] that generates every platform's timeline for
/// `context` on each update.
pub fn build_generation_app(context: Arc<RunContext>) -> App {
    let mut app = App::new();

    app.insert_resource(RunContextHandle::new(context))
        .insert_resource(GeneratedTimelines::default())
        .insert_resource(GenerationSummary::default())
        .add_plugins(MinimalPlugins)
        .add_systems(
            Update,
            (generate_timelines, metrics::collect_generation_summary).chain(),
        );

    app
}

/// Run one generation pass and hand back its timelines.
pub fn run_generation(app: &mut App) -> Result<Vec<ValueTimeline>, TimelineError> {
    app.update();
    app.world
        .resource_mut::<GeneratedTimelines>()
        .take()
        .unwrap_or(Err(TimelineError::NotGenerated))
}
