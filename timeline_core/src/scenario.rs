//! Scenario loading: the simulation clock, generation settings and the
//! platforms to generate timelines for, bundled with the shared registries
//! into a [`RunContext`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{fs, io};

use bevy::prelude::Resource;
use thiserror::Error;
use timeline_schema::{
    CrisisBlock, EphemerisBlock, GenerationSettingsBlock, PlatformBlock, RegionTableBlock,
    RequirementDeckBlock, ScenarioBlock, SensorCatalogBlock,
};

use crate::crisis::CrisisRegistry;
use crate::earth::SpatialIndex;
use crate::ephemeris::{CircularOrbit, Ephemeris, GroundSite, StateTrack};
use crate::error::TimelineError;
use crate::geometry::GeoPoint;
use crate::quality::{QualityModel, SlantRangeQuality};
use crate::requirements::RequirementMap;
use crate::sensor::SensorCatalog;

#[derive(Debug, Error)]
pub enum ScenarioConfigError {
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read scenario from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("step length {value} must be positive")]
    InvalidStep { value: f64 },
    #[error("duplicate platform name {platform}")]
    DuplicatePlatform { platform: String },
    #[error("platform {platform} carries no sensors")]
    NoSensors { platform: String },
    #[error("platform {platform} references unknown sensor {sensor}")]
    UnknownSensor { platform: String, sensor: u32 },
    #[error("platform {platform}: track has {found} states but the run needs {expected}")]
    TrackTooShort {
        platform: String,
        expected: usize,
        found: usize,
    },
    #[error("platform {platform}: invalid orbit ({reason})")]
    InvalidOrbit {
        platform: String,
        reason: &'static str,
    },
    #[error("platform {platform}: service tier {tier} exceeds the table's {count} tiers")]
    ServiceTierOutOfRange {
        platform: String,
        tier: usize,
        count: usize,
    },
}

/// Uniform step clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationClock {
    pub step_seconds: f64,
    pub time_steps: usize,
}

impl SimulationClock {
    pub fn elapsed(&self, time_index: usize) -> f64 {
        time_index as f64 * self.step_seconds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GenerationSettings {
    pub include_partial_regions: bool,
    pub track_target_quality: bool,
}

impl From<GenerationSettingsBlock> for GenerationSettings {
    fn from(block: GenerationSettingsBlock) -> Self {
        Self {
            include_partial_regions: block.include_partial_regions,
            track_target_quality: block.track_target_quality,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Platform {
    pub name: String,
    pub user: String,
    pub deck: u32,
    pub sensors: Vec<u32>,
    pub service_tier: Option<usize>,
    pub revisit: bool,
    pub ephemeris: Arc<dyn Ephemeris>,
}

impl Platform {
    fn from_block(
        block: &PlatformBlock,
        clock: &SimulationClock,
        catalog: &SensorCatalog,
        service_tier_count: usize,
    ) -> Result<Self, ScenarioConfigError> {
        let platform = || block.name.clone();
        if block.sensors.is_empty() {
            return Err(ScenarioConfigError::NoSensors {
                platform: platform(),
            });
        }
        if let Some(sensor) = block
            .sensors
            .iter()
            .copied()
            .find(|number| catalog.sensor(*number).is_none())
        {
            return Err(ScenarioConfigError::UnknownSensor {
                platform: platform(),
                sensor,
            });
        }
        if let Some(tier) = block.service_tier {
            if tier >= service_tier_count {
                return Err(ScenarioConfigError::ServiceTierOutOfRange {
                    platform: platform(),
                    tier,
                    count: service_tier_count,
                });
            }
        }

        let ephemeris: Arc<dyn Ephemeris> = match &block.ephemeris {
            EphemerisBlock::Track { states } => {
                if states.len() < clock.time_steps {
                    return Err(ScenarioConfigError::TrackTooShort {
                        platform: platform(),
                        expected: clock.time_steps,
                        found: states.len(),
                    });
                }
                Arc::new(StateTrack::from_records(states))
            }
            EphemerisBlock::CircularOrbit {
                altitude_km,
                inclination_deg,
                raan_deg,
                argument_of_latitude_deg,
            } => {
                if !altitude_km.is_finite() || *altitude_km <= 0.0 {
                    return Err(ScenarioConfigError::InvalidOrbit {
                        platform: platform(),
                        reason: "altitude must be positive",
                    });
                }
                if !(0.0..=180.0).contains(inclination_deg) {
                    return Err(ScenarioConfigError::InvalidOrbit {
                        platform: platform(),
                        reason: "inclination must be within [0, 180] degrees",
                    });
                }
                Arc::new(CircularOrbit::new(
                    *altitude_km,
                    inclination_deg.to_radians(),
                    raan_deg.to_radians(),
                    argument_of_latitude_deg.to_radians(),
                ))
            }
            EphemerisBlock::GroundSite {
                latitude_deg,
                longitude_deg,
                altitude_km,
            } => Arc::new(GroundSite::new(
                GeoPoint::from_degrees(*latitude_deg, *longitude_deg),
                *altitude_km,
            )),
        };

        Ok(Self {
            name: block.name.clone(),
            user: block.user.clone(),
            deck: block.deck,
            sensors: block.sensors.clone(),
            service_tier: block.service_tier,
            revisit: block.revisit,
            ephemeris,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub clock: SimulationClock,
    pub settings: GenerationSettings,
    pub platforms: Vec<Platform>,
}

impl Scenario {
    pub fn from_block(
        block: &ScenarioBlock,
        catalog: &SensorCatalog,
        service_tier_count: usize,
    ) -> Result<Self, ScenarioConfigError> {
        if !block.step_seconds.is_finite() || block.step_seconds <= 0.0 {
            return Err(ScenarioConfigError::InvalidStep {
                value: block.step_seconds,
            });
        }
        let clock = SimulationClock {
            step_seconds: block.step_seconds,
            time_steps: block.time_steps,
        };
        let mut names = HashSet::new();
        let mut platforms = Vec::with_capacity(block.platforms.len());
        for entry in &block.platforms {
            if !names.insert(entry.name.as_str()) {
                return Err(ScenarioConfigError::DuplicatePlatform {
                    platform: entry.name.clone(),
                });
            }
            platforms.push(Platform::from_block(
                entry,
                &clock,
                catalog,
                service_tier_count,
            )?);
        }
        Ok(Self {
            clock,
            settings: block.settings.into(),
            platforms,
        })
    }

    pub fn from_json_str(
        json: &str,
        catalog: &SensorCatalog,
        service_tier_count: usize,
    ) -> Result<Self, ScenarioConfigError> {
        let block: ScenarioBlock = serde_json::from_str(json)?;
        Self::from_block(&block, catalog, service_tier_count)
    }

    pub fn from_file(
        path: &Path,
        catalog: &SensorCatalog,
        service_tier_count: usize,
    ) -> Result<Self, ScenarioConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ScenarioConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents, catalog, service_tier_count)
    }
}

/// Everything generation reads, built once and shared by every platform.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub index: Arc<SpatialIndex>,
    pub catalog: Arc<SensorCatalog>,
    pub crises: Arc<CrisisRegistry>,
    pub requirements: Arc<RequirementMap>,
    pub scenario: Scenario,
    pub quality: Arc<dyn QualityModel>,
}

impl RunContext {
    pub fn new(
        index: Arc<SpatialIndex>,
        catalog: Arc<SensorCatalog>,
        crises: Arc<CrisisRegistry>,
        requirements: Arc<RequirementMap>,
        scenario: Scenario,
    ) -> Self {
        Self {
            index,
            catalog,
            crises,
            requirements,
            scenario,
            quality: Arc::new(SlantRangeQuality),
        }
    }

    /// Validate and resolve every raw input block, in dependency order.
    pub fn from_inputs(
        regions: &RegionTableBlock,
        sensors: &SensorCatalogBlock,
        crises: &CrisisBlock,
        deck: &RequirementDeckBlock,
        scenario: &ScenarioBlock,
    ) -> Result<Self, TimelineError> {
        let index = SpatialIndex::build(regions)?;
        let catalog = SensorCatalog::from_block(sensors)?;
        let crises = CrisisRegistry::from_block(crises)?;
        let requirements = RequirementMap::from_block(deck, &index, &catalog)?;
        let scenario = Scenario::from_block(scenario, &catalog, index.service_tier_count())?;
        Ok(Self::new(
            Arc::new(index),
            Arc::new(catalog),
            Arc::new(crises),
            Arc::new(requirements),
            scenario,
        ))
    }

    pub fn with_quality_model(mut self, quality: Arc<dyn QualityModel>) -> Self {
        self.quality = quality;
        self
    }
}

/// Bevy handle for a shared run context.
#[derive(Resource, Debug, Clone)]
pub struct RunContextHandle(pub Arc<RunContext>);

impl RunContextHandle {
    pub fn new(context: Arc<RunContext>) -> Self {
        Self(context)
    }

    pub fn get(&self) -> Arc<RunContext> {
        Arc::clone(&self.0)
    }
}
