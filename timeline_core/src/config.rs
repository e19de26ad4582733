//! Input loading.
//!
//! Every input document has a builtin demo copy compiled into the crate. An
//! environment variable (or an explicit path from the command line) swaps in a
//! file instead; a file that cannot be read or parsed fails the run rather
//! than silently falling back to the builtin.

use std::path::{Path, PathBuf};
use std::{env, fs, io};

use serde::de::DeserializeOwned;
use timeline_schema::{
    CrisisBlock, RegionTableBlock, RequirementDeckBlock, ScenarioBlock, SensorCatalogBlock,
};

use crate::crisis::CrisisConfigError;
use crate::error::TimelineError;
use crate::region_config::RegionTableError;
use crate::requirements::RequirementDeckError;
use crate::scenario::{RunContext, ScenarioConfigError};
use crate::sensor::SensorCatalogError;

pub const BUILTIN_REGION_TABLE: &str = include_str!("data/region_table.json");
pub const BUILTIN_SENSOR_CATALOG: &str = include_str!("data/sensor_catalog.json");
pub const BUILTIN_CRISIS_CONFIG: &str = include_str!("data/crisis_config.json");
pub const BUILTIN_REQUIREMENT_DECK: &str = include_str!("data/requirement_deck.json");
pub const BUILTIN_SCENARIO: &str = include_str!("data/scenario.json");

pub const REGION_TABLE_ENV: &str = "VALUE_REGION_TABLE_PATH";
pub const SENSOR_CATALOG_ENV: &str = "VALUE_SENSOR_CATALOG_PATH";
pub const CRISIS_CONFIG_ENV: &str = "VALUE_CRISIS_CONFIG_PATH";
pub const REQUIREMENT_DECK_ENV: &str = "VALUE_REQUIREMENT_DECK_PATH";
pub const SCENARIO_ENV: &str = "VALUE_SCENARIO_PATH";

const TARGET: &str = "value_timeline::config";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Builtin,
    File(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::Builtin => None,
            ConfigSource::File(path) => Some(path),
        }
    }
}

/// Optional file locations for each input. `None` selects the builtin copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputPaths {
    pub region_table: Option<PathBuf>,
    pub sensor_catalog: Option<PathBuf>,
    pub crisis_config: Option<PathBuf>,
    pub requirement_deck: Option<PathBuf>,
    pub scenario: Option<PathBuf>,
}

impl InputPaths {
    pub fn from_env() -> Self {
        let var = |name: &str| env::var_os(name).map(PathBuf::from);
        Self {
            region_table: var(REGION_TABLE_ENV),
            sensor_catalog: var(SENSOR_CATALOG_ENV),
            crisis_config: var(CRISIS_CONFIG_ENV),
            requirement_deck: var(REQUIREMENT_DECK_ENV),
            scenario: var(SCENARIO_ENV),
        }
    }

    /// Paths set in `other` take precedence.
    pub fn overridden_by(self, other: InputPaths) -> Self {
        Self {
            region_table: other.region_table.or(self.region_table),
            sensor_catalog: other.sensor_catalog.or(self.sensor_catalog),
            crisis_config: other.crisis_config.or(self.crisis_config),
            requirement_deck: other.requirement_deck.or(self.requirement_deck),
            scenario: other.scenario.or(self.scenario),
        }
    }
}

/// Which source each input came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSources {
    pub region_table: ConfigSource,
    pub sensor_catalog: ConfigSource,
    pub crisis_config: ConfigSource,
    pub requirement_deck: ConfigSource,
    pub scenario: ConfigSource,
}

/// Raw input documents for one run.
#[derive(Debug, Clone)]
pub struct InputBundle {
    pub regions: RegionTableBlock,
    pub sensors: SensorCatalogBlock,
    pub crises: CrisisBlock,
    pub deck: RequirementDeckBlock,
    pub scenario: ScenarioBlock,
    pub sources: InputSources,
}

impl InputBundle {
    pub fn builtin() -> Self {
        Self {
            regions: serde_json::from_str(BUILTIN_REGION_TABLE)
                .expect("builtin region table should parse"),
            sensors: serde_json::from_str(BUILTIN_SENSOR_CATALOG)
                .expect("builtin sensor catalog should parse"),
            crises: serde_json::from_str(BUILTIN_CRISIS_CONFIG)
                .expect("builtin crisis config should parse"),
            deck: serde_json::from_str(BUILTIN_REQUIREMENT_DECK)
                .expect("builtin requirement deck should parse"),
            scenario: serde_json::from_str(BUILTIN_SCENARIO)
                .expect("builtin scenario should parse"),
            sources: InputSources {
                region_table: ConfigSource::Builtin,
                sensor_catalog: ConfigSource::Builtin,
                crisis_config: ConfigSource::Builtin,
                requirement_deck: ConfigSource::Builtin,
                scenario: ConfigSource::Builtin,
            },
        }
    }

    pub fn load(paths: &InputPaths) -> Result<Self, TimelineError> {
        let (regions, region_source) = load_block(
            "region_table",
            paths.region_table.as_deref(),
            BUILTIN_REGION_TABLE,
            |path, source| RegionTableError::Read { path, source },
        )?;
        let (sensors, sensor_source) = load_block(
            "sensor_catalog",
            paths.sensor_catalog.as_deref(),
            BUILTIN_SENSOR_CATALOG,
            |path, source| SensorCatalogError::Read { path, source },
        )?;
        let (crises, crisis_source) = load_block(
            "crisis_config",
            paths.crisis_config.as_deref(),
            BUILTIN_CRISIS_CONFIG,
            |path, source| CrisisConfigError::Read { path, source },
        )?;
        let (deck, deck_source) = load_block(
            "requirement_deck",
            paths.requirement_deck.as_deref(),
            BUILTIN_REQUIREMENT_DECK,
            |path, source| RequirementDeckError::Read { path, source },
        )?;
        let (scenario, scenario_source) = load_block(
            "scenario",
            paths.scenario.as_deref(),
            BUILTIN_SCENARIO,
            |path, source| ScenarioConfigError::Read { path, source },
        )?;
        Ok(Self {
            regions,
            sensors,
            crises,
            deck,
            scenario,
            sources: InputSources {
                region_table: region_source,
                sensor_catalog: sensor_source,
                crisis_config: crisis_source,
                requirement_deck: deck_source,
                scenario: scenario_source,
            },
        })
    }

    pub fn load_from_env() -> Result<Self, TimelineError> {
        Self::load(&InputPaths::from_env())
    }

    /// Validate the documents and build the shared run context.
    pub fn build_context(&self) -> Result<RunContext, TimelineError> {
        RunContext::from_inputs(
            &self.regions,
            &self.sensors,
            &self.crises,
            &self.deck,
            &self.scenario,
        )
    }
}

fn load_block<T, E>(
    name: &'static str,
    path: Option<&Path>,
    builtin: &str,
    read_error: impl FnOnce(PathBuf, io::Error) -> E,
) -> Result<(T, ConfigSource), E>
where
    T: DeserializeOwned,
    E: From<serde_json::Error>,
{
    let Some(path) = path else {
        let block = serde_json::from_str(builtin)?;
        tracing::info!(target: TARGET, config = name, "config.loaded=builtin");
        return Ok((block, ConfigSource::Builtin));
    };
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(source) => {
            tracing::warn!(
                target: TARGET,
                config = name,
                path = %path.display(),
                error = %source,
                "config.load_failed"
            );
            return Err(read_error(path.to_path_buf(), source));
        }
    };
    let block = serde_json::from_str(&contents)?;
    tracing::info!(
        target: TARGET,
        config = name,
        path = %path.display(),
        "config.loaded=file"
    );
    Ok((block, ConfigSource::File(path.to_path_buf())))
}
