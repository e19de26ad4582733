use thiserror::Error;

use crate::access_pattern::AccessPatternError;
use crate::crisis::CrisisConfigError;
use crate::region_config::RegionTableError;
use crate::requirements::RequirementDeckError;
use crate::scenario::ScenarioConfigError;
use crate::sensor::SensorCatalogError;

/// Any failure that aborts a generation run.
#[derive(Debug, Error)]
pub enum TimelineError {
    #[error(transparent)]
    RegionTable(#[from] RegionTableError),
    #[error(transparent)]
    SensorCatalog(#[from] SensorCatalogError),
    #[error(transparent)]
    Crisis(#[from] CrisisConfigError),
    #[error(transparent)]
    RequirementDeck(#[from] RequirementDeckError),
    #[error(transparent)]
    Scenario(#[from] ScenarioConfigError),
    #[error("sensor {sensor} on platform {platform} (user {user}): {source}")]
    Pattern {
        sensor: u32,
        platform: String,
        user: String,
        #[source]
        source: AccessPatternError,
    },
    #[error(
        "sensor {sensor} (user {user}): crisis override on the outer cone and inner cone must match"
    )]
    AsymmetricCrisisCones { sensor: u32, user: String },
    #[error("platform {platform} references sensor {sensor} missing from the catalog")]
    MissingSensor { platform: String, sensor: u32 },
    #[error("generation system did not run")]
    NotGenerated,
}
