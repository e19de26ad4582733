//! Sensor catalog: the mission list and every sensor a platform may carry.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::{fs, io};

use bevy::prelude::Resource;
use thiserror::Error;
use timeline_schema::{SensorBlock, SensorCatalogBlock};

use crate::access_pattern::{AccessPattern, AccessPatternError};
use crate::cone_angle::{CRISIS_TAG, REVISIT_TAG};
use crate::quality::QualityKind;

#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    pub number: u32,
    pub name: String,
    pub quality_kind: QualityKind,
    pub reference_quality: f64,
    pub reference_range_km: f64,
    /// Radians.
    pub minimum_elevation: Option<f64>,
    pub data_rate_bps: f64,
    pub seconds_per_point: f64,
    pub area_rate_km2_per_s: f64,
    pub pattern: AccessPattern,
}

impl Sensor {
    fn from_block(block: &SensorBlock) -> Result<Self, SensorCatalogError> {
        let checks = [
            ("reference_range_km", block.reference_range_km, block.reference_range_km > 0.0),
            ("data_rate_bps", block.data_rate_bps, block.data_rate_bps >= 0.0),
            ("seconds_per_point", block.seconds_per_point, block.seconds_per_point > 0.0),
            (
                "area_rate_km2_per_s",
                block.area_rate_km2_per_s,
                block.area_rate_km2_per_s >= 0.0,
            ),
        ];
        for (field, value, ok) in checks {
            if !ok || !value.is_finite() {
                return Err(SensorCatalogError::InvalidParameter {
                    sensor: block.number,
                    field,
                    value,
                });
            }
        }
        let minimum_elevation = match block.minimum_elevation_deg {
            Some(degrees) if !(0.0..=90.0).contains(&degrees) => {
                return Err(SensorCatalogError::InvalidParameter {
                    sensor: block.number,
                    field: "minimum_elevation_deg",
                    value: degrees,
                });
            }
            other => other.map(f64::to_radians),
        };
        let pattern = AccessPattern::from_block(&block.access_pattern).map_err(|source| {
            SensorCatalogError::Pattern {
                sensor: block.number,
                source,
            }
        })?;
        Ok(Self {
            number: block.number,
            name: block.name.clone(),
            quality_kind: block.quality_kind.into(),
            reference_quality: block.reference_quality,
            reference_range_km: block.reference_range_km,
            minimum_elevation,
            data_rate_bps: block.data_rate_bps,
            seconds_per_point: block.seconds_per_point,
            area_rate_km2_per_s: block.area_rate_km2_per_s,
            pattern,
        })
    }

    /// Seconds needed to collect `points` point targets plus `area_km2` of
    /// area coverage. Never less than a single point's dwell.
    pub fn collection_time(&self, points: u32, area_km2: f64) -> f64 {
        let mut seconds = self.seconds_per_point * points as f64;
        if self.area_rate_km2_per_s > 0.0 && area_km2 > 0.0 {
            seconds += area_km2 / self.area_rate_km2_per_s;
        }
        seconds.max(self.seconds_per_point)
    }

    pub fn max_bits(&self, collection_time: f64) -> f64 {
        self.data_rate_bps * collection_time
    }
}

#[derive(Debug, Error)]
pub enum SensorCatalogError {
    #[error("failed to parse sensor catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read sensor catalog from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("sensor {sensor}: invalid access pattern: {source}")]
    Pattern {
        sensor: u32,
        #[source]
        source: AccessPatternError,
    },
    #[error("sensor {sensor}: {field} has invalid value {value}")]
    InvalidParameter {
        sensor: u32,
        field: &'static str,
        value: f64,
    },
    #[error("duplicate sensor number {sensor}")]
    DuplicateSensor { sensor: u32 },
    #[error("duplicate mission tag {mission}")]
    DuplicateMission { mission: String },
    #[error("mission tag {mission} is reserved")]
    ReservedMission { mission: String },
}

#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct SensorCatalog {
    missions: Vec<String>,
    sensors: Vec<Sensor>,
}

impl SensorCatalog {
    pub fn new(missions: Vec<String>, sensors: Vec<Sensor>) -> Self {
        Self { missions, sensors }
    }

    pub fn from_block(block: &SensorCatalogBlock) -> Result<Self, SensorCatalogError> {
        let mut seen_missions = HashSet::new();
        for mission in &block.missions {
            if mission == REVISIT_TAG || mission == CRISIS_TAG {
                return Err(SensorCatalogError::ReservedMission {
                    mission: mission.clone(),
                });
            }
            if !seen_missions.insert(mission.as_str()) {
                return Err(SensorCatalogError::DuplicateMission {
                    mission: mission.clone(),
                });
            }
        }

        let mut seen_sensors = HashSet::new();
        let mut sensors = Vec::with_capacity(block.sensors.len());
        for entry in &block.sensors {
            if !seen_sensors.insert(entry.number) {
                return Err(SensorCatalogError::DuplicateSensor {
                    sensor: entry.number,
                });
            }
            sensors.push(Sensor::from_block(entry)?);
        }
        Ok(Self {
            missions: block.missions.clone(),
            sensors,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, SensorCatalogError> {
        let block: SensorCatalogBlock = serde_json::from_str(json)?;
        Self::from_block(&block)
    }

    pub fn from_file(path: &Path) -> Result<Self, SensorCatalogError> {
        let contents = fs::read_to_string(path).map_err(|source| SensorCatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn missions(&self) -> &[String] {
        &self.missions
    }

    pub fn mission(&self, index: usize) -> Option<&str> {
        self.missions.get(index).map(String::as_str)
    }

    pub fn mission_index(&self, tag: &str) -> Option<usize> {
        self.missions.iter().position(|mission| mission == tag)
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn sensor(&self, number: u32) -> Option<&Sensor> {
        self.sensors.iter().find(|sensor| sensor.number == number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "missions": ["IMINT", "SIGINT"],
        "sensors": [
            {
                "number": 1,
                "name": "EO",
                "quality_kind": "GSD",
                "reference_quality": 0.5,
                "reference_range_km": 600.0,
                "minimum_elevation_deg": 15.0,
                "data_rate_bps": 2000000.0,
                "seconds_per_point": 4.0,
                "area_rate_km2_per_s": 100.0,
                "access_pattern": {
                    "kind": "CONE",
                    "outer": {"default_deg": 20.0, "overrides": []}
                }
            }
        ]
    }"#;

    #[test]
    fn parses_catalog() {
        let catalog = SensorCatalog::from_json_str(CATALOG).unwrap();
        assert_eq!(catalog.mission_index("SIGINT"), Some(1));
        assert_eq!(catalog.mission(0), Some("IMINT"));
        let sensor = catalog.sensor(1).unwrap();
        assert_eq!(sensor.quality_kind, QualityKind::Gsd);
        assert!((sensor.minimum_elevation.unwrap() - 15f64.to_radians()).abs() < 1e-12);
        assert!(catalog.sensor(2).is_none());
    }

    #[test]
    fn collection_time_combines_points_and_area() {
        let catalog = SensorCatalog::from_json_str(CATALOG).unwrap();
        let sensor = catalog.sensor(1).unwrap();
        assert_eq!(sensor.collection_time(3, 500.0), 17.0);
        assert_eq!(sensor.collection_time(0, 0.0), 4.0);
        assert_eq!(sensor.max_bits(17.0), 34_000_000.0);
    }

    #[test]
    fn rejects_reserved_missions_and_bad_patterns() {
        let reserved = CATALOG.replace("\"SIGINT\"]", "\"CRISIS\"]");
        assert!(matches!(
            SensorCatalog::from_json_str(&reserved),
            Err(SensorCatalogError::ReservedMission { .. })
        ));

        let donut = CATALOG.replace("\"CONE\"", "\"DONUT\"");
        let err = SensorCatalog::from_json_str(&donut).unwrap_err();
        assert!(matches!(err, SensorCatalogError::Pattern { sensor: 1, .. }));
        assert!(err.to_string().contains("sensor 1"));
    }
}
