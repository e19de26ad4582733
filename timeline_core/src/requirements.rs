//! Collection requirements resolved from a requirement deck.
//!
//! Every deck row fans out into one [`Requirement`] per scored sensor, keyed
//! by `(full region number, deck, sensor)`. A row without a sub-region applies
//! to every sub-region of its region.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{fs, io};

use bevy::prelude::Resource;
use thiserror::Error;
use timeline_schema::{DeckRow, RequirementDeckBlock};

use crate::earth::{FullRegionNumber, SpatialIndex};
use crate::sensor::SensorCatalog;

#[derive(Debug, Clone, PartialEq)]
pub struct Requirement {
    pub region: FullRegionNumber,
    pub deck: u32,
    pub sensor: u32,
    /// Index into the mission catalog. `None` only for crisis placeholders.
    pub mission: Option<usize>,
    pub required_quality: f64,
    pub priority_rank: u32,
    pub priority_weight: f64,
    pub sub_priority: u32,
    pub score: f64,
    pub area_km2: f64,
    pub points: u32,
    pub placeholder: bool,
}

impl Requirement {
    /// Zero-value stand-in that keeps a crisis-tagged region alive when no
    /// real requirement matched it.
    pub fn placeholder(region: FullRegionNumber, sensor: u32) -> Self {
        Self {
            region,
            deck: 0,
            sensor,
            mission: None,
            required_quality: 0.0,
            priority_rank: u32::MAX,
            priority_weight: 0.0,
            sub_priority: u32::MAX,
            score: 0.0,
            area_km2: 0.0,
            points: 0,
            placeholder: true,
        }
    }

    pub fn value(&self) -> f64 {
        self.score * self.priority_weight
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequirementKey {
    pub region: FullRegionNumber,
    pub deck: u32,
    pub sensor: u32,
}

#[derive(Debug, Error)]
pub enum RequirementDeckError {
    #[error("failed to parse requirement deck: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read requirement deck from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("deck row {row}: unknown region {region} sub-region {sub_region}")]
    UnknownRegion {
        row: usize,
        region: u32,
        sub_region: u32,
    },
    #[error("deck row {row}: unknown mission {mission}")]
    UnknownMission { row: usize, mission: String },
    #[error("deck row {row}: unknown quality code {code}")]
    UnknownQuality { row: usize, code: String },
    #[error("deck row {row}: unknown priority code {code}")]
    UnknownPriority { row: usize, code: String },
    #[error("deck row {row}: unknown sensor {sensor}")]
    UnknownSensor { row: usize, sensor: u32 },
}

/// Shared requirement lookup. Populated once before generation and only read
/// afterwards.
#[derive(Resource, Debug, Clone, Default)]
pub struct RequirementMap {
    entries: HashMap<RequirementKey, Vec<Arc<Requirement>>>,
    len: usize,
}

impl RequirementMap {
    pub fn from_block(
        block: &RequirementDeckBlock,
        index: &SpatialIndex,
        catalog: &SensorCatalog,
    ) -> Result<Self, RequirementDeckError> {
        let mut map = RequirementMap::default();
        for (row_idx, row) in block.rows.iter().enumerate() {
            map.add_row(row_idx, row, block, index, catalog)?;
        }
        tracing::debug!(
            target: "value_timeline::config",
            rows = block.rows.len(),
            requirements = map.len,
            "requirement_deck.resolved"
        );
        Ok(map)
    }

    pub fn from_json_str(
        json: &str,
        index: &SpatialIndex,
        catalog: &SensorCatalog,
    ) -> Result<Self, RequirementDeckError> {
        let block: RequirementDeckBlock = serde_json::from_str(json)?;
        Self::from_block(&block, index, catalog)
    }

    pub fn from_file(
        path: &Path,
        index: &SpatialIndex,
        catalog: &SensorCatalog,
    ) -> Result<Self, RequirementDeckError> {
        let contents = fs::read_to_string(path).map_err(|source| RequirementDeckError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents, index, catalog)
    }

    fn add_row(
        &mut self,
        row_idx: usize,
        row: &DeckRow,
        block: &RequirementDeckBlock,
        index: &SpatialIndex,
        catalog: &SensorCatalog,
    ) -> Result<(), RequirementDeckError> {
        let regions: Vec<FullRegionNumber> = if row.sub_region == 0 {
            index
                .regions_with_number(row.region)
                .into_iter()
                .map(|id| index.region(id).full_number())
                .collect()
        } else {
            let full = FullRegionNumber::new(row.region, Some(row.sub_region));
            index
                .region_by_number(full)
                .map(|_| full)
                .into_iter()
                .collect()
        };
        if regions.is_empty() {
            return Err(RequirementDeckError::UnknownRegion {
                row: row_idx,
                region: row.region,
                sub_region: row.sub_region,
            });
        }
        let mission = catalog.mission_index(&row.mission).ok_or_else(|| {
            RequirementDeckError::UnknownMission {
                row: row_idx,
                mission: row.mission.clone(),
            }
        })?;
        let required_quality = *block.quality_levels.get(&row.quality).ok_or_else(|| {
            RequirementDeckError::UnknownQuality {
                row: row_idx,
                code: row.quality.clone(),
            }
        })?;
        let priority = *block.priorities.get(&row.priority).ok_or_else(|| {
            RequirementDeckError::UnknownPriority {
                row: row_idx,
                code: row.priority.clone(),
            }
        })?;

        for entry in &row.scores {
            if catalog.sensor(entry.sensor).is_none() {
                return Err(RequirementDeckError::UnknownSensor {
                    row: row_idx,
                    sensor: entry.sensor,
                });
            }
            for region in &regions {
                let requirement = Requirement {
                    region: *region,
                    deck: row.deck,
                    sensor: entry.sensor,
                    mission: Some(mission),
                    required_quality,
                    priority_rank: priority.rank,
                    priority_weight: priority.weight,
                    sub_priority: row.sub_priority,
                    score: entry.score,
                    area_km2: row.area_km2,
                    points: row.points,
                    placeholder: false,
                };
                let key = RequirementKey {
                    region: *region,
                    deck: row.deck,
                    sensor: entry.sensor,
                };
                self.entries
                    .entry(key)
                    .or_default()
                    .push(Arc::new(requirement));
                self.len += 1;
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &RequirementKey) -> &[Arc<Requirement>] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timeline_schema::{RegionRecord, RegionTableBlock, ServiceTierRecord};

    const CATALOG: &str = r#"{
        "missions": ["IMINT"],
        "sensors": [{
            "number": 7,
            "name": "SAR",
            "quality_kind": "NIIRS",
            "reference_quality": 5.0,
            "reference_range_km": 700.0,
            "data_rate_bps": 1000.0,
            "seconds_per_point": 1.0,
            "access_pattern": {"kind": "CONE", "outer": {"default_deg": 10.0}}
        }]
    }"#;

    fn index(sub_divisions: u32) -> SpatialIndex {
        SpatialIndex::build(&RegionTableBlock {
            service_tier_count: 1,
            sub_region_latitude_divisions: sub_divisions,
            sub_region_longitude_divisions: 1,
            regions: vec![RegionRecord {
                number: 12,
                north: 20.0,
                south: 10.0,
                west: 30.0,
                east: 40.0,
                land: true,
                geo_label: "R12".to_string(),
                revisit: false,
                service_tiers: vec![ServiceTierRecord {
                    access_level: 1,
                    area_of_interest: 0,
                }],
            }],
        })
        .unwrap()
    }

    const DECK: &str = r#"{
        "quality_levels": {"Q5": 5.0},
        "priorities": {"P1": {"rank": 1, "weight": 10.0}},
        "rows": [{
            "deck": 3, "region": 12, "sub_region": 0, "mission": "IMINT",
            "quality": "Q5", "priority": "P1", "sub_priority": 2,
            "scores": [{"sensor": 7, "score": 1.5}], "area_km2": 0.0, "points": 1
        }]
    }"#;

    #[test]
    fn resolves_rows_into_keyed_requirements() {
        let catalog = SensorCatalog::from_json_str(CATALOG).unwrap();
        let map = RequirementMap::from_json_str(DECK, &index(1), &catalog).unwrap();
        let key = RequirementKey {
            region: FullRegionNumber::new(12, None),
            deck: 3,
            sensor: 7,
        };
        let found = map.get(&key);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value(), 15.0);
        assert_eq!(found[0].mission, Some(0));
        assert!(map
            .get(&RequirementKey { deck: 4, ..key })
            .is_empty());
    }

    #[test]
    fn whole_region_rows_cover_every_sub_region() {
        let catalog = SensorCatalog::from_json_str(CATALOG).unwrap();
        let map = RequirementMap::from_json_str(DECK, &index(2), &catalog).unwrap();
        assert_eq!(map.len(), 2);
        for sub in [1, 2] {
            let key = RequirementKey {
                region: FullRegionNumber::new(12, Some(sub)),
                deck: 3,
                sensor: 7,
            };
            assert_eq!(map.get(&key).len(), 1);
        }
    }

    #[test]
    fn malformed_rows_are_configuration_errors() {
        let catalog = SensorCatalog::from_json_str(CATALOG).unwrap();
        let index = index(1);
        let cases = [
            (r#""region": 12"#, r#""region": 99"#, "unknown region 99"),
            (r#""mission": "IMINT""#, r#""mission": "MASINT""#, "unknown mission MASINT"),
            (r#""quality": "Q5""#, r#""quality": "Q9""#, "unknown quality code Q9"),
            (r#""priority": "P1""#, r#""priority": "P9""#, "unknown priority code P9"),
            (r#""sensor": 7"#, r#""sensor": 8"#, "unknown sensor 8"),
        ];
        for (from, to, message) in cases {
            let json = DECK.replace(from, to);
            let err = RequirementMap::from_json_str(&json, &index, &catalog).unwrap_err();
            assert!(err.to_string().contains(message), "{err}");
            assert!(err.to_string().starts_with("deck row 0"));
        }
    }

    #[test]
    fn placeholder_has_no_value() {
        let placeholder = Requirement::placeholder(FullRegionNumber::new(12, None), 7);
        assert!(placeholder.placeholder);
        assert_eq!(placeholder.value(), 0.0);
        assert!(placeholder.mission.is_none());
    }
}
