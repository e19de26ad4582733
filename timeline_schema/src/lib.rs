//! Data contracts for the value timeline generator.
//!
//! Input blocks arrive here already deserialised from JSON; the engine in
//! `timeline_core` validates them and builds its own immutable structures.
//! Output records are what downstream consumers (the allocation optimizer,
//! report writers) read back.

use std::collections::BTreeMap;
use std::hash::{BuildHasher, Hasher};

use ahash::RandomState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegionTableBlock {
    pub service_tier_count: usize,
    pub sub_region_latitude_divisions: u32,
    pub sub_region_longitude_divisions: u32,
    pub regions: Vec<RegionRecord>,
}

impl Default for RegionTableBlock {
    fn default() -> Self {
        Self {
            service_tier_count: 0,
            sub_region_latitude_divisions: 1,
            sub_region_longitude_divisions: 1,
            regions: Vec::new(),
        }
    }
}

impl RegionTableBlock {
    pub fn sub_regions_enabled(&self) -> bool {
        self.sub_region_latitude_divisions as u64 * self.sub_region_longitude_divisions as u64 > 1
    }
}

/// One row of the region table. Angles are in degrees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RegionRecord {
    pub number: u32,
    pub north: f64,
    pub south: f64,
    pub west: f64,
    pub east: f64,
    pub land: bool,
    pub geo_label: String,
    pub revisit: bool,
    pub service_tiers: Vec<ServiceTierRecord>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ServiceTierRecord {
    pub access_level: u32,
    /// Area-of-interest flag, `0` or `1`.
    #[serde(default)]
    pub area_of_interest: u8,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccessPatternKind {
    #[serde(rename = "CONE")]
    Cone,
    #[serde(rename = "DONUT")]
    Donut,
    #[serde(rename = "AXE")]
    Axeblade,
    #[serde(rename = "BFLY")]
    Butterfly,
}

impl AccessPatternKind {
    pub fn tag(self) -> &'static str {
        match self {
            AccessPatternKind::Cone => "CONE",
            AccessPatternKind::Donut => "DONUT",
            AccessPatternKind::Axeblade => "AXE",
            AccessPatternKind::Butterfly => "BFLY",
        }
    }

    pub fn uses_inner_cone(self) -> bool {
        !matches!(self, AccessPatternKind::Cone)
    }

    pub fn uses_broadside(self) -> bool {
        matches!(
            self,
            AccessPatternKind::Axeblade | AccessPatternKind::Butterfly
        )
    }
}

/// Elevation angles (degrees) for one cone of an access pattern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ConeAngleBlock {
    pub default_deg: Option<f64>,
    pub overrides: Vec<ConeAngleOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConeAngleOverride {
    pub mission: String,
    pub angle_deg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessPatternBlock {
    pub kind: AccessPatternKind,
    pub outer: ConeAngleBlock,
    #[serde(default)]
    pub inner: Option<ConeAngleBlock>,
    #[serde(default)]
    pub always_include_subsatellite_region: bool,
    #[serde(default)]
    pub broadside_angle_deg: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum QualityKindTag {
    #[serde(rename = "GSD")]
    Gsd,
    #[serde(rename = "NIIRS")]
    Niirs,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorBlock {
    pub number: u32,
    pub name: String,
    pub quality_kind: QualityKindTag,
    pub reference_quality: f64,
    pub reference_range_km: f64,
    #[serde(default)]
    pub minimum_elevation_deg: Option<f64>,
    pub data_rate_bps: f64,
    pub seconds_per_point: f64,
    #[serde(default)]
    pub area_rate_km2_per_s: f64,
    pub access_pattern: AccessPatternBlock,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SensorCatalogBlock {
    pub missions: Vec<String>,
    pub sensors: Vec<SensorBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct CrisisBlock {
    pub areas: Vec<CrisisAreaBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct CrisisAreaBlock {
    pub name: String,
    pub level: u32,
    pub regions: Vec<u32>,
    pub users: Vec<CrisisUserBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrisisUserBlock {
    pub user: String,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriorityBlock {
    pub rank: u32,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RequirementDeckBlock {
    pub quality_levels: BTreeMap<String, f64>,
    pub priorities: BTreeMap<String, PriorityBlock>,
    pub rows: Vec<DeckRow>,
}

/// One requirement-deck row. `quality` and `priority` are codes resolved
/// through the deck's lookup tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DeckRow {
    pub deck: u32,
    pub region: u32,
    pub sub_region: u32,
    pub mission: String,
    pub quality: String,
    pub priority: String,
    pub sub_priority: u32,
    pub scores: Vec<SensorScore>,
    pub area_km2: f64,
    pub points: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SensorScore {
    pub sensor: u32,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScenarioBlock {
    pub step_seconds: f64,
    pub time_steps: usize,
    pub settings: GenerationSettingsBlock,
    pub platforms: Vec<PlatformBlock>,
}

impl Default for ScenarioBlock {
    fn default() -> Self {
        Self {
            step_seconds: 60.0,
            time_steps: 0,
            settings: GenerationSettingsBlock::default(),
            platforms: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct GenerationSettingsBlock {
    /// Count a region as in view when any part of it is inside the cone,
    /// rather than only its centre.
    pub include_partial_regions: bool,
    pub track_target_quality: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlatformBlock {
    pub name: String,
    pub user: String,
    pub deck: u32,
    pub sensors: Vec<u32>,
    #[serde(default)]
    pub service_tier: Option<usize>,
    #[serde(default)]
    pub revisit: bool,
    pub ephemeris: EphemerisBlock,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EphemerisBlock {
    /// Earth-fixed states, one per time step.
    Track { states: Vec<StateRecord> },
    CircularOrbit {
        altitude_km: f64,
        inclination_deg: f64,
        raan_deg: f64,
        #[serde(default)]
        argument_of_latitude_deg: f64,
    },
    GroundSite {
        latitude_deg: f64,
        longitude_deg: f64,
        #[serde(default)]
        altitude_km: f64,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StateRecord {
    pub position_km: [f64; 3],
    pub velocity_km_s: [f64; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceRecord {
    pub sensor: u32,
    pub mission: Option<usize>,
    pub sub_priority: u32,
    pub imaged_region: Option<f64>,
    pub collection_time: f64,
    pub max_bits: f64,
    pub resource_factor: f64,
}

/// One reported time step of a platform's value timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineRecord {
    pub user: String,
    pub time_index: usize,
    pub overflown_region: Option<f64>,
    pub score: f64,
    pub crisis_level: u32,
    pub resources: Vec<ResourceRecord>,
}

impl TimelineRecord {
    /// Fixed-width text row used by the human-readable dump.
    pub fn report_line(&self) -> String {
        let mut line = format!(
            "{:<12} {:>6} {:>9} {:>12.3} {:>3}",
            self.user,
            self.time_index,
            format_region(self.overflown_region),
            self.score,
            self.crisis_level
        );
        for resource in &self.resources {
            let mission = resource
                .mission
                .map(|mission| mission.to_string())
                .unwrap_or_else(|| "-".to_string());
            line.push_str(&format!(
                " | {:>9} {:>4} {:>4} {:>4} {:>8.2} {:>12.0} {:>6.3}",
                format_region(resource.imaged_region),
                resource.sensor,
                mission,
                resource.sub_priority,
                resource.collection_time,
                resource.max_bits,
                resource.resource_factor
            ));
        }
        line
    }
}

fn format_region(region: Option<f64>) -> String {
    match region {
        Some(number) if number.fract() == 0.0 => format!("{number:.0}"),
        Some(number) => format!("{number:.2}"),
        None => "-".to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlatformTimelineRecord {
    pub platform: String,
    pub user: String,
    pub maximum_score: f64,
    pub records: Vec<TimelineRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ExportHeader {
    pub time_steps: usize,
    pub step_seconds: f64,
    pub platform_count: u32,
    pub hash: u64,
}

/// Everything the downstream optimizer needs from one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TimelineExport {
    pub header: ExportHeader,
    pub platforms: Vec<PlatformTimelineRecord>,
}

impl TimelineExport {
    pub fn new(time_steps: usize, step_seconds: f64, platforms: Vec<PlatformTimelineRecord>) -> Self {
        let mut export = Self {
            header: ExportHeader {
                time_steps,
                step_seconds,
                platform_count: platforms.len() as u32,
                hash: 0,
            },
            platforms,
        };
        export.header.hash = hash_export(&export);
        export
    }
}

/// Deterministic digest of an export, ignoring the stored hash itself.
pub fn hash_export(export: &TimelineExport) -> u64 {
    let mut clone = export.clone();
    clone.header.hash = 0;
    let encoded = bincode::serialize(&clone).expect("export serialization for hashing");
    let mut hasher = RandomState::with_seeds(0, 0, 0, 0).build_hasher();
    hasher.write(&encoded);
    hasher.finish()
}

pub fn encode_export(export: &TimelineExport) -> bincode::Result<Vec<u8>> {
    bincode::serialize(export)
}

pub fn decode_export(bytes: &[u8]) -> bincode::Result<TimelineExport> {
    bincode::deserialize(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> TimelineRecord {
        TimelineRecord {
            user: "ALPHA".to_string(),
            time_index: 3,
            overflown_region: Some(12.0),
            score: 42.5,
            crisis_level: 0,
            resources: vec![ResourceRecord {
                sensor: 1,
                mission: Some(0),
                sub_priority: 2,
                imaged_region: Some(12.03),
                collection_time: 4.0,
                max_bits: 8.0e6,
                resource_factor: 0.067,
            }],
        }
    }

    #[test]
    fn access_pattern_tags_parse() {
        let kinds: Vec<AccessPatternKind> =
            serde_json::from_str(r#"["CONE", "DONUT", "AXE", "BFLY"]"#).unwrap();
        assert_eq!(
            kinds,
            vec![
                AccessPatternKind::Cone,
                AccessPatternKind::Donut,
                AccessPatternKind::Axeblade,
                AccessPatternKind::Butterfly
            ]
        );
        assert!(!AccessPatternKind::Cone.uses_inner_cone());
        assert!(AccessPatternKind::Butterfly.uses_broadside());
        assert!(!AccessPatternKind::Donut.uses_broadside());
    }

    #[test]
    fn ephemeris_block_is_tagged() {
        let block: EphemerisBlock = serde_json::from_str(
            r#"{"type": "ground_site", "latitude_deg": 10.0, "longitude_deg": 20.0}"#,
        )
        .unwrap();
        assert_eq!(
            block,
            EphemerisBlock::GroundSite {
                latitude_deg: 10.0,
                longitude_deg: 20.0,
                altitude_km: 0.0
            }
        );
    }

    #[test]
    fn region_table_defaults_disable_sub_regions() {
        let table: RegionTableBlock = serde_json::from_str(r#"{"regions": []}"#).unwrap();
        assert!(!table.sub_regions_enabled());
        assert_eq!(table.sub_region_latitude_divisions, 1);
    }

    #[test]
    fn export_hash_ignores_stored_hash() {
        let platform = PlatformTimelineRecord {
            platform: "SAT-1".to_string(),
            user: "ALPHA".to_string(),
            maximum_score: 42.5,
            records: vec![sample_record()],
        };
        let export = TimelineExport::new(1, 60.0, vec![platform]);
        assert_ne!(export.header.hash, 0);
        assert_eq!(hash_export(&export), export.header.hash);

        let bytes = encode_export(&export).unwrap();
        let decoded = decode_export(&bytes).unwrap();
        assert_eq!(decoded, export);
    }

    #[test]
    fn report_line_lists_resources() {
        let line = sample_record().report_line();
        assert!(line.starts_with("ALPHA"));
        assert!(line.contains("12.03"));
        assert_eq!(line.matches('|').count(), 1);
    }
}
