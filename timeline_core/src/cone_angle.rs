//! Per-mission elevation angles for one cone of an access pattern.

use std::collections::HashMap;

use timeline_schema::ConeAngleBlock;

use crate::access_pattern::{AccessPatternError, ConeSide};

/// Mission tag used by platforms flagged for revisit collection.
pub const REVISIT_TAG: &str = "REVISIT";
/// Mission tag holding the crisis-specific angles.
pub const CRISIS_TAG: &str = "CRISIS";

/// Elevation angles in radians: an optional default plus per-mission
/// overrides, with the overrides kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConeAngleData {
    default: Option<f64>,
    overrides: HashMap<String, f64>,
    tags: Vec<String>,
}

impl ConeAngleData {
    pub fn from_block(block: &ConeAngleBlock, side: ConeSide) -> Result<Self, AccessPatternError> {
        let mut data = ConeAngleData::default();
        if let Some(default_deg) = block.default_deg {
            data.default = Some(checked_elevation(default_deg, "default", side)?);
        }
        for entry in &block.overrides {
            let angle = checked_elevation(entry.angle_deg, &entry.mission, side)?;
            if data.overrides.insert(entry.mission.clone(), angle).is_some() {
                return Err(AccessPatternError::DuplicateOverride {
                    mission: entry.mission.clone(),
                    side,
                });
            }
            data.tags.push(entry.mission.clone());
        }
        Ok(data)
    }

    /// Angles in radians, taken as given. Overrides keep their first-seen order.
    pub fn from_radians(default: Option<f64>, overrides: &[(&str, f64)]) -> Self {
        let mut data = ConeAngleData {
            default,
            ..Default::default()
        };
        for (tag, angle) in overrides {
            if data.overrides.insert(tag.to_string(), *angle).is_none() {
                data.tags.push(tag.to_string());
            }
        }
        data
    }

    pub fn default_angle(&self) -> Option<f64> {
        self.default
    }

    /// Override for `tag` if present, otherwise the default.
    pub fn angle_for(&self, tag: &str) -> Option<f64> {
        self.overrides.get(tag).copied().or(self.default)
    }

    pub fn has_override(&self, tag: &str) -> bool {
        self.overrides.contains_key(tag)
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Smallest stored angle, ignoring the revisit override.
    pub fn minimum_angle(&self) -> Option<f64> {
        self.fold(f64::min)
    }

    /// Largest stored angle, ignoring the revisit override.
    pub fn maximum_angle(&self) -> Option<f64> {
        self.fold(f64::max)
    }

    fn fold(&self, pick: fn(f64, f64) -> f64) -> Option<f64> {
        self.tags
            .iter()
            .filter(|tag| tag.as_str() != REVISIT_TAG)
            .filter_map(|tag| self.overrides.get(tag).copied())
            .chain(self.default)
            .reduce(pick)
    }
}

fn checked_elevation(degrees: f64, mission: &str, side: ConeSide) -> Result<f64, AccessPatternError> {
    if !(0.0..=90.0).contains(&degrees) {
        return Err(AccessPatternError::ElevationRange {
            mission: mission.to_string(),
            side,
            value: degrees,
        });
    }
    Ok(degrees.to_radians())
}
