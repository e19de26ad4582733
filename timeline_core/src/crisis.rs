//! Crisis areas: groups of regions whose collection value is boosted for a
//! set of eligible users.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::{fs, io};

use bevy::prelude::Resource;
use thiserror::Error;
use timeline_schema::CrisisBlock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CrisisAreaId(pub u32);

impl CrisisAreaId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrisisArea {
    pub name: String,
    /// Identification number, always positive. Zero means "no crisis".
    pub level: u32,
    pub regions: Vec<u32>,
    pub users: Vec<(String, f64)>,
}

impl CrisisArea {
    pub fn contains_region(&self, region: u32) -> bool {
        self.regions.contains(&region)
    }

    pub fn multiplier_for(&self, user: &str) -> Option<f64> {
        self.users
            .iter()
            .find(|(name, _)| name == user)
            .map(|(_, multiplier)| *multiplier)
    }

    pub fn has_user(&self, user: &str) -> bool {
        self.multiplier_for(user).is_some()
    }
}

#[derive(Debug, Error)]
pub enum CrisisConfigError {
    #[error("failed to parse crisis config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read crisis config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("crisis area {name:?} must have a positive level")]
    InvalidLevel { name: String },
    #[error("crisis level {level} is used by more than one area")]
    DuplicateLevel { level: u32 },
    #[error("crisis area {name:?}: multiplier {value} for user {user} must be finite and non-negative")]
    InvalidMultiplier {
        name: String,
        user: String,
        value: f64,
    },
    #[error("crisis area {name:?} lists user {user} twice")]
    DuplicateUser { name: String, user: String },
}

/// Ordered crisis areas. Built once per run and shared read-only.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct CrisisRegistry {
    areas: Vec<CrisisArea>,
}

impl CrisisRegistry {
    pub fn new(areas: Vec<CrisisArea>) -> Self {
        Self { areas }
    }

    pub fn from_block(block: &CrisisBlock) -> Result<Self, CrisisConfigError> {
        let mut levels = HashSet::new();
        let mut areas = Vec::with_capacity(block.areas.len());
        for entry in &block.areas {
            if entry.level == 0 {
                return Err(CrisisConfigError::InvalidLevel {
                    name: entry.name.clone(),
                });
            }
            if !levels.insert(entry.level) {
                return Err(CrisisConfigError::DuplicateLevel { level: entry.level });
            }
            let mut users: Vec<(String, f64)> = Vec::with_capacity(entry.users.len());
            for user in &entry.users {
                if !user.multiplier.is_finite() || user.multiplier < 0.0 {
                    return Err(CrisisConfigError::InvalidMultiplier {
                        name: entry.name.clone(),
                        user: user.user.clone(),
                        value: user.multiplier,
                    });
                }
                if users.iter().any(|(name, _)| *name == user.user) {
                    return Err(CrisisConfigError::DuplicateUser {
                        name: entry.name.clone(),
                        user: user.user.clone(),
                    });
                }
                users.push((user.user.clone(), user.multiplier));
            }
            areas.push(CrisisArea {
                name: entry.name.clone(),
                level: entry.level,
                regions: entry.regions.clone(),
                users,
            });
        }
        Ok(Self { areas })
    }

    pub fn from_json_str(json: &str) -> Result<Self, CrisisConfigError> {
        let block: CrisisBlock = serde_json::from_str(json)?;
        Self::from_block(&block)
    }

    pub fn from_file(path: &Path) -> Result<Self, CrisisConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| CrisisConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn area(&self, id: CrisisAreaId) -> &CrisisArea {
        &self.areas[id.index()]
    }

    pub fn areas(&self) -> impl Iterator<Item = (CrisisAreaId, &CrisisArea)> {
        self.areas
            .iter()
            .enumerate()
            .map(|(idx, area)| (CrisisAreaId(idx as u32), area))
    }

    /// First area containing `region` that `user` is eligible for.
    pub fn lookup(&self, user: &str, region: u32) -> Option<CrisisAreaId> {
        self.areas()
            .find(|(_, area)| area.contains_region(region) && area.has_user(user))
            .map(|(id, _)| id)
    }

    /// Area with the highest multiplier for `user` among the given regions.
    /// Equal multipliers keep the first area encountered.
    pub fn most_valuable<I>(&self, regions: I, user: &str) -> Option<CrisisAreaId>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut best: Option<(CrisisAreaId, f64)> = None;
        for region in regions {
            for (id, area) in self.areas() {
                if !area.contains_region(region) {
                    continue;
                }
                let Some(multiplier) = area.multiplier_for(user) else {
                    continue;
                };
                if best.map_or(true, |(_, current)| multiplier > current) {
                    best = Some((id, multiplier));
                }
            }
        }
        best.map(|(id, _)| id)
    }

    /// Multiplier `user` receives in the area identified by `level`; zero
    /// when either is unknown.
    pub fn score_multiplier(&self, level: u32, user: &str) -> f64 {
        self.by_identifier(level)
            .and_then(|id| self.area(id).multiplier_for(user))
            .unwrap_or(0.0)
    }

    pub fn contains_region(&self, region: u32) -> bool {
        self.areas.iter().any(|area| area.contains_region(region))
    }

    pub fn user_has_membership(&self, user: &str) -> bool {
        self.areas.iter().any(|area| area.has_user(user))
    }

    pub fn by_identifier(&self, level: u32) -> Option<CrisisAreaId> {
        self.areas()
            .find(|(_, area)| area.level == level)
            .map(|(id, _)| id)
    }

    /// Score handed to the optimizer: crisis steps earn a bonus scaled by the
    /// platform's best timeline score.
    pub fn objective_score(
        &self,
        base_score: f64,
        level: u32,
        user: &str,
        maximum_timeline_score: f64,
    ) -> f64 {
        if level == 0 {
            return base_score;
        }
        base_score + maximum_timeline_score * self.score_multiplier(level, user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CrisisRegistry {
        CrisisRegistry::from_json_str(
            r#"{
                "areas": [
                    {
                        "name": "Flood",
                        "level": 1,
                        "regions": [10, 11],
                        "users": [{"user": "ALPHA", "multiplier": 2.0}, {"user": "BRAVO", "multiplier": 1.0}]
                    },
                    {
                        "name": "Quake",
                        "level": 2,
                        "regions": [11, 12],
                        "users": [{"user": "ALPHA", "multiplier": 3.0}]
                    },
                    {
                        "name": "Storm",
                        "level": 3,
                        "regions": [13],
                        "users": [{"user": "ALPHA", "multiplier": 3.0}]
                    }
                ]
            }"#,
        )
        .expect("crisis fixture parses")
    }

    #[test]
    fn lookup_returns_first_match() {
        let registry = registry();
        let id = registry.lookup("ALPHA", 11).unwrap();
        assert_eq!(registry.area(id).name, "Flood");
        assert!(registry.lookup("BRAVO", 12).is_none());
        assert!(registry.lookup("CHARLIE", 10).is_none());
    }

    #[test]
    fn most_valuable_prefers_higher_multiplier() {
        let registry = registry();
        let id = registry.most_valuable([10, 11], "ALPHA").unwrap();
        assert_eq!(registry.area(id).name, "Quake");
        let bravo = registry.most_valuable([10, 11, 12], "BRAVO").unwrap();
        assert_eq!(registry.area(bravo).name, "Flood");
        assert!(registry.most_valuable([99], "ALPHA").is_none());
    }

    #[test]
    fn equal_multipliers_keep_first_seen() {
        let registry = registry();
        let id = registry.most_valuable([13, 12], "ALPHA").unwrap();
        assert_eq!(registry.area(id).name, "Storm");
        let id = registry.most_valuable([12, 13], "ALPHA").unwrap();
        assert_eq!(registry.area(id).name, "Quake");
    }

    #[test]
    fn objective_score_is_base_without_crisis() {
        let registry = registry();
        assert_eq!(registry.objective_score(5.0, 0, "ALPHA", 100.0), 5.0);
        assert_eq!(registry.objective_score(5.0, 2, "ALPHA", 100.0), 305.0);
        assert_eq!(registry.objective_score(5.0, 2, "BRAVO", 100.0), 5.0);
    }

    #[test]
    fn objective_score_grows_with_multiplier() {
        let mut previous = f64::NEG_INFINITY;
        for multiplier in [0.0, 0.5, 1.0, 4.0] {
            let registry = CrisisRegistry::new(vec![CrisisArea {
                name: "Flood".to_string(),
                level: 7,
                regions: vec![1],
                users: vec![("ALPHA".to_string(), multiplier)],
            }]);
            let score = registry.objective_score(3.0, 7, "ALPHA", 10.0);
            assert!(score > previous);
            previous = score;
        }
    }

    #[test]
    fn pure_lookups() {
        let registry = registry();
        assert!(registry.contains_region(12));
        assert!(!registry.contains_region(14));
        assert!(registry.user_has_membership("BRAVO"));
        assert!(!registry.user_has_membership("CHARLIE"));
        assert_eq!(registry.by_identifier(3), Some(CrisisAreaId(2)));
        assert_eq!(registry.score_multiplier(1, "BRAVO"), 1.0);
        assert_eq!(registry.score_multiplier(9, "BRAVO"), 0.0);
    }

    #[test]
    fn rejects_bad_areas() {
        let err = CrisisRegistry::from_json_str(
            r#"{"areas": [{"name": "Zero", "level": 0, "regions": [], "users": []}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CrisisConfigError::InvalidLevel { .. }));

        let err = CrisisRegistry::from_json_str(
            r#"{"areas": [
                {"name": "A", "level": 1, "regions": [], "users": []},
                {"name": "B", "level": 1, "regions": [], "users": []}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CrisisConfigError::DuplicateLevel { level: 1 }));

        let err = CrisisRegistry::from_json_str(
            r#"{"areas": [{"name": "A", "level": 1, "regions": [], "users": [{"user": "X", "multiplier": -1.0}]}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("user X"));
    }
}
