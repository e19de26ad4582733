use std::collections::BTreeMap;
use std::sync::Arc;

use crate::crisis::CrisisAreaId;
use crate::earth::{FullRegionNumber, RegionId};
use crate::quality::QualityKind;
use crate::requirements::Requirement;

/// Everything one sensor can do for one region at one time step.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionData {
    pub region: RegionId,
    pub full_number: FullRegionNumber,
    pub sensor: u32,
    pub crisis: Option<CrisisAreaId>,
    requirements: Vec<Arc<Requirement>>,
    /// Best quality achieved per mission index, when target accounting is on.
    best_quality: Option<BTreeMap<usize, f64>>,
}

impl RegionData {
    pub fn new(
        region: RegionId,
        full_number: FullRegionNumber,
        sensor: u32,
        crisis: Option<CrisisAreaId>,
        track_quality: bool,
    ) -> Self {
        Self {
            region,
            full_number,
            sensor,
            crisis,
            requirements: Vec::new(),
            best_quality: track_quality.then(BTreeMap::new),
        }
    }

    pub fn add_requirement(&mut self, requirement: Arc<Requirement>, quality: f64, kind: QualityKind) {
        if let (Some(best), Some(mission)) = (self.best_quality.as_mut(), requirement.mission) {
            best.entry(mission)
                .and_modify(|current| *current = kind.best(*current, quality))
                .or_insert(quality);
        }
        self.requirements.push(requirement);
    }

    pub fn requirements(&self) -> &[Arc<Requirement>] {
        &self.requirements
    }

    pub fn best_quality(&self, mission: usize) -> Option<f64> {
        self.best_quality
            .as_ref()
            .and_then(|best| best.get(&mission).copied())
    }

    pub fn is_valid(&self) -> bool {
        !self.requirements.is_empty() || self.crisis.is_some()
    }

    /// A crisis-tagged region with nothing matched gets a zero-value
    /// placeholder so the crisis bonus still has something to attach to.
    pub fn apply_placeholder(&mut self) {
        if self.crisis.is_some() && self.requirements.is_empty() {
            self.requirements
                .push(Arc::new(Requirement::placeholder(self.full_number, self.sensor)));
        }
    }

    /// Highest `score × weight`; ties go to the lower priority rank, then the
    /// lower sub-priority, then the earlier requirement.
    pub fn most_valuable_requirement(&self) -> Option<&Arc<Requirement>> {
        let mut best: Option<&Arc<Requirement>> = None;
        for candidate in &self.requirements {
            let replace = match best {
                None => true,
                Some(current) => {
                    let (a, b) = (candidate.value(), current.value());
                    a > b
                        || (a == b
                            && (candidate.priority_rank, candidate.sub_priority)
                                < (current.priority_rank, current.sub_priority))
                }
            };
            if replace {
                best = Some(candidate);
            }
        }
        best
    }

    pub fn value(&self) -> f64 {
        self.most_valuable_requirement()
            .map(|requirement| requirement.value())
            .unwrap_or(0.0)
    }
}
