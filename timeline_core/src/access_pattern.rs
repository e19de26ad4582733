//! Sensor access patterns: which regions a sensor can see from a given
//! vehicle state.
//!
//! Every pattern starts from an outer elevation limit turned into an earth
//! central angle around the sub-vehicle point. Donut, Axeblade and Butterfly
//! then carve out an inner exclusion zone; the last two also restrict the
//! look direction to a broadside window.

use std::f64::consts::PI;
use std::fmt;

use bevy::math::DVec3;
use thiserror::Error;
use timeline_schema::{AccessPatternBlock, AccessPatternKind};

use crate::cone_angle::{ConeAngleData, CRISIS_TAG, REVISIT_TAG};
use crate::earth::{RegionId, SpatialIndex};
use crate::geometry::{
    earth_angle_from_elevation, elevation_angle, ground_track_angle, squint_angle, GeoPoint,
    VehicleState,
};

const SIN_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConeSide {
    Outer,
    Inner,
}

impl fmt::Display for ConeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConeSide::Outer => f.write_str("outer"),
            ConeSide::Inner => f.write_str("inner"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AccessPatternError {
    #[error("no {side} elevation angle for mission {mission} and no default")]
    MissingAngle { mission: String, side: ConeSide },
    #[error("{side} elevation angle {value} for mission {mission} outside [0, 90] degrees")]
    ElevationRange {
        mission: String,
        side: ConeSide,
        value: f64,
    },
    #[error("duplicate {side} elevation override for mission {mission}")]
    DuplicateOverride { mission: String, side: ConeSide },
    #[error("{kind} pattern requires an inner cone")]
    MissingInner { kind: &'static str },
    #[error("{kind} pattern requires a broadside angle")]
    MissingBroadside { kind: &'static str },
    #[error("broadside angle {value} outside [0, 90) degrees")]
    BroadsideRange { value: f64 },
}

/// Which set of elevation angles a query uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleSelector<'a> {
    Mission(&'a str),
    Revisit,
    /// Envelope across missions: lowest outer angle, highest inner angle.
    Largest,
    Default,
    /// Crisis override, falling back to the default and then the envelope.
    Crisis,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternShape {
    Cone,
    Donut {
        inner: ConeAngleData,
    },
    Axeblade {
        inner: ConeAngleData,
        broadside: f64,
    },
    Butterfly {
        inner: ConeAngleData,
        broadside: f64,
    },
}

impl PatternShape {
    pub fn kind(&self) -> AccessPatternKind {
        match self {
            PatternShape::Cone => AccessPatternKind::Cone,
            PatternShape::Donut { .. } => AccessPatternKind::Donut,
            PatternShape::Axeblade { .. } => AccessPatternKind::Axeblade,
            PatternShape::Butterfly { .. } => AccessPatternKind::Butterfly,
        }
    }

    fn inner(&self) -> Option<&ConeAngleData> {
        match self {
            PatternShape::Cone => None,
            PatternShape::Donut { inner }
            | PatternShape::Axeblade { inner, .. }
            | PatternShape::Butterfly { inner, .. } => Some(inner),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessPattern {
    outer: ConeAngleData,
    shape: PatternShape,
    always_include_subsatellite_region: bool,
}

impl AccessPattern {
    pub fn new(
        outer: ConeAngleData,
        shape: PatternShape,
        always_include_subsatellite_region: bool,
    ) -> Self {
        Self {
            outer,
            shape,
            always_include_subsatellite_region,
        }
    }

    pub fn from_block(block: &AccessPatternBlock) -> Result<Self, AccessPatternError> {
        let outer = ConeAngleData::from_block(&block.outer, ConeSide::Outer)?;
        let kind = block.kind;
        let inner = if kind.uses_inner_cone() {
            let inner_block = block
                .inner
                .as_ref()
                .ok_or(AccessPatternError::MissingInner { kind: kind.tag() })?;
            Some(ConeAngleData::from_block(inner_block, ConeSide::Inner)?)
        } else {
            None
        };
        let broadside = if kind.uses_broadside() {
            let degrees = block
                .broadside_angle_deg
                .ok_or(AccessPatternError::MissingBroadside { kind: kind.tag() })?;
            if !(0.0..90.0).contains(&degrees) {
                return Err(AccessPatternError::BroadsideRange { value: degrees });
            }
            degrees.to_radians()
        } else {
            0.0
        };

        let shape = match (kind, inner) {
            (AccessPatternKind::Cone, _) => PatternShape::Cone,
            (AccessPatternKind::Donut, Some(inner)) => PatternShape::Donut { inner },
            (AccessPatternKind::Axeblade, Some(inner)) => PatternShape::Axeblade { inner, broadside },
            (AccessPatternKind::Butterfly, Some(inner)) => {
                PatternShape::Butterfly { inner, broadside }
            }
            (_, None) => return Err(AccessPatternError::MissingInner { kind: kind.tag() }),
        };
        Ok(Self::new(
            outer,
            shape,
            block.always_include_subsatellite_region,
        ))
    }

    pub fn kind(&self) -> AccessPatternKind {
        self.shape.kind()
    }

    pub fn shape(&self) -> &PatternShape {
        &self.shape
    }

    pub fn outer(&self) -> &ConeAngleData {
        &self.outer
    }

    pub fn inner(&self) -> Option<&ConeAngleData> {
        self.shape.inner()
    }

    pub fn always_include_subsatellite_region(&self) -> bool {
        self.always_include_subsatellite_region
    }

    /// Outer and crisis inner cones must agree on whether a crisis override
    /// exists. Plain cones have nothing to disagree about.
    pub fn has_symmetric_crisis_cones(&self) -> bool {
        match self.shape.inner() {
            None => true,
            Some(inner) => self.outer.has_override(CRISIS_TAG) == inner.has_override(CRISIS_TAG),
        }
    }

    /// Outer and (where the shape has one) inner elevation angles in radians.
    pub fn elevation_angles(
        &self,
        selector: AngleSelector<'_>,
    ) -> Result<(f64, Option<f64>), AccessPatternError> {
        let outer = select_angle(&self.outer, selector, ConeSide::Outer)?;
        let inner = match self.shape.inner() {
            Some(inner) => Some(select_angle(inner, selector, ConeSide::Inner)?),
            None => None,
        };
        Ok((outer, inner))
    }

    /// Regions inside the pattern for the given vehicle state.
    pub fn contained_regions(
        &self,
        index: &SpatialIndex,
        state: &VehicleState,
        selector: AngleSelector<'_>,
        include_partial: bool,
    ) -> Result<Vec<RegionId>, AccessPatternError> {
        let (outer, inner) = self.elevation_angles(selector)?;
        let radius = state.radius();
        let subpoint = state.subpoint();
        let max_angle = earth_angle_from_elevation(outer, radius);
        let min_angle = inner
            .map(|angle| earth_angle_from_elevation(angle, radius))
            .unwrap_or(0.0);

        let candidates = index.regions_in_cone(subpoint, max_angle, include_partial);
        let mut found: Vec<RegionId> = match &self.shape {
            PatternShape::Cone => candidates,
            PatternShape::Donut { .. } => candidates
                .into_iter()
                .filter(|id| subpoint.earth_angle_to(&index.region(*id).center()) >= min_angle)
                .collect(),
            PatternShape::Axeblade { broadside, .. } => candidates
                .into_iter()
                .filter(|id| {
                    let center = index.region(*id).center();
                    outside_squint_exclusion(&center, &subpoint, state, min_angle)
                        && ground_track_angle(center.surface_position(), state)
                            .is_some_and(|angle| in_broadside_window(angle, *broadside))
                })
                .collect(),
            PatternShape::Butterfly { broadside, .. } => candidates
                .into_iter()
                .filter(|id| {
                    let center = index.region(*id).center();
                    outside_squint_exclusion(&center, &subpoint, state, min_angle)
                        && squint_angle(center.surface_position(), state)
                            .is_some_and(|angle| in_broadside_window(angle, *broadside))
                })
                .collect(),
        };

        if found.is_empty() && self.always_include_subsatellite_region {
            if let Some(nadir) = index.region_at(subpoint) {
                found.push(nadir);
            }
        }
        Ok(found)
    }

    /// Point test for one mission's angles, mirroring [`Self::contained_regions`].
    ///
    /// A cone whose mission angle equals the across-mission envelope is
    /// skipped, since the region list was already built with it.
    pub fn inside_access_pattern(
        &self,
        mission: &str,
        target: DVec3,
        state: &VehicleState,
    ) -> Result<bool, AccessPatternError> {
        let (outer, inner) = self.elevation_angles(AngleSelector::Mission(mission))?;
        let elevation = elevation_angle(target, state.position);

        let outer_is_envelope = Some(outer) == self.outer.minimum_angle();
        if !outer_is_envelope && elevation < outer {
            return Ok(false);
        }

        let (Some(inner_angle), Some(inner_data)) = (inner, self.shape.inner()) else {
            return Ok(true);
        };
        let inner_is_envelope = Some(inner_angle) == inner_data.maximum_angle();
        if outer_is_envelope && inner_is_envelope {
            return Ok(true);
        }

        let inside = match &self.shape {
            PatternShape::Cone => true,
            PatternShape::Donut { .. } => inner_is_envelope || elevation <= inner_angle,
            PatternShape::Axeblade { broadside, .. } => {
                let min_angle = earth_angle_from_elevation(inner_angle, state.radius());
                let target_point = GeoPoint::from_position(target);
                (inner_is_envelope
                    || outside_squint_exclusion(&target_point, &state.subpoint(), state, min_angle))
                    && ground_track_angle(target, state)
                        .is_some_and(|angle| in_broadside_window(angle, *broadside))
            }
            PatternShape::Butterfly { broadside, .. } => {
                (inner_is_envelope || elevation <= inner_angle)
                    && squint_angle(target, state)
                        .is_some_and(|angle| in_broadside_window(angle, *broadside))
            }
        };
        Ok(inside)
    }
}

fn select_angle(
    data: &ConeAngleData,
    selector: AngleSelector<'_>,
    side: ConeSide,
) -> Result<f64, AccessPatternError> {
    let envelope = || match side {
        ConeSide::Outer => data.minimum_angle(),
        ConeSide::Inner => data.maximum_angle(),
    };
    let (angle, mission) = match selector {
        AngleSelector::Mission(tag) => (data.angle_for(tag), tag),
        AngleSelector::Revisit => (data.angle_for(REVISIT_TAG), REVISIT_TAG),
        AngleSelector::Largest => (envelope(), "LARGEST"),
        AngleSelector::Default => (data.default_angle(), "DEFAULT"),
        AngleSelector::Crisis => (data.angle_for(CRISIS_TAG).or_else(envelope), CRISIS_TAG),
    };
    angle.ok_or_else(|| AccessPatternError::MissingAngle {
        mission: mission.to_string(),
        side,
    })
}

/// The inner exclusion zone widens as the look direction swings toward the
/// velocity vector: `min_angle / sin(squint)`.
fn outside_squint_exclusion(
    target: &GeoPoint,
    subpoint: &GeoPoint,
    state: &VehicleState,
    min_angle: f64,
) -> bool {
    let Some(squint) = squint_angle(target.surface_position(), state) else {
        return false;
    };
    let sin_squint = squint.sin();
    if sin_squint <= SIN_EPSILON {
        return false;
    }
    subpoint.earth_angle_to(target) >= min_angle / sin_squint
}

fn in_broadside_window(angle: f64, broadside: f64) -> bool {
    angle >= broadside && angle <= PI - broadside
}
