//! Achievable image quality for a sensor looking at a target.

use std::fmt;

use bevy::math::DVec3;
use timeline_schema::QualityKindTag;

use crate::geometry::{elevation_angle, slant_range, VehicleState};
use crate::sensor::Sensor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityKind {
    /// Ground sample distance; smaller is better.
    Gsd,
    /// Interpretability rating; larger is better.
    Niirs,
}

impl QualityKind {
    /// Whether a calculated quality meets a required one.
    pub fn satisfies(self, calculated: f64, required: f64) -> bool {
        match self {
            QualityKind::Gsd => calculated <= required,
            QualityKind::Niirs => calculated >= required,
        }
    }

    /// The better of two quality values.
    pub fn best(self, a: f64, b: f64) -> f64 {
        match self {
            QualityKind::Gsd => a.min(b),
            QualityKind::Niirs => a.max(b),
        }
    }
}

impl From<QualityKindTag> for QualityKind {
    fn from(tag: QualityKindTag) -> Self {
        match tag {
            QualityKindTag::Gsd => QualityKind::Gsd,
            QualityKindTag::Niirs => QualityKind::Niirs,
        }
    }
}

/// Sensor/target geometry for one quality evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectionGeometry {
    pub target: DVec3,
    pub state: VehicleState,
    pub elevation: f64,
    pub slant_range: f64,
}

impl CollectionGeometry {
    pub fn new(target: DVec3, state: VehicleState) -> Self {
        Self {
            target,
            state,
            elevation: elevation_angle(target, state.position),
            slant_range: slant_range(target, state.position),
        }
    }
}

/// Quality a sensor achieves for a geometry, or `None` when the collection is
/// not possible at all.
pub trait QualityModel: Send + Sync + fmt::Debug {
    fn evaluate(&self, sensor: &Sensor, geometry: &CollectionGeometry) -> Option<f64>;
}

/// Reference model: quality scales with slant range relative to the sensor's
/// reference range. GSD grows linearly; NIIRS drops one level per doubling.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlantRangeQuality;

impl QualityModel for SlantRangeQuality {
    fn evaluate(&self, sensor: &Sensor, geometry: &CollectionGeometry) -> Option<f64> {
        if geometry.elevation < sensor.minimum_elevation.unwrap_or(0.0) {
            return None;
        }
        if geometry.slant_range <= f64::EPSILON || sensor.reference_range_km <= 0.0 {
            return Some(sensor.reference_quality);
        }
        let ratio = geometry.slant_range / sensor.reference_range_km;
        Some(match sensor.quality_kind {
            QualityKind::Gsd => sensor.reference_quality * ratio,
            QualityKind::Niirs => sensor.reference_quality - ratio.log2(),
        })
    }
}
