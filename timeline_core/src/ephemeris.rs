//! Platform state sources. The engine only ever asks for an Earth-fixed
//! position and velocity at a time step.

use std::fmt;

use bevy::math::DVec3;
use timeline_schema::StateRecord;

use crate::geometry::{GeoPoint, VehicleState, EARTH_MU_KM3_S2, EARTH_RADIUS_KM, EARTH_ROTATION_RAD_S};

pub trait Ephemeris: Send + Sync + fmt::Debug {
    /// Earth-fixed state at `time_index`, `elapsed_seconds` after the epoch.
    fn state(&self, time_index: usize, elapsed_seconds: f64) -> VehicleState;
}

/// Precomputed states, one per time step.
#[derive(Debug, Clone, PartialEq)]
pub struct StateTrack {
    states: Vec<VehicleState>,
}

impl StateTrack {
    pub fn new(states: Vec<VehicleState>) -> Self {
        Self { states }
    }

    pub fn from_records(records: &[StateRecord]) -> Self {
        Self::new(
            records
                .iter()
                .map(|record| VehicleState::from_arrays(record.position_km, record.velocity_km_s))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl Ephemeris for StateTrack {
    fn state(&self, time_index: usize, _elapsed_seconds: f64) -> VehicleState {
        self.states[time_index]
    }
}

/// Two-body circular orbit, rotated into the Earth-fixed frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircularOrbit {
    radius: f64,
    inclination: f64,
    raan: f64,
    argument_of_latitude: f64,
    mean_motion: f64,
}

impl CircularOrbit {
    /// Angles in radians.
    pub fn new(altitude_km: f64, inclination: f64, raan: f64, argument_of_latitude: f64) -> Self {
        let radius = EARTH_RADIUS_KM + altitude_km;
        Self {
            radius,
            inclination,
            raan,
            argument_of_latitude,
            mean_motion: (EARTH_MU_KM3_S2 / radius.powi(3)).sqrt(),
        }
    }

    pub fn period_seconds(&self) -> f64 {
        std::f64::consts::TAU / self.mean_motion
    }
}

impl Ephemeris for CircularOrbit {
    fn state(&self, _time_index: usize, elapsed_seconds: f64) -> VehicleState {
        let u = self.argument_of_latitude + self.mean_motion * elapsed_seconds;
        let (sin_u, cos_u) = u.sin_cos();
        let (sin_i, cos_i) = self.inclination.sin_cos();
        let (sin_o, cos_o) = self.raan.sin_cos();

        let position = DVec3::new(
            cos_o * cos_u - sin_o * sin_u * cos_i,
            sin_o * cos_u + cos_o * sin_u * cos_i,
            sin_u * sin_i,
        ) * self.radius;
        let velocity = DVec3::new(
            -cos_o * sin_u - sin_o * cos_u * cos_i,
            -sin_o * sin_u + cos_o * cos_u * cos_i,
            cos_u * sin_i,
        ) * (self.radius * self.mean_motion);

        // Inertial to Earth-fixed: rotate by -ωt about z and remove the
        // frame's rotation from the velocity.
        let theta = EARTH_ROTATION_RAD_S * elapsed_seconds;
        let (sin_t, cos_t) = theta.sin_cos();
        let rotate = |v: DVec3| DVec3::new(cos_t * v.x + sin_t * v.y, -sin_t * v.x + cos_t * v.y, v.z);
        let fixed_position = rotate(position);
        let rotated_velocity = rotate(velocity);
        let fixed_velocity = DVec3::new(
            rotated_velocity.x + EARTH_ROTATION_RAD_S * fixed_position.y,
            rotated_velocity.y - EARTH_ROTATION_RAD_S * fixed_position.x,
            rotated_velocity.z,
        );
        VehicleState::new(fixed_position, fixed_velocity)
    }
}

/// Fixed site on (or above) the surface. It has no velocity in the
/// Earth-fixed frame, so side-looking patterns see nothing from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundSite {
    state: VehicleState,
}

impl GroundSite {
    pub fn new(location: GeoPoint, altitude_km: f64) -> Self {
        Self {
            state: VehicleState::above(location, altitude_km, DVec3::ZERO),
        }
    }
}

impl Ephemeris for GroundSite {
    fn state(&self, _time_index: usize, _elapsed_seconds: f64) -> VehicleState {
        self.state
    }
}
