//! Spherical-earth helpers shared by the spatial index and the access patterns.
//!
//! All angles are radians and all positions are Earth-fixed kilometres.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use bevy::math::DVec3;

pub const EARTH_RADIUS_KM: f64 = 6378.137;
pub const EARTH_ROTATION_RAD_S: f64 = 7.292_115_9e-5;
pub const EARTH_MU_KM3_S2: f64 = 398_600.4418;

const SEAM_EPSILON: f64 = 1e-12;

/// Wrap a longitude into `[-π, π)`. Values within rounding distance of the
/// date line snap to exactly `-π`, so 180° and -180° compare equal.
#[inline]
pub fn wrap_longitude(longitude: f64) -> f64 {
    let wrapped = if (-PI..PI).contains(&longitude) {
        longitude
    } else {
        (longitude + PI).rem_euclid(TAU) - PI
    };
    if wrapped >= PI - SEAM_EPSILON || wrapped <= -PI + SEAM_EPSILON {
        -PI
    } else {
        wrapped
    }
}

/// A point on the sphere (geocentric latitude, longitude).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: latitude.clamp(-FRAC_PI_2, FRAC_PI_2),
            longitude: wrap_longitude(longitude),
        }
    }

    pub fn from_degrees(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude.to_radians(), longitude.to_radians())
    }

    pub fn from_position(position: DVec3) -> Self {
        let radius = position.length();
        if radius <= f64::EPSILON {
            return Self::new(0.0, 0.0);
        }
        Self::new(
            (position.z / radius).clamp(-1.0, 1.0).asin(),
            position.y.atan2(position.x),
        )
    }

    pub fn latitude_deg(&self) -> f64 {
        self.latitude.to_degrees()
    }

    pub fn longitude_deg(&self) -> f64 {
        self.longitude.to_degrees()
    }

    pub fn unit_vector(&self) -> DVec3 {
        let (sin_lat, cos_lat) = self.latitude.sin_cos();
        let (sin_lon, cos_lon) = self.longitude.sin_cos();
        DVec3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat)
    }

    pub fn surface_position(&self) -> DVec3 {
        self.unit_vector() * EARTH_RADIUS_KM
    }

    /// Central angle between two surface points (haversine form).
    pub fn earth_angle_to(&self, other: &GeoPoint) -> f64 {
        let half_dlat = (other.latitude - self.latitude) * 0.5;
        let half_dlon = (other.longitude - self.longitude) * 0.5;
        let a = half_dlat.sin().powi(2)
            + self.latitude.cos() * other.latitude.cos() * half_dlon.sin().powi(2);
        2.0 * a.sqrt().clamp(0.0, 1.0).asin()
    }
}

/// Earth-fixed position (km) and velocity (km/s) of a platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    pub position: DVec3,
    pub velocity: DVec3,
}

impl VehicleState {
    pub fn new(position: DVec3, velocity: DVec3) -> Self {
        Self { position, velocity }
    }

    pub fn from_arrays(position_km: [f64; 3], velocity_km_s: [f64; 3]) -> Self {
        Self::new(DVec3::from_array(position_km), DVec3::from_array(velocity_km_s))
    }

    /// Vehicle directly above `point` at `altitude_km`, moving with `velocity`.
    pub fn above(point: GeoPoint, altitude_km: f64, velocity: DVec3) -> Self {
        Self::new(point.unit_vector() * (EARTH_RADIUS_KM + altitude_km), velocity)
    }

    pub fn radius(&self) -> f64 {
        self.position.length()
    }

    pub fn subpoint(&self) -> GeoPoint {
        GeoPoint::from_position(self.position)
    }
}

/// Earth central angle at which a target sees the vehicle at `elevation`.
///
/// With `α = elevation + π/2` and `β = asin(R·sin α / |r|)` the triangle
/// earth-centre/target/vehicle closes at `π − α − β`.
pub fn earth_angle_from_elevation(elevation: f64, vehicle_radius: f64) -> f64 {
    if vehicle_radius <= EARTH_RADIUS_KM {
        return 0.0;
    }
    let alpha = elevation + FRAC_PI_2;
    let beta = (EARTH_RADIUS_KM * alpha.sin() / vehicle_radius)
        .clamp(-1.0, 1.0)
        .asin();
    (PI - alpha - beta).max(0.0)
}

/// Elevation of the vehicle above the target's local horizon.
pub fn elevation_angle(target: DVec3, vehicle: DVec3) -> f64 {
    let line_of_sight = vehicle - target;
    let range = line_of_sight.length();
    let up_len = target.length();
    if range <= f64::EPSILON || up_len <= f64::EPSILON {
        return FRAC_PI_2;
    }
    (line_of_sight.dot(target) / (range * up_len))
        .clamp(-1.0, 1.0)
        .asin()
}

pub fn slant_range(target: DVec3, vehicle: DVec3) -> f64 {
    (vehicle - target).length()
}

fn angle_between(a: DVec3, b: DVec3) -> Option<f64> {
    let norm = a.length() * b.length();
    if norm <= f64::EPSILON {
        return None;
    }
    Some((a.dot(b) / norm).clamp(-1.0, 1.0).acos())
}

/// Angle between the vehicle's line of sight to `target` and its velocity.
///
/// `None` for a stationary vehicle.
pub fn squint_angle(target: DVec3, state: &VehicleState) -> Option<f64> {
    angle_between(target - state.position, state.velocity)
}

/// Angle on the local horizontal plane at the subpoint between the ground
/// track direction and the direction towards `target`.
pub fn ground_track_angle(target: DVec3, state: &VehicleState) -> Option<f64> {
    let up = state.position.normalize_or_zero();
    if up == DVec3::ZERO {
        return None;
    }
    let track = state.velocity - up * state.velocity.dot(up);
    let toward = target - up * target.dot(up);
    angle_between(track, toward)
}
