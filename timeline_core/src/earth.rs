//! Latitude-binned partition of the globe into rectangular regions.
//!
//! Regions live in an arena owned by [`SpatialIndex`]; everything else in the
//! crate refers to them through [`RegionId`]. Within a latitude bin the regions
//! are ordered west→east, which lets cone queries stop as soon as the run of
//! qualifying regions ends.

use std::collections::{HashMap, HashSet};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

use bevy::prelude::Resource;
use bitflags::bitflags;
use timeline_schema::RegionTableBlock;

use crate::geometry::{wrap_longitude, GeoPoint};
use crate::region_config::RegionTableError;

/// Largest sub-region number that still fits the two fractional digits of a
/// full region number.
pub const MAX_SUB_REGIONS: u32 = 99;
const SUB_REGION_SCALE: u64 = 100;
const POLE_EPSILON: f64 = 1e-12;

#[inline]
fn closes_at_pole(north: f64) -> bool {
    north >= FRAC_PI_2 - POLE_EPSILON
}

/// Arena index of a region inside its [`SpatialIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub u32);

impl RegionId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Region number with its sub-region folded in, stored exactly as
/// `number * 100 + sub_region`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FullRegionNumber(u64);

impl FullRegionNumber {
    pub fn new(number: u32, sub_region: Option<u32>) -> Self {
        Self(number as u64 * SUB_REGION_SCALE + sub_region.unwrap_or(0) as u64)
    }

    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        Some(Self((value * SUB_REGION_SCALE as f64).round() as u64))
    }

    pub fn number(self) -> u32 {
        (self.0 / SUB_REGION_SCALE) as u32
    }

    pub fn sub_region(self) -> Option<u32> {
        match (self.0 % SUB_REGION_SCALE) as u32 {
            0 => None,
            sub => Some(sub),
        }
    }

    pub fn as_f64(self) -> f64 {
        self.number() as f64 + self.sub_region().unwrap_or(0) as f64 / SUB_REGION_SCALE as f64
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RegionFlags: u8 {
        const LAND = 1 << 0;
        const REVISIT = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServiceTierAccess {
    pub access_level: u32,
    pub area_of_interest: bool,
}

/// Latitude/longitude bounds in radians. `west > east` wraps the date line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionBounds {
    pub north: f64,
    pub south: f64,
    pub west: f64,
    pub east: f64,
}

impl RegionBounds {
    pub fn from_degrees(north: f64, south: f64, west: f64, east: f64) -> Self {
        Self {
            north: north.to_radians(),
            south: south.to_radians(),
            west: west.to_radians(),
            east: east.to_radians(),
        }
    }

    pub fn longitude_span(&self) -> f64 {
        let span = self.east - self.west;
        if span <= 0.0 {
            span + TAU
        } else {
            span
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    full_number: FullRegionNumber,
    bounds: RegionBounds,
    flags: RegionFlags,
    geo_label: String,
    service_tiers: Vec<ServiceTierAccess>,
}

impl Region {
    pub fn new(
        number: u32,
        sub_region: Option<u32>,
        bounds: RegionBounds,
        flags: RegionFlags,
        geo_label: impl Into<String>,
        service_tiers: Vec<ServiceTierAccess>,
    ) -> Self {
        Self {
            full_number: FullRegionNumber::new(number, sub_region),
            bounds,
            flags,
            geo_label: geo_label.into(),
            service_tiers,
        }
    }

    pub fn number(&self) -> u32 {
        self.full_number.number()
    }

    pub fn sub_region(&self) -> Option<u32> {
        self.full_number.sub_region()
    }

    pub fn full_number(&self) -> FullRegionNumber {
        self.full_number
    }

    pub fn bounds(&self) -> &RegionBounds {
        &self.bounds
    }

    pub fn flags(&self) -> RegionFlags {
        self.flags
    }

    pub fn is_land(&self) -> bool {
        self.flags.contains(RegionFlags::LAND)
    }

    pub fn is_revisit_eligible(&self) -> bool {
        self.flags.contains(RegionFlags::REVISIT)
    }

    pub fn geo_label(&self) -> &str {
        &self.geo_label
    }

    pub fn service_tiers(&self) -> &[ServiceTierAccess] {
        &self.service_tiers
    }

    pub fn access_level(&self, tier: usize) -> u32 {
        self.service_tiers
            .get(tier)
            .map(|entry| entry.access_level)
            .unwrap_or(0)
    }

    pub fn is_area_of_interest(&self, tier: usize) -> bool {
        self.service_tiers
            .get(tier)
            .map(|entry| entry.area_of_interest)
            .unwrap_or(false)
    }

    pub fn center(&self) -> GeoPoint {
        let latitude = (self.bounds.north + self.bounds.south) * 0.5;
        let longitude = self.bounds.west + self.bounds.longitude_span() * 0.5;
        GeoPoint::new(latitude, longitude)
    }

    fn contains_latitude(&self, latitude: f64) -> bool {
        latitude >= self.bounds.south
            && (latitude < self.bounds.north
                || (closes_at_pole(self.bounds.north) && latitude <= self.bounds.north))
    }

    fn contains_longitude(&self, longitude: f64) -> bool {
        if self.bounds.longitude_span() >= TAU - POLE_EPSILON {
            return true;
        }
        let longitude = wrap_longitude(longitude);
        let west = wrap_longitude(self.bounds.west);
        let east = wrap_longitude(self.bounds.east);
        if west < east {
            west <= longitude && longitude < east
        } else {
            // Crosses the date line (an east edge at 180° wraps to -180°).
            longitude >= west || longitude < east
        }
    }

    /// Half-open containment: `[south, north) × [west, east)`, with the north
    /// pole closed so every point on the globe has at most one owner.
    pub fn contains(&self, point: GeoPoint) -> bool {
        self.contains_latitude(point.latitude) && self.contains_longitude(point.longitude)
    }

    /// Angular distance from `point` to the closest point of this region.
    pub fn earth_angle_to_nearest(&self, point: &GeoPoint) -> f64 {
        if self.contains(*point) {
            return 0.0;
        }
        if self.contains_longitude(point.longitude) {
            let clamped = point.latitude.clamp(self.bounds.south, self.bounds.north);
            return (point.latitude - clamped).abs();
        }
        let west = self.meridian_segment_distance(point, self.bounds.west);
        let east = self.meridian_segment_distance(point, self.bounds.east);
        west.min(east)
    }

    fn meridian_segment_distance(&self, point: &GeoPoint, longitude: f64) -> f64 {
        let dlon = wrap_longitude(point.longitude - longitude);
        let cos_dlon = dlon.cos();
        let closest = if cos_dlon > f64::EPSILON {
            (point.latitude.tan() / cos_dlon).atan()
        } else if point.latitude >= 0.0 {
            self.bounds.north
        } else {
            self.bounds.south
        };
        let latitude = closest.clamp(self.bounds.south, self.bounds.north);
        point.earth_angle_to(&GeoPoint::new(latitude, longitude))
    }
}

#[derive(Debug, Clone)]
struct LatitudeBin {
    south: f64,
    north: f64,
    regions: Vec<RegionId>,
    min_number: FullRegionNumber,
    max_number: FullRegionNumber,
}

impl LatitudeBin {
    fn contains_latitude(&self, latitude: f64) -> bool {
        latitude >= self.south
            && (latitude < self.north || (closes_at_pole(self.north) && latitude <= self.north))
    }

    fn overlaps(&self, low: f64, high: f64) -> bool {
        self.north >= low && self.south <= high
    }
}

/// The globe's region partition. Built once and read-only afterwards.
#[derive(Resource, Debug, Clone)]
pub struct SpatialIndex {
    regions: Vec<Region>,
    bins: Vec<LatitudeBin>,
    service_tier_count: usize,
    sub_regions_enabled: bool,
}

impl SpatialIndex {
    /// Validate a region table and bin its rows.
    pub fn build(table: &RegionTableBlock) -> Result<Self, RegionTableError> {
        let regions = crate::region_config::expand_region_table(table)?;
        let mut seen = HashSet::new();
        for region in &regions {
            if !seen.insert(region.full_number()) {
                return Err(RegionTableError::Duplicate {
                    number: region.full_number().as_f64(),
                });
            }
        }
        Ok(Self::from_regions(
            regions,
            table.service_tier_count,
            table.sub_regions_enabled(),
        ))
    }

    /// Bin already-validated regions.
    pub fn from_regions(
        regions: Vec<Region>,
        service_tier_count: usize,
        sub_regions_enabled: bool,
    ) -> Self {
        let mut band_slots: HashMap<(u64, u64), usize> = HashMap::new();
        let mut bins: Vec<LatitudeBin> = Vec::new();
        for (idx, region) in regions.iter().enumerate() {
            let id = RegionId(idx as u32);
            let key = (region.bounds.south.to_bits(), region.bounds.north.to_bits());
            let slot = *band_slots.entry(key).or_insert_with(|| {
                bins.push(LatitudeBin {
                    south: region.bounds.south,
                    north: region.bounds.north,
                    regions: Vec::new(),
                    min_number: region.full_number(),
                    max_number: region.full_number(),
                });
                bins.len() - 1
            });
            let bin = &mut bins[slot];
            bin.regions.push(id);
            bin.min_number = bin.min_number.min(region.full_number());
            bin.max_number = bin.max_number.max(region.full_number());
        }

        for bin in &mut bins {
            bin.regions.sort_by(|a, b| {
                let left = &regions[a.index()];
                let right = &regions[b.index()];
                wrap_longitude(left.bounds.west)
                    .total_cmp(&wrap_longitude(right.bounds.west))
                    .then(left.full_number().cmp(&right.full_number()))
            });
        }
        bins.sort_by(|a, b| a.south.total_cmp(&b.south).then(a.north.total_cmp(&b.north)));

        tracing::debug!(
            target: "value_timeline::earth",
            regions = regions.len(),
            bins = bins.len(),
            "spatial_index.built"
        );

        Self {
            regions,
            bins,
            service_tier_count,
            sub_regions_enabled,
        }
    }

    #[inline]
    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id.index()]
    }

    pub fn regions(&self) -> impl Iterator<Item = (RegionId, &Region)> {
        self.regions
            .iter()
            .enumerate()
            .map(|(idx, region)| (RegionId(idx as u32), region))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    pub fn service_tier_count(&self) -> usize {
        self.service_tier_count
    }

    pub fn sub_regions_enabled(&self) -> bool {
        self.sub_regions_enabled
    }

    pub fn region_at(&self, point: GeoPoint) -> Option<RegionId> {
        self.bins
            .iter()
            .filter(|bin| bin.contains_latitude(point.latitude))
            .flat_map(|bin| bin.regions.iter().copied())
            .find(|id| self.region(*id).contains(point))
    }

    pub fn region_by_number(&self, full_number: FullRegionNumber) -> Option<RegionId> {
        self.bins
            .iter()
            .filter(|bin| bin.min_number <= full_number && full_number <= bin.max_number)
            .flat_map(|bin| bin.regions.iter().copied())
            .find(|id| self.region(*id).full_number() == full_number)
    }

    /// Every region (or sub-region) carrying the integer region `number`.
    pub fn regions_with_number(&self, number: u32) -> Vec<RegionId> {
        let low = FullRegionNumber::new(number, None);
        let high = FullRegionNumber::new(number, Some(MAX_SUB_REGIONS));
        let mut found: Vec<RegionId> = self
            .bins
            .iter()
            .filter(|bin| bin.min_number <= high && low <= bin.max_number)
            .flat_map(|bin| bin.regions.iter().copied())
            .filter(|id| self.region(*id).number() == number)
            .collect();
        found.sort_by_key(|id| self.region(*id).full_number());
        found
    }

    /// Latitude band a cone of angular radius `radius` around `latitude`
    /// touches. A band that runs over a pole is reflected back across it,
    /// which turns the far side of the pole into candidates as well.
    pub fn latitude_band(latitude: f64, radius: f64) -> (f64, f64) {
        let mut low = latitude - radius;
        let mut high = latitude + radius;
        if high > FRAC_PI_2 {
            low = low.min(PI - high);
            high = FRAC_PI_2;
        }
        if low < -FRAC_PI_2 {
            high = high.max(-PI - low);
            low = -FRAC_PI_2;
        }
        (low.max(-FRAC_PI_2), high.min(FRAC_PI_2))
    }

    /// Regions within `max_earth_angle` of `center`.
    ///
    /// A region qualifies when its centre is inside the cone, or, with
    /// `include_all`, when any part of it is. Results come bin by bin
    /// (south→north), each bin in west→east order.
    pub fn regions_in_cone(
        &self,
        center: GeoPoint,
        max_earth_angle: f64,
        include_all: bool,
    ) -> Vec<RegionId> {
        let radius = max_earth_angle.max(0.0);
        let (low, high) = Self::latitude_band(center.latitude, radius);
        let qualifies = |id: RegionId| {
            let region = self.region(id);
            let angle = if include_all {
                region.earth_angle_to_nearest(&center)
            } else {
                center.earth_angle_to(&region.center())
            };
            angle <= radius
        };

        let mut found = Vec::new();
        for bin in self.bins.iter().filter(|bin| bin.overlaps(low, high)) {
            let regions = &bin.regions;
            let count = regions.len();

            let mut cursor = 0;
            while cursor < count && !qualifies(regions[cursor]) {
                cursor += 1;
            }
            let run_start = cursor;
            while cursor < count && qualifies(regions[cursor]) {
                found.push(regions[cursor]);
                cursor += 1;
            }
            let run_end = cursor;

            // A run touching the west end may continue from the east end
            // across the date line.
            if run_start == 0 && run_end < count {
                let mut tail = Vec::new();
                let mut back = count;
                while back > run_end && qualifies(regions[back - 1]) {
                    tail.push(regions[back - 1]);
                    back -= 1;
                }
                found.extend(tail.into_iter().rev());
            }
        }
        found
    }
}
