//! Validation and sub-region expansion of the region table.

use std::path::{Path, PathBuf};
use std::{fs, io};

use thiserror::Error;
use timeline_schema::{RegionRecord, RegionTableBlock};

use crate::earth::{
    Region, RegionBounds, RegionFlags, ServiceTierAccess, SpatialIndex, MAX_SUB_REGIONS,
};

#[derive(Debug, Error)]
pub enum RegionTableError {
    #[error("failed to parse region table: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read region table from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("region table contains no regions")]
    Empty,
    #[error(
        "sub-region division counts must be positive (latitude {latitude}, longitude {longitude})"
    )]
    InvalidDivisions { latitude: u32, longitude: u32 },
    #[error("sub-region divisions {latitude}x{longitude} exceed {max} sub-regions per region")]
    TooManySubRegions {
        latitude: u32,
        longitude: u32,
        max: u32,
    },
    #[error("region {region}: north latitude {north} must exceed south latitude {south}")]
    LatitudeOrder { region: u32, north: f64, south: f64 },
    #[error("region {region}: latitude {value} outside [-90, 90]")]
    LatitudeRange { region: u32, value: f64 },
    #[error("region {region}: longitude {value} outside [-180, 180]")]
    LongitudeRange { region: u32, value: f64 },
    #[error("region {region}: west and east longitude are both {value}")]
    ZeroWidth { region: u32, value: f64 },
    #[error("region {region}: expected {expected} service tier entries, found {found}")]
    ServiceTierCount {
        region: u32,
        expected: usize,
        found: usize,
    },
    #[error("region {region}: area-of-interest flag {flag} for service tier {tier} must be 0 or 1")]
    AreaOfInterestFlag { region: u32, tier: usize, flag: u8 },
    #[error("region {region}: service tier {tier} is an area of interest without an access level")]
    AreaOfInterestWithoutAccess { region: u32, tier: usize },
    #[error("duplicate region number {number}")]
    Duplicate { number: f64 },
}

impl SpatialIndex {
    pub fn from_json_str(json: &str) -> Result<Self, RegionTableError> {
        let table: RegionTableBlock = serde_json::from_str(json)?;
        Self::build(&table)
    }

    pub fn from_file(path: &Path) -> Result<Self, RegionTableError> {
        let contents = fs::read_to_string(path).map_err(|source| RegionTableError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }
}

/// Validate every row and split rows into sub-regions when enabled.
pub fn expand_region_table(table: &RegionTableBlock) -> Result<Vec<Region>, RegionTableError> {
    if table.regions.is_empty() {
        return Err(RegionTableError::Empty);
    }
    let latitude_divisions = table.sub_region_latitude_divisions;
    let longitude_divisions = table.sub_region_longitude_divisions;
    if latitude_divisions == 0 || longitude_divisions == 0 {
        return Err(RegionTableError::InvalidDivisions {
            latitude: latitude_divisions,
            longitude: longitude_divisions,
        });
    }
    if latitude_divisions as u64 * longitude_divisions as u64 > MAX_SUB_REGIONS as u64 {
        return Err(RegionTableError::TooManySubRegions {
            latitude: latitude_divisions,
            longitude: longitude_divisions,
            max: MAX_SUB_REGIONS,
        });
    }

    let mut regions = Vec::with_capacity(table.regions.len());
    for row in &table.regions {
        validate_row(row, table.service_tier_count)?;
        let tiers: Vec<ServiceTierAccess> = row
            .service_tiers
            .iter()
            .map(|tier| ServiceTierAccess {
                access_level: tier.access_level,
                area_of_interest: tier.area_of_interest == 1,
            })
            .collect();
        let mut flags = RegionFlags::empty();
        flags.set(RegionFlags::LAND, row.land);
        flags.set(RegionFlags::REVISIT, row.revisit);

        if !table.sub_regions_enabled() {
            regions.push(Region::new(
                row.number,
                None,
                RegionBounds::from_degrees(row.north, row.south, row.west, row.east),
                flags,
                row.geo_label.clone(),
                tiers,
            ));
            continue;
        }

        let lat_step = (row.north - row.south) / latitude_divisions as f64;
        let mut lon_span = row.east - row.west;
        if lon_span <= 0.0 {
            lon_span += 360.0;
        }
        let lon_step = lon_span / longitude_divisions as f64;
        for i in 0..latitude_divisions {
            let south = row.south + i as f64 * lat_step;
            let north = if i + 1 == latitude_divisions {
                row.north
            } else {
                row.south + (i + 1) as f64 * lat_step
            };
            for j in 0..longitude_divisions {
                let west = normalize_degrees(row.west + j as f64 * lon_step);
                let east = if j + 1 == longitude_divisions {
                    row.east
                } else {
                    normalize_degrees(row.west + (j + 1) as f64 * lon_step)
                };
                let sub_region = i * longitude_divisions + j + 1;
                regions.push(Region::new(
                    row.number,
                    Some(sub_region),
                    RegionBounds::from_degrees(north, south, west, east),
                    flags,
                    row.geo_label.clone(),
                    tiers.clone(),
                ));
            }
        }
    }
    Ok(regions)
}

fn normalize_degrees(longitude: f64) -> f64 {
    if longitude > 180.0 {
        longitude - 360.0
    } else {
        longitude
    }
}

fn validate_row(row: &RegionRecord, service_tier_count: usize) -> Result<(), RegionTableError> {
    let region = row.number;
    for value in [row.north, row.south] {
        if !(-90.0..=90.0).contains(&value) {
            return Err(RegionTableError::LatitudeRange { region, value });
        }
    }
    for value in [row.west, row.east] {
        if !(-180.0..=180.0).contains(&value) {
            return Err(RegionTableError::LongitudeRange { region, value });
        }
    }
    if row.north <= row.south {
        return Err(RegionTableError::LatitudeOrder {
            region,
            north: row.north,
            south: row.south,
        });
    }
    if row.west == row.east {
        return Err(RegionTableError::ZeroWidth {
            region,
            value: row.west,
        });
    }
    if row.service_tiers.len() != service_tier_count {
        return Err(RegionTableError::ServiceTierCount {
            region,
            expected: service_tier_count,
            found: row.service_tiers.len(),
        });
    }
    for (tier, entry) in row.service_tiers.iter().enumerate() {
        if entry.area_of_interest > 1 {
            return Err(RegionTableError::AreaOfInterestFlag {
                region,
                tier,
                flag: entry.area_of_interest,
            });
        }
        if entry.area_of_interest == 1 && entry.access_level == 0 {
            return Err(RegionTableError::AreaOfInterestWithoutAccess { region, tier });
        }
    }
    Ok(())
}
