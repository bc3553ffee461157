//! Defines the fixed set of regions the dashboard compares, together with the
//! provider-specific coordinates used to request forecasts for each of them.
//!
//! The table is read-only once built. It is normally the built-in Daegu/Gyeongbuk
//! table, optionally replaced by a `regions.json` file in the user's config directory.

use crate::regions::error::RegionTableError;
use crate::utils::get_config_dir;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

const REGIONS_FILE_NAME: &str = "regions.json";

/// Mid-term temperature forecast zone covering all Daegu districts.
const DAEGU_MID_TERM_ZONE: &str = "11H10701";

// key, display name, nx, ny, mid-term zone
const BUILTIN_REGIONS: &[(&str, &str, u32, u32, &str)] = &[
    ("daegu-jung", "Daegu Jung-gu", 89, 90, DAEGU_MID_TERM_ZONE),
    ("daegu-suseong", "Daegu Suseong-gu", 90, 89, DAEGU_MID_TERM_ZONE),
    ("daegu-dalseo", "Daegu Dalseo-gu", 88, 89, DAEGU_MID_TERM_ZONE),
    ("daegu-buk", "Daegu Buk-gu", 89, 91, DAEGU_MID_TERM_ZONE),
    ("daegu-dong", "Daegu Dong-gu", 90, 90, DAEGU_MID_TERM_ZONE),
    ("daegu-nam", "Daegu Nam-gu", 88, 88, DAEGU_MID_TERM_ZONE),
    ("daegu-seo", "Daegu Seo-gu", 87, 89, DAEGU_MID_TERM_ZONE),
    ("daegu-dalseong", "Daegu Dalseong-gun", 85, 86, DAEGU_MID_TERM_ZONE),
    ("gumi", "Gumi", 76, 100, "11H10602"),
    ("pohang", "Pohang", 102, 95, "11H10201"),
    ("gyeongju", "Gyeongju", 100, 89, "11H10202"),
    ("andong", "Andong", 91, 106, "11H10501"),
    ("gimcheon", "Gimcheon", 77, 97, "11H10601"),
    ("yeongcheon", "Yeongcheon", 94, 90, "11H10702"),
    ("cheongdo", "Cheongdo", 89, 87, "11H10704"),
];

/// Provider-specific coordinates of a region.
///
/// The core never interprets these; they are handed to the
/// [`crate::WeatherProvider`] unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridPoint {
    /// Village forecast grid column.
    pub nx: u32,
    /// Village forecast grid row.
    pub ny: u32,
    /// Mid-term temperature forecast zone id (e.g. "11H10701"), if one covers the region.
    #[serde(default)]
    pub mid_term_zone: Option<String>,
}

/// A named geographic area that can be selected on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    /// Stable identifier, unique within a [`RegionTable`] (e.g. "daegu-jung").
    pub key: String,
    /// Human-readable name shown next to extremes and failures.
    pub display_name: String,
    /// Coordinates passed to the provider.
    pub coordinates: GridPoint,
}

/// Process-wide, read-only lookup from region key to [`Region`].
///
/// Iteration is ordered by region key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionTable {
    regions: BTreeMap<String, Region>,
}

impl RegionTable {
    /// The built-in table of Daegu districts and surrounding Gyeongbuk cities.
    pub fn builtin() -> Self {
        let regions = BUILTIN_REGIONS
            .iter()
            .map(|&(key, display_name, nx, ny, zone)| {
                let region = Region {
                    key: key.to_string(),
                    display_name: display_name.to_string(),
                    coordinates: GridPoint {
                        nx,
                        ny,
                        mid_term_zone: Some(zone.to_string()),
                    },
                };
                (region.key.clone(), region)
            })
            .collect();
        Self { regions }
    }

    /// Builds a table from a list of regions.
    ///
    /// # Errors
    ///
    /// Returns [`RegionTableError::Empty`] for an empty list,
    /// [`RegionTableError::EmptyKey`] for a blank key and
    /// [`RegionTableError::DuplicateKey`] if two regions share a key.
    pub fn from_regions(regions: Vec<Region>) -> Result<Self, RegionTableError> {
        if regions.is_empty() {
            return Err(RegionTableError::Empty);
        }
        let mut table = BTreeMap::new();
        for region in regions {
            if region.key.trim().is_empty() {
                return Err(RegionTableError::EmptyKey(region.display_name));
            }
            if table.contains_key(&region.key) {
                return Err(RegionTableError::DuplicateKey(region.key));
            }
            table.insert(region.key.clone(), region);
        }
        Ok(Self { regions: table })
    }

    /// Parses a JSON array of regions.
    pub fn from_json_str(json: &str) -> Result<Self, RegionTableError> {
        let regions: Vec<Region> = serde_json::from_str(json)?;
        Self::from_regions(regions)
    }

    /// Reads and parses a JSON array of regions from `path`.
    pub async fn from_json_file(path: &Path) -> Result<Self, RegionTableError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RegionTableError::Read(path.to_path_buf(), e))?;
        let regions: Vec<Region> = serde_json::from_slice(&bytes)
            .map_err(|e| RegionTableError::Parse(path.to_path_buf(), e))?;
        Self::from_regions(regions)
    }

    /// Loads `regions.json` from the user's config directory, falling back to
    /// [`RegionTable::builtin`] when there is no such file.
    ///
    /// # Errors
    ///
    /// A file that exists but cannot be read or parsed is an error; it is not
    /// silently replaced by the built-in table.
    pub async fn load() -> Result<Self, RegionTableError> {
        match get_config_dir() {
            Some(dir) => Self::load_from_dir(&dir).await,
            None => {
                warn!("Could not determine config directory, using built-in region table");
                Ok(Self::builtin())
            }
        }
    }

    pub(crate) async fn load_from_dir(dir: &Path) -> Result<Self, RegionTableError> {
        let path = dir.join(REGIONS_FILE_NAME);
        match tokio::fs::metadata(&path).await {
            Ok(_) => {
                let table = Self::from_json_file(&path).await?;
                info!("Loaded {} regions from {}", table.len(), path.display());
                Ok(table)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(
                    "No region table at {}, using built-in table",
                    path.display()
                );
                Ok(Self::builtin())
            }
            Err(e) => Err(RegionTableError::Read(path, e)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Region> {
        self.regions.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.regions.contains_key(key)
    }

    /// Display name for `key`, or the key itself when the region is unknown.
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.regions
            .get(key)
            .map(|r| r.display_name.as_str())
            .unwrap_or(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl Default for RegionTable {
    fn default() -> Self {
        Self::builtin()
    }
}
