use std::path::PathBuf;

use validator::Validate;

use crate::error::Result;
use crate::models::{Feature, Province};

/// A validated dataset-build request: the whole pipeline is a function of
/// this plus the filesystem.
#[derive(Debug, Clone, Validate)]
pub struct BuildRequest {
    pub province: Province,

    #[validate(range(min = 1940, max = 2024))]
    pub year: i32,

    #[validate(length(min = 1, message = "select at least one month"))]
    pub months: Vec<u32>,

    #[validate(length(min = 1, message = "select at least one feature"))]
    pub features: Vec<Feature>,

    /// Optional national fire dataset, used once to derive the provincial
    /// subset when `FireData.shp` does not exist yet.
    pub fire_data: Option<PathBuf>,

    /// Base directory holding the per-province data directories.
    pub data_dir: PathBuf,
}

impl BuildRequest {
    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// The per-province working directory for this request.
    pub fn province_dir(&self) -> PathBuf {
        self.data_dir.join(self.province.dir_name())
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    pub fn climate_features(&self) -> Vec<Feature> {
        self.features.iter().copied().filter(Feature::is_climate).collect()
    }

    pub fn terrain_features(&self) -> Vec<Feature> {
        self.features.iter().copied().filter(Feature::is_terrain).collect()
    }
}
