use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// A dataset feature the user can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    Temperature,
    TotalPrecipitation,
    AverageWindSpeed,
    RelativeHumidity,
    Slope,
    Aspect,
    Elevation,
    Ndvi,
}

impl Feature {
    pub const ALL: [Feature; 8] = [
        Feature::Temperature,
        Feature::TotalPrecipitation,
        Feature::AverageWindSpeed,
        Feature::RelativeHumidity,
        Feature::Slope,
        Feature::Aspect,
        Feature::Elevation,
        Feature::Ndvi,
    ];

    /// Human-readable label, matching the original feature list.
    pub fn label(&self) -> &'static str {
        match self {
            Feature::Temperature => "Temperature",
            Feature::TotalPrecipitation => "Total Precipitation",
            Feature::AverageWindSpeed => "Average Wind Speed",
            Feature::RelativeHumidity => "Relative Humidity",
            Feature::Slope => "Slope",
            Feature::Aspect => "Aspect",
            Feature::Elevation => "Elevation",
            Feature::Ndvi => "NDVI",
        }
    }

    /// Column name in the final dataset.
    pub fn column(&self) -> &'static str {
        match self {
            Feature::Temperature => "T",
            Feature::TotalPrecipitation => "Prcp",
            Feature::AverageWindSpeed => "Ws",
            Feature::RelativeHumidity => "RelHum",
            Feature::Slope => "slope",
            Feature::Aspect => "aspect",
            Feature::Elevation => "elevation",
            Feature::Ndvi => "NDVI",
        }
    }

    /// True for features sourced from the reanalysis API.
    pub fn is_climate(&self) -> bool {
        matches!(
            self,
            Feature::Temperature
                | Feature::TotalPrecipitation
                | Feature::AverageWindSpeed
                | Feature::RelativeHumidity
        )
    }

    /// True for features derived from the elevation raster.
    pub fn is_terrain(&self) -> bool {
        matches!(self, Feature::Slope | Feature::Aspect | Feature::Elevation)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Feature {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        Feature::ALL
            .into_iter()
            .find(|f| {
                f.label().to_lowercase() == normalized || f.column().to_lowercase() == normalized
            })
            .ok_or_else(|| PipelineError::InvalidFeature(s.to_string()))
    }
}
