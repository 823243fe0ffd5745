use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Geographic bounding box in degrees, WGS84.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub west: f64,
    pub south: f64,
    pub east: f64,
}

impl BoundingBox {
    /// `[north, west, south, east]` — the CDS `area` parameter order.
    pub fn as_area(&self) -> [f64; 4] {
        [self.north, self.west, self.south, self.east]
    }

    /// `[west, south, east, north]` — the Sentinel Hub bbox order (CRS84).
    pub fn as_wsen(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }
}

/// Canadian provinces with pre-generated dataset support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Province {
    Alberta,
    BritishColumbia,
    Manitoba,
    NewBrunswick,
    NewfoundlandAndLabrador,
    NovaScotia,
    Ontario,
    Quebec,
    Saskatchewan,
}

impl Province {
    pub const ALL: [Province; 9] = [
        Province::Alberta,
        Province::BritishColumbia,
        Province::Manitoba,
        Province::NewBrunswick,
        Province::NewfoundlandAndLabrador,
        Province::NovaScotia,
        Province::Ontario,
        Province::Quebec,
        Province::Saskatchewan,
    ];

    /// Official name, as it appears in the boundary file's `PRENAME` field.
    pub fn name(&self) -> &'static str {
        match self {
            Province::Alberta => "Alberta",
            Province::BritishColumbia => "British Columbia",
            Province::Manitoba => "Manitoba",
            Province::NewBrunswick => "New Brunswick",
            Province::NewfoundlandAndLabrador => "Newfoundland and Labrador",
            Province::NovaScotia => "Nova Scotia",
            Province::Ontario => "Ontario",
            Province::Quebec => "Quebec",
            Province::Saskatchewan => "Saskatchewan",
        }
    }

    /// Two-letter agency code used by the national fire database.
    pub fn agency_code(&self) -> &'static str {
        match self {
            Province::Alberta => "AB",
            Province::BritishColumbia => "BC",
            Province::Manitoba => "MB",
            Province::NewBrunswick => "NB",
            Province::NewfoundlandAndLabrador => "NL",
            Province::NovaScotia => "NS",
            Province::Ontario => "ON",
            Province::Quebec => "QC",
            Province::Saskatchewan => "SK",
        }
    }

    /// Geographic bounding box used to parameterize all API requests.
    pub fn bounding_box(&self) -> BoundingBox {
        let [north, west, south, east] = match self {
            Province::Alberta => [60.0, -120.0, 49.0, -110.0],
            Province::BritishColumbia => [60.01, -139.04, 48.25, -114.08],
            Province::Manitoba => [60.0, -102.0, 49.0, -94.0],
            Province::NewBrunswick => [48.5, -66.5, 45.5, -63.0],
            Province::NewfoundlandAndLabrador => [61.0, -64.0, 46.0, -52.0],
            Province::NovaScotia => [48.5, -66.0, 43.5, -60.0],
            Province::Ontario => [57.0, -95.0, 41.7, -74.0],
            Province::Quebec => [62.0, -80.0, 44.0, -57.5],
            Province::Saskatchewan => [60.0, -110.0, 49.0, -101.0],
        };
        BoundingBox {
            north,
            west,
            south,
            east,
        }
    }

    /// Directory name: the province name with spaces replaced by underscores.
    pub fn dir_name(&self) -> String {
        self.name().replace(' ', "_")
    }
}

impl fmt::Display for Province {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Province {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        Province::ALL
            .into_iter()
            .find(|p| p.name().to_lowercase() == normalized)
            .ok_or_else(|| PipelineError::InvalidProvince(s.to_string()))
    }
}
