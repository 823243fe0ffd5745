//! Climate feature tables from ERA5 single-levels reanalysis: direct
//! variables sampled at grid centroids, wind speed and relative humidity
//! derived from component series.

use std::path::Path;

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::info;

use crate::clients::cds::{CdsClient, ReanalysisRequest};
use crate::error::{PipelineError, Result};
use crate::models::grid::ProvincialGrid;
use crate::models::table::DailyTable;
use crate::models::{Feature, Province};
use crate::readers::reanalysis;
use crate::spatial::crs::Crs;
use crate::spatial::raster::Resampling;
use crate::utils::constants::{
    ERA5_DATASET, MAX_KELVIN, MIN_KELVIN, REANALYSIS_FILE, REANALYSIS_REPROJECTED_FILE,
};
use crate::utils::dates;
use crate::writers::geotiff;

/// ERA5 variables the builder can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClimateVariable {
    Temperature2m,
    TotalPrecipitation,
    WindU10,
    WindV10,
    Dewpoint2m,
}

impl ClimateVariable {
    /// Request name on the CDS API.
    fn cds_name(&self) -> &'static str {
        match self {
            ClimateVariable::Temperature2m => "2m_temperature",
            ClimateVariable::TotalPrecipitation => "total_precipitation",
            ClimateVariable::WindU10 => "10m_u_component_of_wind",
            ClimateVariable::WindV10 => "10m_v_component_of_wind",
            ClimateVariable::Dewpoint2m => "2m_dewpoint_temperature",
        }
    }

    /// Short variable name inside the delivered NetCDF.
    fn short_name(&self) -> &'static str {
        match self {
            ClimateVariable::Temperature2m => "t2m",
            ClimateVariable::TotalPrecipitation => "tp",
            ClimateVariable::WindU10 => "u10",
            ClimateVariable::WindV10 => "v10",
            ClimateVariable::Dewpoint2m => "d2m",
        }
    }

    /// Column name of the sampled series.
    fn column(&self) -> &'static str {
        match self {
            ClimateVariable::Temperature2m => "T",
            ClimateVariable::TotalPrecipitation => "Prcp",
            ClimateVariable::WindU10 => "unorm",
            ClimateVariable::WindV10 => "vnorm",
            ClimateVariable::Dewpoint2m => "dew",
        }
    }
}

/// Wind speed from the 10 m u/v components, both in m/s.
pub fn wind_speed(u: f64, v: f64) -> f64 {
    (u * u + v * v).sqrt()
}

/// Relative humidity in percent from air and dewpoint temperature.
///
/// Inputs are Kelvin — the reanalysis convention. Values outside the
/// physical near-surface range are rejected rather than silently producing
/// nonsense from mis-scaled input.
pub fn relative_humidity(t_kelvin: f64, dew_kelvin: f64) -> Result<f64> {
    for value in [t_kelvin, dew_kelvin] {
        if !(MIN_KELVIN..=MAX_KELVIN).contains(&value) {
            return Err(PipelineError::InvalidFormat(format!(
                "temperature {} K outside the physical range; expected Kelvin input",
                value
            )));
        }
    }
    let es_dew = (17.625 * (dew_kelvin - 273.15) / (dew_kelvin - 30.11)).exp();
    let es_t = (17.625 * (t_kelvin - 273.15) / (t_kelvin - 30.11)).exp();
    Ok((100.0 * es_dew / es_t).min(100.0))
}

pub struct ClimateDatasetBuilder {
    province: Province,
    year: i32,
    months: Vec<u32>,
}

impl ClimateDatasetBuilder {
    pub fn new(province: Province, year: i32, months: Vec<u32>) -> Self {
        Self {
            province,
            year,
            months,
        }
    }

    /// Build the combined climate table for the requested features, outer-
    /// joined on (grid id, date).
    pub async fn build(
        &self,
        dir: &Path,
        grid: &ProvincialGrid,
        cds: &CdsClient,
        features: &[Feature],
    ) -> Result<DailyTable> {
        let mut tables: Vec<DailyTable> = Vec::new();
        let mut temperature: Option<DailyTable> = None;

        if features.contains(&Feature::Temperature) {
            let series = self
                .variable_series(dir, grid, cds, ClimateVariable::Temperature2m)
                .await?;
            temperature = Some(series.clone());
            tables.push(series);
        }

        if features.contains(&Feature::TotalPrecipitation) {
            tables.push(
                self.variable_series(dir, grid, cds, ClimateVariable::TotalPrecipitation)
                    .await?,
            );
        }

        if features.contains(&Feature::AverageWindSpeed) {
            let u = self
                .variable_series(dir, grid, cds, ClimateVariable::WindU10)
                .await?;
            let v = self
                .variable_series(dir, grid, cds, ClimateVariable::WindV10)
                .await?;
            let joined = u.inner_join(v);
            tables.push(derive_column(&joined, "unorm", "vnorm", "Ws", |u, v| {
                Ok(wind_speed(u, v))
            })?);
        }

        if features.contains(&Feature::RelativeHumidity) {
            // reuse this run's temperature series instead of re-downloading
            let t = match temperature.take() {
                Some(series) => series,
                None => {
                    self.variable_series(dir, grid, cds, ClimateVariable::Temperature2m)
                        .await?
                }
            };
            let dew = self
                .variable_series(dir, grid, cds, ClimateVariable::Dewpoint2m)
                .await?;
            let joined = t.inner_join(dew);
            tables.push(derive_column(&joined, "T", "dew", "RelHum", relative_humidity)?);
        }

        tables
            .into_iter()
            .reduce(|left, right| left.outer_join(right))
            .ok_or_else(|| {
                PipelineError::DataMerge("no climate feature produced a table".to_string())
            })
    }

    /// Download one variable, reproject it to the grid CRS, and sample every
    /// centroid for every daily band.
    async fn variable_series(
        &self,
        dir: &Path,
        grid: &ProvincialGrid,
        cds: &CdsClient,
        variable: ClimateVariable,
    ) -> Result<DailyTable> {
        let dataset_path = dir.join(REANALYSIS_FILE);
        if dataset_path.exists() {
            std::fs::remove_file(&dataset_path)?;
        }

        let bbox = self.province.bounding_box();
        let request =
            ReanalysisRequest::daily_noon(variable.cds_name(), self.year, &self.months, &bbox);
        cds.retrieve(ERA5_DATASET, &request, &dataset_path).await?;

        let raster = reanalysis::read_reanalysis(&dataset_path, variable.short_name())?;
        let reprojected = raster.reproject(&Crs::Geographic, &grid.crs, Resampling::Bilinear)?;
        geotiff::write_raster(&dir.join(REANALYSIS_REPROJECTED_FILE), &reprojected)?;

        let days = dates::days_in_months(self.year, &self.months);
        if reprojected.band_count() != days.len() {
            return Err(PipelineError::InvalidFormat(format!(
                "{} delivered {} daily bands for {} requested days",
                variable.cds_name(),
                reprojected.band_count(),
                days.len()
            )));
        }

        let mut values: BTreeMap<(u32, NaiveDate), f64> = BTreeMap::new();
        for (id, centroid) in grid.centroids() {
            let Some(samples) = reprojected.sample(centroid.x(), centroid.y()) else {
                continue;
            };
            for (day, sample) in days.iter().zip(samples) {
                if sample.is_finite() {
                    values.insert((id, *day), sample as f64);
                }
            }
        }

        info!(
            "sampled {} into {} rows",
            variable.cds_name(),
            values.len()
        );
        Ok(DailyTable::from_column(variable.column(), values))
    }
}

/// Apply a binary derivation to two columns of a joined table, producing a
/// single-column table.
fn derive_column(
    joined: &DailyTable,
    left: &str,
    right: &str,
    name: &str,
    derive: impl Fn(f64, f64) -> Result<f64>,
) -> Result<DailyTable> {
    let left_idx = joined
        .column_index(left)
        .ok_or_else(|| PipelineError::DataMerge(format!("missing column {}", left)))?;
    let right_idx = joined
        .column_index(right)
        .ok_or_else(|| PipelineError::DataMerge(format!("missing column {}", right)))?;

    let mut values = BTreeMap::new();
    for (key, row) in joined.rows() {
        if let (Some(a), Some(b)) = (row[left_idx], row[right_idx]) {
            values.insert(*key, derive(a, b)?);
        }
    }
    Ok(DailyTable::from_column(name, values))
}
