//! Weekly NDVI composites aggregated to grid cells and expanded to daily
//! rows.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::info;

use crate::clients::sentinel::SentinelHubClient;
use crate::error::{PipelineError, Result};
use crate::models::grid::ProvincialGrid;
use crate::models::table::{DailyTable, StaticTable};
use crate::models::Province;
use crate::readers::geotiff;
use crate::spatial::crs::Crs;
use crate::spatial::raster::{GeoTransform, Raster};
use crate::spatial::zonal;
use crate::utils::constants::RESOLUTION_METERS;
use crate::utils::{dates, resolution};

pub struct NdviDatasetBuilder {
    province: Province,
    year: i32,
    months: Vec<u32>,
}

impl NdviDatasetBuilder {
    pub fn new(province: Province, year: i32, months: Vec<u32>) -> Self {
        Self {
            province,
            year,
            months,
        }
    }

    /// One least-cloud-cover composite per week, averaged per grid cell,
    /// inner-joined across weeks, then expanded to one row per day.
    pub async fn build(
        &self,
        grid: &ProvincialGrid,
        client: &SentinelHubClient,
    ) -> Result<DailyTable> {
        let days = dates::days_in_months(self.year, &self.months);
        let weeks = dates::group_into_weeks(&days);
        if weeks.is_empty() {
            return Err(PipelineError::MissingData(
                "no days in the requested months".to_string(),
            ));
        }

        let bbox = self.province.bounding_box();
        let size = resolution::image_dimensions(&bbox, RESOLUTION_METERS);
        // pixel centers interpolate linearly across the bounding box,
        // row 0 at the northern edge
        let transform =
            GeoTransform::from_extent(bbox.west, bbox.east, bbox.south, bbox.north, size.0, size.1);

        let mut weekly: Option<StaticTable> = None;
        for (index, week) in weeks.iter().enumerate() {
            let column = format!("NDVI_{}", index + 1);
            let start = week[0];
            let end = *week.last().unwrap();
            info!("building {} ({} to {})", column, start, end);

            let image = client.fetch_ndvi_composite(&bbox, size, start, end).await?;
            let raster = Raster::from_band(geotiff::read_band_bytes(&image)?, transform);
            let means = zonal::zonal_mean(&raster, 0, &Crs::Geographic, &grid.cells, &grid.crs);
            let table = StaticTable::from_column(&column, means);

            weekly = Some(match weekly.take() {
                Some(joined) => joined.inner_join(table),
                None => table,
            });
        }

        let weekly = weekly.ok_or_else(|| {
            PipelineError::MissingData("no weekly composite was produced".to_string())
        })?;
        Ok(expand_weekly_to_daily(&weekly, &weeks))
    }
}

/// Give every day of each week its week's per-cell value.
fn expand_weekly_to_daily(weekly: &StaticTable, weeks: &[Vec<NaiveDate>]) -> DailyTable {
    let mut values: BTreeMap<(u32, NaiveDate), f64> = BTreeMap::new();
    for (&grid_id, row) in weekly.rows() {
        for (index, week) in weeks.iter().enumerate() {
            let Some(value) = row[index] else { continue };
            for &day in week {
                values.insert((grid_id, day), value);
            }
        }
    }
    DailyTable::from_column("NDVI", values)
}
