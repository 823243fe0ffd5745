//! The pipeline as plain functions of (province, year, months, features,
//! paths): callable from the CLI or any other front end. Each run works
//! through a per-province directory; there is no process-wide state.

use std::path::{Path, PathBuf};

use tracing::info;
use validator::Validate;

use crate::clients::cds::CdsClient;
use crate::clients::sentinel::SentinelHubClient;
use crate::clients::ApiCredentials;
use crate::error::{PipelineError, Result};
use crate::models::{BuildRequest, Feature, Province};
use crate::processors::{
    ClimateDatasetBuilder, DatasetMerger, FireDatasetBuilder, GridBuilder, NdviDatasetBuilder,
    TerrainDatasetBuilder,
};
use crate::readers::grid as grid_reader;
use crate::utils::constants::{CENTROIDS_FILE, FIRE_FILE, GRID_FILE, PROVINCE_FILE};
use crate::utils::dates;
use crate::writers::csv_writer;

/// Build the provincial boundary, grid and centroid layers. No-op when they
/// already exist.
pub fn build_provincial_layers(
    province: Province,
    boundary_path: &Path,
    data_dir: &Path,
    cell_size: Option<(f64, f64)>,
) -> Result<PathBuf> {
    let dir = data_dir.join(province.dir_name());
    let mut builder = GridBuilder::new(province, boundary_path);
    if let Some((width, height)) = cell_size {
        builder = builder.with_cell_size(width, height);
    }
    builder.build(&dir)?;
    Ok(dir)
}

/// Run the dataset pipeline and write `Final_Dataset_<year>.csv`.
///
/// Validation failures abort before any side effect; downloads and joins run
/// strictly sequentially.
pub async fn build_dataset(request: &BuildRequest) -> Result<PathBuf> {
    request.validate()?;

    let dir = request.province_dir();
    if !dir.join(PROVINCE_FILE).exists()
        || !dir.join(GRID_FILE).exists()
        || !dir.join(CENTROIDS_FILE).exists()
    {
        return Err(PipelineError::MissingData(format!(
            "provincial datasets for {} not generated yet",
            request.province
        )));
    }
    if !dir.join(FIRE_FILE).exists() && request.fire_data.is_none() {
        return Err(PipelineError::MissingData(
            "provincial fire dataset missing and no national fire data supplied".to_string(),
        ));
    }

    let fire_builder =
        FireDatasetBuilder::new(request.province, request.year, request.months.clone());
    if let Some(national) = &request.fire_data {
        fire_builder.ensure_provincial_subset(&dir, national)?;
    }

    let grid = grid_reader::load_grid(&dir)?;
    info!("loaded {} grid cells for {}", grid.len(), request.province);

    let fire_table = fire_builder.build(&dir, &grid)?;

    let mut daily_tables = Vec::new();

    let climate_features = request.climate_features();
    if !climate_features.is_empty() {
        let cds = CdsClient::from_env()?;
        let builder =
            ClimateDatasetBuilder::new(request.province, request.year, request.months.clone());
        daily_tables.push(builder.build(&dir, &grid, &cds, &climate_features).await?);
    }

    if request.has_feature(Feature::Ndvi) {
        let credentials = ApiCredentials::from_env()?;
        let client = SentinelHubClient::authenticate(&credentials).await?;
        let builder =
            NdviDatasetBuilder::new(request.province, request.year, request.months.clone());
        daily_tables.push(builder.build(&grid, &client).await?);
    }

    let terrain_features = request.terrain_features();
    let terrain_table = if terrain_features.is_empty() {
        None
    } else {
        let credentials = ApiCredentials::from_env()?;
        let builder = TerrainDatasetBuilder::new(request.province, terrain_features);
        Some(builder.build(&dir, &grid, &credentials).await?)
    };

    let merger = DatasetMerger::new(
        grid.grid_ids().collect(),
        dates::days_in_months(request.year, &request.months),
    );
    let merged = merger.merge(daily_tables, terrain_table, fire_table)?;

    let output = dir.join(format!("Final_Dataset_{}.csv", request.year));
    csv_writer::write_final_dataset(&output, &merged)?;
    info!("wrote {} rows to {}", merged.len(), output.display());
    Ok(output)
}
