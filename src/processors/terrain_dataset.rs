//! Static terrain table: DEM download, reprojection and clip to the province
//! polygon, slope/aspect derivation, and per-cell zonal means.

use std::collections::BTreeMap;
use std::path::Path;

use ndarray::Array2;
use tracing::{error, info};

use crate::clients::sentinel::SentinelHubClient;
use crate::clients::ApiCredentials;
use crate::error::{PipelineError, Result};
use crate::models::grid::ProvincialGrid;
use crate::models::table::{GridId, StaticTable};
use crate::models::{Feature, Province};
use crate::readers::{boundary, geotiff};
use crate::spatial::crs::Crs;
use crate::spatial::raster::{self, GeoTransform, Raster, Resampling};
use crate::spatial::zonal;
use crate::utils::constants::{
    ASPECT_FILE, DEM_FILE, DEM_REPROJECTED_FILE, IMAGE_FILE, PROVINCE_FILE, RESOLUTION_METERS,
    SLOPE_FILE,
};
use crate::utils::resolution;
use crate::writers::geotiff as geotiff_writer;

pub struct TerrainDatasetBuilder {
    province: Province,
    features: Vec<Feature>,
}

impl TerrainDatasetBuilder {
    pub fn new(province: Province, features: Vec<Feature>) -> Self {
        Self { province, features }
    }

    /// Build the terrain table, keyed by grid id only. DEM artifacts are
    /// reused when present.
    pub async fn build(
        &self,
        dir: &Path,
        grid: &ProvincialGrid,
        credentials: &ApiCredentials,
    ) -> Result<StaticTable> {
        let image_path = dir.join(IMAGE_FILE);
        if !image_path.exists() {
            self.download_dem(dir, credentials).await?;
        }

        let dem_path = dir.join(DEM_FILE);
        if !dem_path.exists() {
            self.clip_dem(dir, grid)?;
        }
        let dem = geotiff::read_with_world_file(&dem_path)?;

        let wants_slope = self.features.contains(&Feature::Slope);
        let wants_aspect = self.features.contains(&Feature::Aspect);
        if wants_slope || wants_aspect {
            self.derive_slope_aspect(dir, &dem, wants_slope, wants_aspect)?;
        }

        let mut table: Option<StaticTable> = None;
        for feature in [Feature::Elevation, Feature::Slope, Feature::Aspect] {
            if !self.features.contains(&feature) {
                continue;
            }
            let raster = match feature {
                Feature::Elevation => dem.clone(),
                Feature::Slope => geotiff::read_with_world_file(&dir.join(SLOPE_FILE))?,
                Feature::Aspect => geotiff::read_with_world_file(&dir.join(ASPECT_FILE))?,
                _ => unreachable!(),
            };
            let means: BTreeMap<GridId, Option<f64>> =
                zonal::zonal_mean(&raster, 0, &grid.crs, &grid.cells, &grid.crs);
            let column = StaticTable::from_column(feature.column(), means);
            table = Some(match table.take() {
                Some(joined) => joined.inner_join(column),
                None => column,
            });
        }

        table.ok_or_else(|| {
            PipelineError::DataMerge("no terrain feature produced a table".to_string())
        })
    }

    /// Fetch the DEM image. The token fetch and the WMS probe are the only
    /// steps whose failure is caught: it is logged and the build step returns
    /// early, leaving dependent outputs missing.
    async fn download_dem(&self, dir: &Path, credentials: &ApiCredentials) -> Result<()> {
        let client = match SentinelHubClient::authenticate(credentials).await {
            Ok(client) => client,
            Err(e) => {
                error!("error fetching token: {}", e);
                return Ok(());
            }
        };
        if let Err(e) = client.probe_wms_instances().await {
            error!("error during WMS instances request: {}", e);
            return Ok(());
        }

        let bbox = self.province.bounding_box();
        let size = resolution::image_dimensions(&bbox, RESOLUTION_METERS);
        let image = client.fetch_dem(&bbox, size).await?;

        let image_path = dir.join(IMAGE_FILE);
        std::fs::write(&image_path, &image)?;
        info!("DEM image saved to {}", image_path.display());
        Ok(())
    }

    /// Reproject the downloaded DEM to the grid CRS (nearest neighbor) and
    /// mask it to the exact province polygon.
    fn clip_dem(&self, dir: &Path, grid: &ProvincialGrid) -> Result<()> {
        let image_path = dir.join(IMAGE_FILE);
        if !image_path.exists() {
            return Err(PipelineError::MissingData(format!(
                "DEM image missing: {} (download failed earlier?)",
                image_path.display()
            )));
        }

        let bbox = self.province.bounding_box();
        let size = resolution::image_dimensions(&bbox, RESOLUTION_METERS);
        let transform =
            GeoTransform::from_extent(bbox.west, bbox.east, bbox.south, bbox.north, size.0, size.1);
        let raster = geotiff::read_with_transform(&image_path, transform)?;

        let reprojected = raster.reproject(&Crs::Geographic, &grid.crs, Resampling::Nearest)?;
        geotiff_writer::write_raster(&dir.join(DEM_REPROJECTED_FILE), &reprojected)?;

        let (shapes, _) = boundary::read_saved_boundary(&dir.join(PROVINCE_FILE))?;
        let clipped = reprojected.mask(&shapes)?;
        geotiff_writer::write_raster(&dir.join(DEM_FILE), &clipped)?;
        Ok(())
    }

    /// Slope and aspect from centered finite differences over the DEM's
    /// actual pixel spacing. Existing outputs are kept.
    fn derive_slope_aspect(
        &self,
        dir: &Path,
        dem: &Raster,
        wants_slope: bool,
        wants_aspect: bool,
    ) -> Result<()> {
        let slope_path = dir.join(SLOPE_FILE);
        let aspect_path = dir.join(ASPECT_FILE);
        let need_slope = wants_slope && !slope_path.exists();
        let need_aspect = wants_aspect && !aspect_path.exists();
        if !need_slope && !need_aspect {
            return Ok(());
        }

        let dx = dem.transform.pixel_width;
        let dy = -dem.transform.pixel_height;
        let (ddx, ddy) = raster::gradient(dem.band(0), dx, dy);
        let (rows, cols) = ddx.dim();

        if need_slope {
            let mut slope = Array2::<f32>::zeros((rows, cols));
            for row in 0..rows {
                for col in 0..cols {
                    let gx = ddx[[row, col]];
                    let gy = ddy[[row, col]];
                    slope[[row, col]] =
                        (gx * gx + gy * gy).sqrt().atan() * 180.0 / std::f32::consts::PI;
                }
            }
            geotiff_writer::write_band(&slope_path, slope.view(), &dem.transform)?;
        }

        if need_aspect {
            let mut aspect = Array2::<f32>::zeros((rows, cols));
            for row in 0..rows {
                for col in 0..cols {
                    let gx = ddx[[row, col]];
                    let gy = ddy[[row, col]];
                    let degrees = gx.atan2(-gy).to_degrees();
                    aspect[[row, col]] = (degrees + 360.0) % 360.0;
                }
            }
            geotiff_writer::write_band(&aspect_path, aspect.view(), &dem.transform)?;
        }

        Ok(())
    }
}
