//! Builds the provincial grid layers: boundary, clipped cell grid, and
//! centroid points.

use std::path::{Path, PathBuf};

use geo::{BooleanOps, BoundingRect, Centroid};
use geo_types::{polygon, MultiPolygon};
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::models::Province;
use crate::readers::{boundary, vector};
use crate::spatial::crs::Crs;
use crate::utils::constants::{
    BOUNDARY_NAME_FIELD, CENTROIDS_FILE, GRID_CELL_HEIGHT, GRID_CELL_WIDTH, GRID_FILE,
    PROVINCE_FILE,
};

pub struct GridBuilder {
    province: Province,
    boundary_path: PathBuf,
    cell_size: (f64, f64),
}

impl GridBuilder {
    pub fn new(province: Province, boundary_path: &Path) -> Self {
        Self {
            province,
            boundary_path: boundary_path.to_path_buf(),
            cell_size: (GRID_CELL_WIDTH, GRID_CELL_HEIGHT),
        }
    }

    pub fn with_cell_size(mut self, width: f64, height: f64) -> Self {
        self.cell_size = (width, height);
        self
    }

    /// Generate `Province.shp`, `clippedGrid.shp` and `centroids.shp` in the
    /// province directory. A no-op when all three already exist.
    pub fn build(&self, dir: &Path) -> Result<()> {
        let province_path = dir.join(PROVINCE_FILE);
        let grid_path = dir.join(GRID_FILE);
        let centroids_path = dir.join(CENTROIDS_FILE);
        if province_path.exists() && grid_path.exists() && centroids_path.exists() {
            info!("provincial layers already exist in {}", dir.display());
            return Ok(());
        }
        std::fs::create_dir_all(dir)?;

        let (shapes, wkt) =
            boundary::read_province_boundary(&self.boundary_path, self.province)?;
        let crs = Crs::from_wkt(&wkt)?;
        if !crs.is_projected() {
            return Err(PipelineError::Crs(format!(
                "boundary for {} is not in a projected CRS; metric cell sizes need one",
                self.province
            )));
        }

        self.write_province(&province_path, &shapes, &wkt)?;

        let rect = shapes.bounding_rect().ok_or_else(|| {
            PipelineError::MissingData(format!("{} boundary has no extent", self.province))
        })?;
        let (cell_width, cell_height) = self.cell_size;

        // Tile the bounding box and keep each cell's intersection with the
        // province; boundary cells stay, clipped to the true outline.
        let mut cells: Vec<MultiPolygon<f64>> = Vec::new();
        let mut x = rect.min().x.floor();
        while x < rect.max().x {
            let mut y = rect.min().y.floor();
            while y < rect.max().y {
                let cell = polygon![
                    (x: x, y: y),
                    (x: x + cell_width, y: y),
                    (x: x + cell_width, y: y + cell_height),
                    (x: x, y: y + cell_height),
                    (x: x, y: y),
                ];
                let clipped = shapes.intersection(&MultiPolygon::new(vec![cell]));
                if !clipped.0.is_empty() {
                    cells.push(clipped);
                }
                y += cell_height;
            }
            x += cell_width;
        }

        info!(
            "clipped grid for {}: {} cells of {}x{} m",
            self.province,
            cells.len(),
            cell_width,
            cell_height
        );

        self.write_grid(&grid_path, &cells, &wkt)?;
        self.write_centroids(&centroids_path, &cells, &wkt)?;
        Ok(())
    }

    fn write_province(
        &self,
        path: &Path,
        shapes: &MultiPolygon<f64>,
        wkt: &str,
    ) -> Result<()> {
        let table = TableWriterBuilder::new()
            .add_character_field(FieldName::try_from(BOUNDARY_NAME_FIELD).unwrap(), 60);
        let mut writer = shapefile::Writer::from_path(path, table)?;
        let mut record = Record::default();
        record.insert(
            BOUNDARY_NAME_FIELD.to_string(),
            FieldValue::Character(Some(self.province.name().to_string())),
        );
        writer.write_shape_and_record(&vector::to_shp_polygon(shapes), &record)?;
        drop(writer);
        vector::write_prj(path, wkt)
    }

    fn write_grid(&self, path: &Path, cells: &[MultiPolygon<f64>], wkt: &str) -> Result<()> {
        let table = TableWriterBuilder::new()
            .add_numeric_field(FieldName::try_from("id").unwrap(), 10, 0);
        let mut writer = shapefile::Writer::from_path(path, table)?;
        for (id, cell) in cells.iter().enumerate() {
            let mut record = Record::default();
            record.insert("id".to_string(), FieldValue::Numeric(Some(id as f64)));
            writer.write_shape_and_record(&vector::to_shp_polygon(cell), &record)?;
        }
        drop(writer);
        vector::write_prj(path, wkt)
    }

    fn write_centroids(
        &self,
        path: &Path,
        cells: &[MultiPolygon<f64>],
        wkt: &str,
    ) -> Result<()> {
        let table = TableWriterBuilder::new()
            .add_numeric_field(FieldName::try_from("id").unwrap(), 10, 0);
        let mut writer = shapefile::Writer::from_path(path, table)?;
        for (id, cell) in cells.iter().enumerate() {
            let centroid = cell.centroid().ok_or_else(|| {
                PipelineError::InvalidFormat(format!("grid cell {} has no centroid", id))
            })?;
            let mut record = Record::default();
            record.insert("id".to_string(), FieldValue::Numeric(Some(id as f64)));
            writer.write_shape_and_record(
                &shapefile::Point::new(centroid.x(), centroid.y()),
                &record,
            )?;
        }
        drop(writer);
        vector::write_prj(path, wkt)
    }
}
