//! Fire ignition table: fire events joined onto grid cells by intersection,
//! filtered to the requested year and months.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Datelike;
use geo::Intersects;
use geo_types::Geometry;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::models::grid::ProvincialGrid;
use crate::models::table::DailyTable;
use crate::models::Province;
use crate::readers::fire;
use crate::spatial::crs::{self, Crs};
use crate::utils::constants::FIRE_FILE;

pub struct FireDatasetBuilder {
    province: Province,
    year: i32,
    months: Vec<u32>,
}

impl FireDatasetBuilder {
    pub fn new(province: Province, year: i32, months: Vec<u32>) -> Self {
        Self {
            province,
            year,
            months,
        }
    }

    /// Derive `FireData.shp` from the national dataset if it does not exist.
    pub fn ensure_provincial_subset(&self, dir: &Path, national: &Path) -> Result<PathBuf> {
        let fire_path = dir.join(FIRE_FILE);
        if !fire_path.exists() {
            let written = fire::write_provincial_subset(national, &fire_path, self.province)?;
            info!(
                "extracted {} {} fire records to {}",
                written,
                self.province.agency_code(),
                fire_path.display()
            );
        }
        Ok(fire_path)
    }

    /// One row per (grid cell, date) with ignition = 1 for every fire record
    /// whose resolved date falls in the requested period. Every other
    /// combination is implicitly 0 and filled by the merge layer.
    pub fn build(&self, dir: &Path, grid: &ProvincialGrid) -> Result<DailyTable> {
        let fire_path = dir.join(FIRE_FILE);
        if !fire_path.exists() {
            return Err(PipelineError::MissingData(format!(
                "provincial fire dataset missing: {}",
                fire_path.display()
            )));
        }

        let fire_crs = match fire::read_fire_crs(&fire_path) {
            Some(wkt) => Crs::from_wkt(&wkt)?,
            None => grid.crs.clone(),
        };

        let mut ignitions: BTreeMap<(u32, chrono::NaiveDate), f64> = BTreeMap::new();
        let mut in_range = 0usize;
        for record in fire::read_fire_records(&fire_path)? {
            let Some(date) = record.date else { continue };
            if date.year() != self.year || !self.months.contains(&date.month()) {
                continue;
            }
            in_range += 1;

            let geometry: Geometry<f64> =
                crs::transform_geometry(&record.geometry, &fire_crs, &grid.crs);
            for cell in &grid.cells {
                if geometry.intersects(&Geometry::MultiPolygon(cell.geometry.clone())) {
                    ignitions.insert((cell.id, date), 1.0);
                }
            }
        }

        info!(
            "{} fire records in range produced {} ignition rows",
            in_range,
            ignitions.len()
        );
        Ok(DailyTable::from_column("ignition", ignitions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::grid::GridCell;
    use geo::Centroid;
    use geo_types::{polygon, MultiPolygon};

    fn grid_of_two_cells() -> ProvincialGrid {
        let mut cells = Vec::new();
        for (id, offset) in [(0u32, 0.0f64), (1, 10.0)] {
            let geometry = MultiPolygon::new(vec![polygon![
                (x: offset, y: 0.0),
                (x: offset + 10.0, y: 0.0),
                (x: offset + 10.0, y: 10.0),
                (x: offset, y: 10.0),
                (x: offset, y: 0.0),
            ]]);
            let centroid = geometry.centroid().unwrap();
            cells.push(GridCell {
                id,
                geometry,
                centroid,
            });
        }
        ProvincialGrid {
            cells,
            crs: Crs::Geographic,
            crs_wkt: String::new(),
        }
    }

    #[test]
    fn test_point_assigns_to_intersecting_cell() {
        let grid = grid_of_two_cells();
        let point: Geometry<f64> = geo_types::Point::new(12.0, 5.0).into();
        assert!(point.intersects(&Geometry::MultiPolygon(grid.cells[1].geometry.clone())));
        assert!(!point.intersects(&Geometry::MultiPolygon(grid.cells[0].geometry.clone())));
    }
}
